//! Reports which TDS protocol version a SQL Server session is really using.
//!
//! A client can ask for TDS 7.4 and still end up on 7.1 or even 4.2 when the
//! driver or the server is older. The server records what was negotiated in
//! `sys.dm_exec_connections`; [`resolve`] reads it for the current session
//! and decodes it with the table in [`version`].

mod connection;
pub mod error;
mod resolver;
pub mod version;

pub use connection::{Config, EncryptionLevel, SessionInfo, SqlServerAuth, SyncSession};
pub use error::Error;
pub use resolver::{resolve, ScalarQuery, PROTOCOL_VERSION_QUERY};
pub use version::{decode, ProtocolVersionCode, TdsVersion, VersionLabel};

/// An alias for a result that holds this module's error type as the error.
pub type Result<T> = std::result::Result<T, Error>;

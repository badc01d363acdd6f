//! Finds out which TDS version the current session negotiated.
use crate::version::{decode, VersionLabel};
use tracing::{event, Level};

/// Asks the server for the protocol version of the session running it.
pub const PROTOCOL_VERSION_QUERY: &str =
    "SELECT protocol_version FROM sys.dm_exec_connections WHERE session_id=@@SPID";

/// A connection that can run a query and hand back a single integer.
///
/// Implemented by [`SyncSession`](crate::SyncSession). The caller keeps
/// ownership of the connection; implementations must not close it.
pub trait ScalarQuery {
    /// Runs `sql` and returns the first column of the first row, `None` if
    /// there is no row or the value is NULL.
    fn fetch_scalar(&mut self, sql: &str) -> crate::Result<Option<i32>>;
}

/// Runs [`PROTOCOL_VERSION_QUERY`] once on `conn` and decodes the result.
///
/// Errors from the connection are returned as-is. A code missing from the
/// version table is not an error, it comes back as
/// [`VersionLabel::Unknown`].
pub fn resolve<C: ScalarQuery + ?Sized>(conn: &mut C) -> crate::Result<VersionLabel> {
    let code = conn.fetch_scalar(PROTOCOL_VERSION_QUERY)?.ok_or_else(|| {
        crate::Error::MissingValue("sys.dm_exec_connections has no row for @@SPID".into())
    })?;

    let label = decode(code);
    event!(Level::DEBUG, code, %label, "resolved protocol version");

    Ok(label)
}

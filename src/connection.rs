mod config;

pub use config::*;

use crate::resolver::ScalarQuery;
use tiberius::{Client, SqlBrowser};
use tokio::{net::TcpStream, runtime::Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{event, Level};

/// Identifies the client library and server of the current session.
const SESSION_INFO_QUERY: &str = "SELECT s.client_interface_name, s.client_version, \
     CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128)) \
     FROM sys.dm_exec_sessions s WHERE s.session_id=@@SPID";

/// What the server knows about the client and itself for this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// The client library name sent at login.
    pub interface_name: Option<String>,
    /// The TDS major version the server recorded for the client.
    pub client_version: Option<i32>,
    /// `SERVERPROPERTY('ProductVersion')`, e.g. `16.0.1000.6`.
    pub server_version: Option<String>,
}

/// A blocking session to SQL Server.
///
/// Every call runs to completion on a private single-threaded runtime, so
/// the session can be used from plain synchronous code. Dropping it closes
/// the socket; [`close`](Self::close) ends the session politely.
///
/// # Example
///
/// ```no_run
/// use tdsver::{Config, SqlServerAuth, SyncSession};
///
/// let mut config = Config::new();
/// config.host("localhost");
/// config.authentication(SqlServerAuth::new("sa", "password"));
/// config.trust_cert();
///
/// let mut session = SyncSession::connect(config).unwrap();
/// let label = tdsver::resolve(&mut session).unwrap();
/// println!("TDS {}", label);
/// session.close().unwrap();
/// ```
#[derive(Debug)]
pub struct SyncSession {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
    config: Config,
}

impl SyncSession {
    /// Opens a TCP connection and logs in.
    ///
    /// A named instance without a port is located through the SQL Browser
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the socket cannot be
    /// opened, or the driver error if the browser lookup or the login fails.
    /// A routing request from the server is logged and returned as-is.
    pub fn connect(config: Config) -> crate::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let addr = config.get_addr();
        event!(Level::DEBUG, %addr, "connecting");

        let client_config = config.to_client_config();
        let client = runtime
            .block_on(async {
                let tcp = if config.uses_sql_browser() {
                    event!(
                        Level::DEBUG,
                        instance = config.instance_name.as_deref(),
                        "looking up instance port through SQL Browser"
                    );
                    TcpStream::connect_named(&client_config).await?
                } else {
                    TcpStream::connect(&addr).await?
                };
                tcp.set_nodelay(true)?;
                Ok::<_, crate::Error>(Client::connect(client_config, tcp.compat_write()).await?)
            })
            .map_err(|e| {
                if let Some((host, port)) = e.routing_target() {
                    event!(Level::WARN, "Server requested routing to {}:{}", host, port);
                }
                e
            })?;

        event!(Level::INFO, %addr, "session established");

        Ok(Self {
            runtime,
            client,
            config,
        })
    }

    /// The settings this session was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads the client interface and server version recorded for this
    /// session.
    pub fn session_info(&mut self) -> crate::Result<SessionInfo> {
        let client = &mut self.client;

        self.runtime.block_on(async {
            let row = client.simple_query(SESSION_INFO_QUERY).await?.into_row().await?;

            let info = match row {
                Some(row) => SessionInfo {
                    interface_name: row.try_get::<&str, _>(0)?.map(str::to_string),
                    client_version: row.try_get::<i32, _>(1)?,
                    server_version: row.try_get::<&str, _>(2)?.map(str::to_string),
                },
                None => SessionInfo::default(),
            };

            Ok::<_, crate::Error>(info)
        })
    }

    /// Ends the session.
    pub fn close(self) -> crate::Result<()> {
        let SyncSession {
            runtime, client, ..
        } = self;

        runtime.block_on(client.close())?;
        event!(Level::DEBUG, "session closed");

        Ok(())
    }
}

impl ScalarQuery for SyncSession {
    fn fetch_scalar(&mut self, sql: &str) -> crate::Result<Option<i32>> {
        let client = &mut self.client;

        self.runtime.block_on(async {
            event!(Level::TRACE, sql);
            let row = client.simple_query(sql).await?.into_row().await?;

            let value = match row {
                Some(row) => row.try_get::<i32, _>(0)?,
                None => None,
            };

            Ok::<_, crate::Error>(value)
        })
    }
}

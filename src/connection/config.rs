use std::fmt::Debug;

use connection_string::AdoNetString;
pub use tiberius::EncryptionLevel;
use tracing::{event, Level};

use crate::version::TdsVersion;

/// SQL Server login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SqlServerAuth {
    user: String,
    password: String,
}

impl SqlServerAuth {
    /// Construct SQL Server authentication from a login and password.
    pub fn new(user: impl ToString, password: impl ToString) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for SqlServerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerAuth")
            .field("user", &self.user)
            .field("password", &"<HIDDEN>")
            .finish()
    }
}

#[derive(Clone, Debug)]
/// Settings for opening the session to probe.
///
/// Use the builder methods, or [`from_connection_string`], then hand the
/// result to [`SyncSession::connect`].
///
/// [`from_connection_string`]: Self::from_connection_string
/// [`SyncSession::connect`]: crate::SyncSession::connect
pub struct Config {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) database: Option<String>,
    pub(crate) instance_name: Option<String>,
    pub(crate) application_name: Option<String>,
    pub(crate) driver: Option<String>,
    pub(crate) encryption: EncryptionLevel,
    pub(crate) trust_cert: bool,
    pub(crate) auth: Option<SqlServerAuth>,
    pub(crate) requested_version: Option<TdsVersion>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            database: None,
            instance_name: None,
            application_name: None,
            driver: None,
            encryption: EncryptionLevel::Required,
            trust_cert: false,
            auth: None,
            requested_version: None,
        }
    }
}

impl Config {
    /// Create a new `Config` with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an ODBC style connection string such as
    /// `Driver=FreeTDS;Server=db1;Port=49242;TDS_Version=7.3;UID=sa;PWD=...`.
    ///
    /// Keys are case-insensitive and braces around values are removed. Keys
    /// that do not affect the probe are skipped.
    pub fn from_connection_string(s: &str) -> crate::Result<Self> {
        let ado: AdoNetString = s.parse()?;
        let mut config = Config::new();
        let mut user = None;
        let mut password = None;

        for (key, value) in ado.iter() {
            let key = key.trim().to_lowercase();
            let value = strip_braces(value.trim()).to_string();

            match key.as_str() {
                "server" | "data source" | "address" | "addr" => {
                    let server = ServerName::parse(&value)?;
                    config.host(server.host);
                    if let Some(instance) = server.instance {
                        config.instance_name(instance);
                    }
                    if let Some(port) = server.port {
                        config.port(port);
                    }
                }
                "port" => config.port(value.parse()?),
                "database" | "initial catalog" => config.database(value),
                "uid" | "user id" | "user" => user = Some(value),
                "pwd" | "password" => password = Some(value),
                "app" | "application name" => config.application_name(value),
                "driver" => config.driver = Some(value),
                "tds_version" => config.requested_version(value.parse()?),
                "encrypt" => config.encryption(parse_encryption(&value)?),
                "trustservercertificate" => {
                    if parse_bool(&value)? {
                        config.trust_cert();
                    }
                }
                other => event!(Level::DEBUG, key = other, "ignoring connection string key"),
            }
        }

        match (user, password) {
            (Some(user), password) => {
                config.authentication(SqlServerAuth::new(user, password.unwrap_or_default()))
            }
            (None, Some(_)) => {
                return Err(crate::Error::Config(
                    "a password was given without a user".into(),
                ))
            }
            (None, None) => (),
        }

        Ok(config)
    }

    /// A host or ip address to connect to.
    ///
    /// - Defaults to `localhost`.
    pub fn host(&mut self, host: impl ToString) {
        self.host = Some(host.to_string());
    }

    /// The server port.
    ///
    /// - Defaults to `1433`.
    pub fn port(&mut self, port: u16) {
        self.port = Some(port);
    }

    /// The database to connect to.
    ///
    /// - Defaults to the login's default database.
    pub fn database(&mut self, database: impl ToString) {
        self.database = Some(database.to_string())
    }

    /// The instance name as defined in the SQL Browser.
    ///
    /// Without an explicit port, the SQL Browser port is used.
    pub fn instance_name(&mut self, name: impl ToString) {
        self.instance_name = Some(name.to_string());
    }

    /// Sets the application name, queryable with `APP_NAME()`.
    pub fn application_name(&mut self, name: impl ToString) {
        self.application_name = Some(name.to_string());
    }

    /// Set the preferred encryption level.
    ///
    /// - Defaults to `Required`.
    pub fn encryption(&mut self, encryption: EncryptionLevel) {
        self.encryption = encryption;
    }

    /// Accept the server certificate without validating it.
    pub fn trust_cert(&mut self) {
        self.trust_cert = true;
    }

    /// Sets the SQL Server login.
    ///
    /// - Defaults to no credentials, which the server will reject.
    pub fn authentication(&mut self, auth: SqlServerAuth) {
        self.auth = Some(auth);
    }

    /// The protocol version the caller asked for. The server may settle on an
    /// older one; the difference is what the probe is for.
    pub fn requested_version(&mut self, version: TdsVersion) {
        self.requested_version = Some(version);
    }

    pub fn get_requested_version(&self) -> Option<TdsVersion> {
        self.requested_version
    }

    /// The `Driver` named in the connection string, if any.
    pub fn get_driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    pub fn get_auth(&self) -> Option<&SqlServerAuth> {
        self.auth.as_ref()
    }

    pub(crate) fn get_host(&self) -> &str {
        self.host
            .as_deref()
            .filter(|v| v != &"." && !v.eq_ignore_ascii_case("(local)"))
            .unwrap_or("localhost")
    }

    pub(crate) fn get_port(&self) -> u16 {
        match (self.port, self.instance_name.as_ref()) {
            // A user-defined port, we must use that.
            (Some(port), _) => port,
            // Named instance without a port: SQL Browser.
            (None, Some(_)) => 1434,
            (None, None) => 1433,
        }
    }

    /// True when the port has to be looked up through the SQL Browser:
    /// an instance name is set and no port was given.
    pub fn uses_sql_browser(&self) -> bool {
        self.instance_name.is_some() && self.port.is_none()
    }

    /// Get the host address including port
    pub fn get_addr(&self) -> String {
        format!("{}:{}", self.get_host(), self.get_port())
    }

    /// Builds the client configuration for the TDS driver.
    pub(crate) fn to_client_config(&self) -> tiberius::Config {
        let mut config = tiberius::Config::new();
        config.host(self.get_host());
        // Leave the port unset for a named instance so the SQL Browser picks it.
        if let Some(port) = self.port {
            config.port(port);
        }

        if let Some(ref database) = self.database {
            config.database(database);
        }
        if let Some(ref instance) = self.instance_name {
            config.instance_name(instance);
        }
        config.application_name(self.application_name.as_deref().unwrap_or("tdsver"));
        config.encryption(self.encryption);
        if self.trust_cert {
            config.trust_cert();
        }
        if let Some(ref auth) = self.auth {
            config.authentication(tiberius::AuthMethod::sql_server(
                auth.user(),
                auth.password(),
            ));
        }

        config
    }
}

/// `[tcp:]host[\instance][,port]`
#[derive(Debug, PartialEq, Eq)]
struct ServerName {
    host: String,
    instance: Option<String>,
    port: Option<u16>,
}

impl ServerName {
    fn parse(value: &str) -> crate::Result<Self> {
        let value = value
            .strip_prefix("tcp:")
            .or_else(|| value.strip_prefix("TCP:"))
            .unwrap_or(value);

        let (rest, port) = match value.split_once(',') {
            Some((rest, port)) => (rest, Some(port.trim().parse()?)),
            None => (value, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) => (host, Some(instance.to_string())),
            None => (rest, None),
        };

        if host.is_empty() {
            return Err(crate::Error::Config("server name is empty".into()));
        }

        Ok(Self {
            host: host.to_string(),
            instance,
            port,
        })
    }
}

fn strip_braces(value: &str) -> &str {
    value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value)
}

fn parse_bool(value: &str) -> crate::Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        _ => Err(crate::Error::Config(
            format!("expected yes/no, got `{}`", value).into(),
        )),
    }
}

fn parse_encryption(value: &str) -> crate::Result<EncryptionLevel> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "mandatory" | "strict" => Ok(EncryptionLevel::Required),
        "no" | "false" | "optional" => Ok(EncryptionLevel::Off),
        "not supported" | "disabled" => Ok(EncryptionLevel::NotSupported),
        _ => Err(crate::Error::Config(
            format!("unsupported Encrypt value `{}`", value).into(),
        )),
    }
}

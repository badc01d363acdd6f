//! `tdsver`: prints the TDS protocol version a SQL Server session negotiated.
//!
//! ```bash
//! TDSUSER=sa TDSPASSWORD=... tdsver --server 192.168.1.144 --port 49242 --tds-version 7.3
//! tdsver --connection-string "Driver=FreeTDS;Server=db1;TDS_Version=7.3;UID=sa;PWD=..."
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tdsver::{
    resolve, Config, EncryptionLevel, ProtocolVersionCode, SqlServerAuth, SyncSession, TdsVersion,
    VersionLabel,
};
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

/// Report the TDS protocol version a SQL Server session is actually using
#[derive(Parser, Debug)]
#[command(name = "tdsver", version, about, long_about = None)]
struct Cli {
    /// ODBC style connection string; explicit flags override its values
    #[arg(long, env = "TDS_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// Server host name or address
    #[arg(short = 'S', long, env = "TDSSERVER")]
    server: Option<String>,

    /// Server port
    #[arg(short, long, env = "TDSPORT")]
    port: Option<u16>,

    /// Named instance
    #[arg(long)]
    instance: Option<String>,

    /// Database to log into
    #[arg(short, long)]
    database: Option<String>,

    /// SQL Server login
    #[arg(short = 'U', long, env = "TDSUSER")]
    user: Option<String>,

    /// Password for the login
    #[arg(short = 'P', long, env = "TDSPASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// The TDS version you expect, e.g. 7.3; a different result is logged as a warning
    #[arg(long)]
    tds_version: Option<TdsVersion>,

    /// Encryption for the session
    #[arg(long, value_enum)]
    encrypt: Option<Encrypt>,

    /// Accept the server certificate without validation
    #[arg(long)]
    trust_cert: bool,

    /// Also print the raw protocol_version value
    #[arg(short, long)]
    verbose: bool,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Encrypt {
    Off,
    On,
    Required,
    NotSupported,
}

impl From<Encrypt> for EncryptionLevel {
    fn from(value: Encrypt) -> Self {
        match value {
            Encrypt::Off => EncryptionLevel::Off,
            Encrypt::On => EncryptionLevel::On,
            Encrypt::Required => EncryptionLevel::Required,
            Encrypt::NotSupported => EncryptionLevel::NotSupported,
        }
    }
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match self.connection_string {
            Some(ref s) => Config::from_connection_string(s).context("invalid connection string")?,
            None => Config::new(),
        };

        if let Some(ref server) = self.server {
            config.host(server);
        }
        if let Some(port) = self.port {
            config.port(port);
        }
        if let Some(ref instance) = self.instance {
            config.instance_name(instance);
        }
        if let Some(ref database) = self.database {
            config.database(database);
        }
        if let Some(version) = self.tds_version {
            config.requested_version(version);
        }
        if let Some(encrypt) = self.encrypt {
            config.encryption(encrypt.into());
        }
        if self.trust_cert {
            config.trust_cert();
        }

        match (&self.user, &self.password) {
            (Some(user), password) => config.authentication(SqlServerAuth::new(
                user,
                password.as_deref().unwrap_or_default(),
            )),
            (None, Some(password)) => {
                let user = config
                    .get_auth()
                    .map(|auth| auth.user().to_string())
                    .context("a password was given without a user")?;
                config.authentication(SqlServerAuth::new(user, password));
            }
            (None, None) => (),
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    let addr = config.get_addr();
    let requested = config.get_requested_version();

    let mut session =
        SyncSession::connect(config).with_context(|| format!("could not connect to {}", addr))?;

    let info = session.session_info()?;
    match session.config().get_driver() {
        Some(driver) => println!(
            "Client interface: \"{}\" (driver {}), version {}",
            info.interface_name.as_deref().unwrap_or("unknown"),
            driver,
            display_or_unknown(info.client_version),
        ),
        None => println!(
            "Client interface: \"{}\", version {}",
            info.interface_name.as_deref().unwrap_or("unknown"),
            display_or_unknown(info.client_version),
        ),
    }
    println!(
        "Server version: {}",
        info.server_version.as_deref().unwrap_or("unknown")
    );

    let label = resolve(&mut session)?;
    println!("Actual TDS protocol version in use: {}", label);

    if cli.verbose {
        let code = ProtocolVersionCode::from(label);
        println!("protocol_version: {} ({})", code.0, code);
        if let Some(version) = label.version() {
            println!("Typical server: {}", version.server_release());
        }
    }

    if let Some(warning) = version_mismatch(requested, label) {
        event!(Level::WARN, "{}", warning);
    }

    session.close()?;

    Ok(())
}

/// Describes the gap between the version asked for and the one in use.
fn version_mismatch(requested: Option<TdsVersion>, label: VersionLabel) -> Option<String> {
    let requested = requested?;
    if label.version() == Some(requested) {
        return None;
    }

    Some(format!(
        "asked for TDS {} but the session is using {}",
        requested, label
    ))
}

fn display_or_unknown(value: Option<i32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            connection_string: None,
            server: None,
            port: None,
            instance: None,
            database: None,
            user: None,
            password: None,
            tds_version: None,
            encrypt: None,
            trust_cert: false,
            verbose: false,
            log_level: "warn".to_string(),
        }
    }

    #[test]
    fn flags_override_connection_string() {
        let mut args = cli();
        args.connection_string = Some("Server=db1,1500;TDS_Version=7.1;UID=sa;PWD=x".into());
        args.port = Some(1600);
        args.tds_version = Some(TdsVersion::V7_4);

        let config = args.config().unwrap();
        assert_eq!("db1:1600", config.get_addr());
        assert_eq!(Some(TdsVersion::V7_4), config.get_requested_version());
        assert_eq!("sa", config.get_auth().unwrap().user());
    }

    #[test]
    fn server_flag_replaces_host() {
        let mut args = cli();
        args.connection_string = Some("Server=db1,1500".into());
        args.server = Some("db2".into());

        assert_eq!("db2:1500", args.config().unwrap().get_addr());
    }

    #[test]
    fn password_flag_reuses_connection_string_user() {
        let mut args = cli();
        args.connection_string = Some("Server=db1;UID=probe;PWD=old".into());
        args.password = Some("new".into());

        let config = args.config().unwrap();
        assert_eq!(Some(&SqlServerAuth::new("probe", "new")), config.get_auth());
    }

    #[test]
    fn user_flag_replaces_login() {
        let mut args = cli();
        args.connection_string = Some("Server=db1;UID=probe;PWD=old".into());
        args.user = Some("admin".into());
        args.password = Some("new".into());

        assert_eq!(
            Some(&SqlServerAuth::new("admin", "new")),
            args.config().unwrap().get_auth()
        );
    }

    #[test]
    fn password_flag_without_user_is_rejected() {
        let mut args = cli();
        args.server = Some("db1".into());
        args.password = Some("secret".into());

        assert!(args.config().is_err());
    }

    #[test]
    fn no_flags_use_defaults() {
        let config = cli().config().unwrap();
        assert_eq!("localhost:1433", config.get_addr());
        assert!(config.get_auth().is_none());
    }

    #[test]
    fn instance_flag_without_port_uses_browser() {
        let mut args = cli();
        args.server = Some("db1".into());
        args.instance = Some("SQLEXPRESS".into());
        assert!(args.config().unwrap().uses_sql_browser());

        args.port = Some(1500);
        assert!(!args.config().unwrap().uses_sql_browser());
    }

    #[test]
    fn mismatch_names_both_versions() {
        let label = tdsver::decode(67239936);
        assert_eq!(
            Some("asked for TDS 7.3 but the session is using 4.2".to_string()),
            version_mismatch(Some(TdsVersion::V7_3), label)
        );
    }

    #[test]
    fn mismatch_with_unknown_code() {
        let label = tdsver::decode(123456);
        assert_eq!(
            Some("asked for TDS 7.4 but the session is using unknown (123456)".to_string()),
            version_mismatch(Some(TdsVersion::V7_4), label)
        );
    }

    #[test]
    fn no_mismatch_when_versions_agree_or_none_requested() {
        let label = tdsver::decode(1930100739);
        assert_eq!(None, version_mismatch(Some(TdsVersion::V7_3), label));
        assert_eq!(None, version_mismatch(None, label));
    }

    #[test]
    fn encrypt_flag_maps_to_level() {
        let mut args = cli();
        args.encrypt = Some(Encrypt::Off);
        assert!(args.config().is_ok());
        assert!(matches!(EncryptionLevel::from(Encrypt::NotSupported), EncryptionLevel::NotSupported));
    }
}

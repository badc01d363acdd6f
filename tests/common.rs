use tdsver::{Config, SqlServerAuth, SyncSession};

pub fn test_config() -> (String, u16, String, String) {
    let host = std::env::var("TDSSERVER").unwrap_or_else(|_| "localhost".to_string());
    let port: u16 = std::env::var("TDSPORT")
        .unwrap_or_else(|_| "1433".to_string())
        .parse()
        .unwrap();
    let user = std::env::var("TDSUSER").unwrap_or_else(|_| "sa".to_string());
    let password = std::env::var("TDSPASSWORD").unwrap_or_else(|_| "TestPass123!".to_string());

    (host, port, user, password)
}

pub fn base_config() -> Config {
    let (host, port, user, password) = test_config();

    let mut config = Config::new();
    config.host(&host);
    config.port(port);
    config.authentication(SqlServerAuth::new(&user, &password));
    config.trust_cert();
    config
}

#[allow(dead_code)]
pub fn connect() -> SyncSession {
    SyncSession::connect(base_config()).unwrap()
}

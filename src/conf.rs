use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub listen_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    /// HS256 secret for access tokens. Empty means "generate one per process".
    pub jwt_secret: String,
    pub session_ttl_secs: i64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let conf = Config::builder()
            .set_default("listen_addr", "0.0.0.0:3000")?
            .set_default("database_url", "sqlite://job_board.db?mode=rwc")?
            .set_default("database_max_connections", 5)?
            .set_default("jwt_secret", "")?
            .set_default("session_ttl_secs", 60 * 60 * 24 * 7)?
            .add_source(Environment::with_prefix("JOB_BOARD"))
            .build()?;
        let mut s: Settings = conf.try_deserialize()?;
        if s.jwt_secret.is_empty() {
            tracing::warn!("JOB_BOARD_JWT_SECRET not set, sessions will not survive a restart");
            s.jwt_secret = random_secret();
        }
        Ok(s)
    }
}

fn random_secret() -> String {
    rand::random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: usize,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            client_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` runs the service on the in-memory repository and directory.
    pub db: Option<DbConfig>,
    pub websocket: WebSocketConfig,
    pub message_max_length: usize,
    /// Usernames registered in the in-memory directory at startup.
    pub seed_users: Vec<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();

        let port = env_parse("PORT", 3000);

        let db = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DbConfig {
                database_url: url,
                max_connections: env_parse("DB_MAX_CONNECTIONS", 20),
                connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", 5),
                acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", 10),
            }),
            _ => None,
        };

        let websocket = WebSocketConfig {
            heartbeat_interval_secs: env_parse("WS_HEARTBEAT_INTERVAL_SECS", 5),
            client_timeout_secs: env_parse("WS_CLIENT_TIMEOUT_SECS", 30),
        };
        if websocket.client_timeout_secs <= websocket.heartbeat_interval_secs {
            return Err(crate::error::AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_INTERVAL_SECS".into(),
            ));
        }

        let message_max_length = env_parse("MESSAGE_MAX_LENGTH", 4000);
        if message_max_length == 0 {
            return Err(crate::error::AppError::Config(
                "MESSAGE_MAX_LENGTH must be positive".into(),
            ));
        }

        let seed_users = env::var("SEED_USERS")
            .map(|v| Self::parse_list(&v))
            .unwrap_or_default();

        Ok(Self {
            port,
            db,
            websocket,
            message_max_length,
            seed_users,
        })
    }

    /// Defaults used by tests and local runs without a database.
    pub fn in_memory() -> Self {
        Self {
            port: 3000,
            db: None,
            websocket: WebSocketConfig::default(),
            message_max_length: 4000,
            seed_users: Vec::new(),
        }
    }
}

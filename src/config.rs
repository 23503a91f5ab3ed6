//! Runtime settings
//!
//! Loaded from environment variables (a `.env` file is honored when present).

use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT '{0}': expected an integer in 1-65535")]
    InvalidPort(String),

    #[error("invalid RUN_MODE '{0}': expected 'development' or 'production'")]
    InvalidRunMode(String),

    #[error("invalid DB_MAX_CONNECTIONS '{0}': expected a positive integer")]
    InvalidMaxConnections(String),
}

/// 実行モード。Development のときだけエラー詳細をクライアントに返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    Development,
    #[default]
    Production,
}

impl RunMode {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidRunMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub run_mode: RunMode,
    pub log_filter: String,
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://books.db";
pub const DEFAULT_LOG_FILTER: &str = "info,books_api=debug";

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            run_mode: RunMode::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    /// プロセス環境（と `.env`）から読み込む。
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から組み立てる。未設定のキーはデフォルト値。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(host) = lookup("HOST") {
            settings.host = host;
        }
        if let Some(port) = lookup("PORT") {
            settings.port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(ConfigError::InvalidPort(port))?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            settings.database_url = url;
        }
        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            settings.max_connections = max
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(max))?;
        }
        if let Some(mode) = lookup("RUN_MODE") {
            settings.run_mode = mode.parse()?;
        }
        if let Some(filter) = lookup("RUST_LOG") {
            settings.log_filter = filter;
        }

        Ok(settings)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! Configuration management

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::Separator;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub const DEFAULT_WORKERS: usize = 1;

pub const DEFAULT_LOG_FILTER: &str = "prodload=info,tower_http=info";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Without a URL the in-memory store is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub separator: Separator,
    pub max_upload_bytes: usize,
    pub queue_capacity: usize,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
            import: ImportConfig {
                separator: Separator::default(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                workers: DEFAULT_WORKERS,
            },
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if present), then the process environment over defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: lookup("PRODLOAD_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "PRODLOAD_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
            },
            import: ImportConfig {
                separator: match lookup("PRODLOAD_SEPARATOR") {
                    Some(raw) => raw
                        .parse()
                        .map_err(|e| ConfigError::Invalid(format!("PRODLOAD_SEPARATOR: {}", e)))?,
                    None => defaults.import.separator,
                },
                max_upload_bytes: parse_or(
                    &lookup,
                    "PRODLOAD_MAX_UPLOAD_BYTES",
                    defaults.import.max_upload_bytes,
                )?,
                queue_capacity: parse_or(&lookup, "PRODLOAD_QUEUE_CAPACITY", defaults.import.queue_capacity)?,
                workers: parse_or(&lookup, "PRODLOAD_WORKERS", defaults.import.workers)?,
            },
            log_filter: lookup("PRODLOAD_LOG").unwrap_or(defaults.log_filter),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.import.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max upload size must be non-zero".into()));
        }
        if self.import.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacity must be non-zero".into()));
        }
        if self.import.workers == 0 {
            return Err(ConfigError::Invalid("at least one import worker is required".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database pool needs at least one connection".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{}: cannot parse '{}'", key, raw))),
        None => Ok(default),
    }
}

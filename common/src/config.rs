//! Application configuration.
//!
//! Everything is read from environment variables once at startup. Store
//! credentials never live in source.

use std::time::Duration;

use validator::Validate;

use crate::errors::{AppError, AppResult};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TTL_SECS: u64 = 600;

/// Backing store connection settings.
#[derive(Debug, Clone, Validate)]
pub struct StoreConfig {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,
    #[validate(length(min = 1, message = "DB_HOST must not be empty"))]
    pub host: String,
    #[validate(range(min = 1, message = "DB_PORT must be non-zero"))]
    pub port: u16,
    #[validate(length(min = 1, message = "DB_NAME must not be empty"))]
    pub database: String,
    pub username: String,
    pub password: String,
    /// Upper bound on open connections held by the shared handle.
    #[validate(range(min = 1, max = 64, message = "DB_MAX_CONNECTIONS must be 1-64"))]
    pub max_connections: u32,
    #[validate(range(min = 1, message = "DB_CONNECT_TIMEOUT_SECS must be positive"))]
    pub connect_timeout_secs: u64,
}

impl StoreConfig {
    /// Connection target with the password masked, for logging.
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(_) => format!("<DATABASE_URL> ({})", self.database),
            None => format!(
                "postgres://{}:***@{}:{}/{}",
                self.username, self.host, self.port, self.database
            ),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Query result cache settings.
#[derive(Debug, Clone, Validate)]
pub struct CacheConfig {
    #[validate(range(min = 1, message = "CACHE_TTL_SECS must be positive"))]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    #[validate(nested)]
    pub store: StoreConfig,
    #[validate(nested)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Loads configuration for the named service from the process environment.
    pub fn load_with_service(service_name: &str, default_port: u16) -> AppResult<Self> {
        Self::from_lookup(service_name, default_port, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, default_port: u16, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "SERVER_PORT", default_port)?,
            store: StoreConfig {
                url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
                host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&lookup, "DB_PORT", 5432)?,
                database: lookup("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
                username: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 1)?,
                connect_timeout_secs: parse_or(&lookup, "DB_CONNECT_TIMEOUT_SECS", 10)?,
            },
            cache: CacheConfig {
                ttl_secs: parse_or(&lookup, "CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            },
        };

        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

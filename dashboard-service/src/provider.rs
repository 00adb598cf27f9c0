//! Connection provider.
//!
//! Opens the store connection on first demand and hands out the same handle
//! for the rest of the process lifetime. There is no teardown.

use std::str::FromStr;

use async_trait::async_trait;
use common::config::StoreConfig;
use common::errors::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::OnceCell;

/// Opens a connection handle to the backing store.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Send + Sync + 'static;

    async fn connect(&self) -> AppResult<Self::Handle>;
}

/// PostgreSQL connector backed by a `sqlx` pool capped at `max_connections`.
pub struct PgConnector {
    config: StoreConfig,
}

impl PgConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgPool;

    async fn connect(&self) -> AppResult<PgPool> {
        tracing::info!(
            url = %self.config.redacted_url(),
            max_connections = self.config.max_connections,
            "连接数据库"
        );
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.connect_timeout())
            .connect_with(connect_options(&self.config)?)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        tracing::info!("数据库连接已建立");
        Ok(pool)
    }
}

/// Connection options from `DATABASE_URL`, or from the individual parts.
///
/// Parts are passed to the driver as-is, so credentials need no URL escaping.
pub fn connect_options(config: &StoreConfig) -> AppResult<PgConnectOptions> {
    match &config.url {
        Some(url) => PgConnectOptions::from_str(url)
            .map_err(|e| AppError::Config(format!("DATABASE_URL is invalid: {e}"))),
        None => Ok(PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)),
    }
}

/// Lazily established, process-wide connection handle.
pub struct ConnectionProvider<C: Connector> {
    connector: C,
    handle: OnceCell<C::Handle>,
}

impl<C: Connector> ConnectionProvider<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    /// Returns the shared handle, connecting on the first call.
    ///
    /// Concurrent first callers wait on the same connect attempt. A failed
    /// attempt leaves the provider empty and is reported as
    /// `AppError::DatabaseConnection`.
    pub async fn get_connection(&self) -> AppResult<&C::Handle> {
        self.handle
            .get_or_try_init(|| self.connector.connect())
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }
}

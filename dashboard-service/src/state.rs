//! Application state for dashboard service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::cache::QueryCache;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queries: Arc<QueryCache>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, queries: QueryCache) -> Self {
        Self {
            config,
            queries: Arc::new(queries),
        }
    }
}

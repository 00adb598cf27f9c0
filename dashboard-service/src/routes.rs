//! 路由模块

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/views", get(handlers::list_views))
        .route("/api/views/{view}", get(handlers::get_view))
        .route("/api/views/{view}/panels/{panel}", get(handlers::get_panel))
        .route("/api/health", get(handlers::health_check))
}

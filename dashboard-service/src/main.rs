//! 只读分析看板服务
//!
//! 提供分析看板数据，包括：
//! - 单一共享数据库连接（首次使用时建立）
//! - 按 SQL 文本缓存查询结果（TTL 过期后重新执行）
//! - 客户、订单、仓库、营销四个视图的表格与图表数据

mod cache;
mod chart;
mod handlers;
mod provider;
mod routes;
mod service;
mod state;
mod store;
mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use crate::cache::QueryCache;
use crate::store::PgStore;

const SERVICE_NAME: &str = "dashboard-service";
const DEFAULT_PORT: u16 = 8083;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "分析看板服务 API",
        version = "0.1.0",
        description = "只读分析看板服务"
    ),
    paths(
        handlers::list_views,
        handlers::get_view,
        handlers::get_panel,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ViewSummary,
        common::models::ViewData,
        common::models::PanelData,
        common::models::ChartData,
        common::models::ChartSeries,
        common::models::ChartPoint,
        common::models::ChartKind,
        common::models::QueryResult,
        common::models::ColumnInfo,
        common::response::ApiError,
        handlers::HealthResponse,
    )),
    tags(
        (name = "views", description = "看板视图端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 先加载 .env（若存在）
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME, DEFAULT_PORT)
        .context("failed to load configuration")?;

    // 建立共享连接；失败即退出，不重试
    let store = PgStore::new(config.store.clone());
    store
        .connect()
        .await
        .context("failed to connect to the backing store")?;

    let queries = QueryCache::new(Arc::new(store), config.cache.ttl());
    let state = AppState::new(config.clone(), queries);

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(service = SERVICE_NAME, address = %addr, ttl_secs = config.cache.ttl_secs, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            // Real environment variables win over .env entries
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
            }
        }
    }
}

//! Handler模块

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::dashboard::{PanelData, ViewData, ViewSummary};
use common::response::ApiResponse;

use crate::service::DashboardService;
use crate::state::AppState;

const SERVICE_NAME: &str = "dashboard-service";

/// 列出所有看板视图
#[utoipa::path(
    get,
    path = "/api/views",
    tag = "views",
    responses(
        (status = 200, description = "视图列表", body = ApiResponse<Vec<ViewSummary>>)
    )
)]
pub async fn list_views(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<ViewSummary>>> {
    let service = DashboardService::new(state.queries);
    Json(
        ApiResponse::ok_with_service(service.list_views(), SERVICE_NAME)
            .with_request_id(request_id.0),
    )
}

/// 渲染整个视图（每个面板独立执行查询）
#[utoipa::path(
    get,
    path = "/api/views/{view}",
    tag = "views",
    params(
        ("view" = String, Path, description = "视图 ID")
    ),
    responses(
        (status = 200, description = "视图数据", body = ApiResponse<ViewData>),
        (status = 404, description = "视图未找到")
    )
)]
pub async fn get_view(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(view): Path<String>,
) -> Result<Json<ApiResponse<ViewData>>, AppError> {
    let start = Instant::now();
    let service = DashboardService::new(state.queries);
    let data = service.render_view(&view).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME)
            .with_request_id(request_id.0)
            .with_duration(start.elapsed().as_millis() as u64),
    ))
}

/// 渲染单个面板
#[utoipa::path(
    get,
    path = "/api/views/{view}/panels/{panel}",
    tag = "views",
    params(
        ("view" = String, Path, description = "视图 ID"),
        ("panel" = String, Path, description = "面板 ID")
    ),
    responses(
        (status = 200, description = "面板数据", body = ApiResponse<PanelData>),
        (status = 404, description = "视图或面板未找到")
    )
)]
pub async fn get_panel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((view, panel)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PanelData>>, AppError> {
    let start = Instant::now();
    let service = DashboardService::new(state.queries);
    let data = service.render_panel(&view, &panel).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME)
            .with_request_id(request_id.0)
            .with_duration(start.elapsed().as_millis() as u64),
    ))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        cached_queries: state.queries.fresh_entries().await,
        cache_ttl_secs: state.queries.ttl().as_secs(),
        store_connected: state.queries.store_connected(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub cached_queries: usize,
    pub cache_ttl_secs: u64,
    pub store_connected: bool,
}

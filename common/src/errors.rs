//! 统一错误类型
//!
//! 所有模块共享的错误枚举，并实现 axum 的 `IntoResponse`。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// The backing store is unreachable or rejected the credentials.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// The store rejected or failed to execute a query.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    #[error("view not found: {0}")]
    ViewNotFound(String),

    #[error("panel not found: {0}")]
    PanelNotFound(String),

    /// A chart references a column absent from the query result.
    #[error("chart column missing from result: {0}")]
    ChartColumnMissing(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "QUERY_ERROR",
            AppError::ViewNotFound(_) => "VIEW_NOT_FOUND",
            AppError::PanelNotFound(_) => "PANEL_NOT_FOUND",
            AppError::ChartColumnMissing(_) => "CHART_COLUMN_MISSING",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ViewNotFound(_) | AppError::PanelNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseQuery(_) | AppError::ChartColumnMissing(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

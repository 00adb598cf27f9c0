//! 看板渲染服务模块

use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::dashboard::{PanelData, ViewData, ViewSummary};
use common::response::ApiError;

use crate::cache::QueryCache;
use crate::chart::build_chart;
use crate::views::{self, PanelDef, ViewDef};

/// Renders views and panels through the shared query cache.
pub struct DashboardService {
    queries: Arc<QueryCache>,
}

impl DashboardService {
    pub fn new(queries: Arc<QueryCache>) -> Self {
        Self { queries }
    }

    /// Lists every view.
    pub fn list_views(&self) -> Vec<ViewSummary> {
        views::all().iter().map(ViewDef::summary).collect()
    }

    /// Renders every panel of a view. A failing panel carries its error and
    /// does not affect the others.
    pub async fn render_view(&self, view_id: &str) -> AppResult<ViewData> {
        let view = find_view(view_id)?;
        let mut panels = Vec::with_capacity(view.panels.len());
        for panel in view.panels {
            panels.push(self.render_isolated(view, panel).await);
        }
        Ok(ViewData {
            id: view.id.to_string(),
            title: view.title.to_string(),
            header: view.header.to_string(),
            panels,
        })
    }

    /// Renders a single panel of a view.
    pub async fn render_panel(&self, view_id: &str, panel_id: &str) -> AppResult<PanelData> {
        let view = find_view(view_id)?;
        let panel = view
            .panel(panel_id)
            .ok_or_else(|| AppError::PanelNotFound(format!("{view_id}/{panel_id}")))?;
        Ok(self.render_isolated(view, panel).await)
    }

    async fn render_isolated(&self, view: &ViewDef, panel: &PanelDef) -> PanelData {
        match self.render(panel).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(view = view.id, panel = panel.id, error = %e, "面板渲染失败");
                PanelData {
                    id: panel.id.to_string(),
                    title: panel.title.to_string(),
                    table: None,
                    chart: None,
                    error: Some(ApiError::new(e.code(), e.to_string())),
                }
            }
        }
    }

    async fn render(&self, panel: &PanelDef) -> AppResult<PanelData> {
        let result = self.queries.run_query(panel.sql).await?;
        let chart = build_chart(&panel.chart, &result)?;
        Ok(PanelData {
            id: panel.id.to_string(),
            title: panel.title.to_string(),
            table: Some(result.as_ref().clone()),
            chart: Some(chart),
            error: None,
        })
    }
}

fn find_view(view_id: &str) -> AppResult<&'static ViewDef> {
    views::find(view_id).ok_or_else(|| AppError::ViewNotFound(view_id.to_string()))
}

//! Dashboard view, panel and chart models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::response::ApiError;

use super::query::QueryResult;

/// Chart kind rendered for a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Value per category, optionally split into several series.
    Bar,
    /// Time series.
    Line,
    /// Proportions; a non-zero hole makes it a donut.
    Pie,
}

/// One data point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartPoint {
    /// Category label (x axis, or slice name for pies).
    pub x: String,
    /// Value; `None` when the source cell is NULL or not numeric.
    pub y: Option<f64>,
}

/// A named series of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Chart data derived from a query result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Bars of different series stack on the same category.
    #[serde(default)]
    pub stacked: bool,
    /// Draw point markers on line charts.
    #[serde(default)]
    pub markers: bool,
    /// Print values on bars/slices.
    #[serde(default)]
    pub show_values: bool,
    /// Donut hole ratio for pie charts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    /// Distinct category labels across all series, in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for point in self.series.iter().flat_map(|s| &s.points) {
            if !seen.contains(&point.x.as_str()) {
                seen.push(&point.x);
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// A rendered panel: a table and its chart, or the error that prevented them.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PanelData {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// A rendered view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ViewData {
    pub id: String,
    pub title: String,
    pub header: String,
    pub panels: Vec<PanelData>,
}

/// Short description of a view for navigation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViewSummary {
    pub id: String,
    pub title: String,
    pub panel_count: usize,
}

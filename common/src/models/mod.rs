//! Shared data models.

pub mod dashboard;
pub mod query;

pub use dashboard::{
    ChartData, ChartKind, ChartPoint, ChartSeries, PanelData, ViewData, ViewSummary,
};
pub use query::{ColumnInfo, QueryResult};

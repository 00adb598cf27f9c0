//! Chart data derivation from query results.

use common::errors::{AppError, AppResult};
use common::models::dashboard::{ChartData, ChartKind, ChartPoint, ChartSeries};
use common::models::query::QueryResult;
use serde_json::Value;

/// How a panel turns its table into a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: &'static str,
    /// Category column (slice names for pies).
    pub x: &'static str,
    /// Value columns. More than one yields one series per column.
    pub y: &'static [&'static str],
    /// Splits the first value column into one series per distinct value.
    pub color: Option<&'static str>,
    pub y_label: Option<&'static str>,
    pub hole: Option<f64>,
    pub markers: bool,
    pub show_values: bool,
}

impl ChartSpec {
    const fn new(kind: ChartKind, title: &'static str, x: &'static str, y: &'static [&'static str]) -> Self {
        Self {
            kind,
            title,
            x,
            y,
            color: None,
            y_label: None,
            hole: None,
            markers: false,
            show_values: false,
        }
    }

    pub const fn bar(title: &'static str, x: &'static str, y: &'static [&'static str]) -> Self {
        Self::new(ChartKind::Bar, title, x, y)
    }

    pub const fn line(title: &'static str, x: &'static str, y: &'static [&'static str]) -> Self {
        Self::new(ChartKind::Line, title, x, y)
    }

    pub const fn pie(title: &'static str, names: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(ChartKind::Pie, title, names, values)
    }

    pub const fn color(self, column: &'static str) -> Self {
        Self {
            color: Some(column),
            ..self
        }
    }

    pub const fn y_label(self, label: &'static str) -> Self {
        Self {
            y_label: Some(label),
            ..self
        }
    }

    pub const fn hole(self, ratio: f64) -> Self {
        Self {
            hole: Some(ratio),
            ..self
        }
    }

    pub const fn markers(self) -> Self {
        Self {
            markers: true,
            ..self
        }
    }

    pub const fn show_values(self) -> Self {
        Self {
            show_values: true,
            ..self
        }
    }

    fn is_split(&self) -> bool {
        self.color.is_some() || self.y.len() > 1
    }
}

/// Builds chart data for `result`.
///
/// An empty result yields a chart without series. A non-empty result missing
/// a referenced column fails with `AppError::ChartColumnMissing`.
pub fn build_chart(spec: &ChartSpec, result: &QueryResult) -> AppResult<ChartData> {
    let series = if result.is_empty() {
        Vec::new()
    } else {
        let x = column(result, spec.x)?;
        match spec.color {
            Some(color) => {
                let y = column(result, first_value_column(spec)?)?;
                split_by_color(result, x, y, column(result, color)?)
            }
            None => spec
                .y
                .iter()
                .map(|name| -> AppResult<ChartSeries> {
                    Ok(ChartSeries {
                        name: name.to_string(),
                        points: points(result, x, column(result, name)?),
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
        }
    };

    Ok(ChartData {
        kind: spec.kind,
        title: spec.title.to_string(),
        x_label: spec.x.to_string(),
        y_label: spec
            .y_label
            .or_else(|| spec.y.first().copied())
            .unwrap_or_default()
            .to_string(),
        stacked: spec.kind == ChartKind::Bar && spec.is_split(),
        markers: spec.markers,
        show_values: spec.show_values,
        hole: spec.hole,
        series,
    })
}

fn first_value_column(spec: &ChartSpec) -> AppResult<&'static str> {
    spec.y
        .first()
        .copied()
        .ok_or_else(|| AppError::ChartColumnMissing(format!("{}: no value column", spec.title)))
}

fn column(result: &QueryResult, name: &str) -> AppResult<usize> {
    result
        .column_index(name)
        .ok_or_else(|| AppError::ChartColumnMissing(name.to_string()))
}

fn points(result: &QueryResult, x: usize, y: usize) -> Vec<ChartPoint> {
    result
        .column_values(x)
        .zip(result.column_values(y))
        .map(|(x, y)| ChartPoint {
            x: label(x),
            y: numeric(y),
        })
        .collect()
}

fn split_by_color(result: &QueryResult, x: usize, y: usize, color: usize) -> Vec<ChartSeries> {
    let mut series: Vec<ChartSeries> = Vec::new();
    for ((x, y), c) in result
        .column_values(x)
        .zip(result.column_values(y))
        .zip(result.column_values(color))
    {
        let name = label(c);
        let point = ChartPoint {
            x: label(x),
            y: numeric(y),
        };
        match series.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.points.push(point),
            None => series.push(ChartSeries {
                name,
                points: vec![point],
            }),
        }
    }
    series
}

/// Category label for a cell. Whole floats print without a fraction so
/// `14.0` from `DATE_PART` reads as hour `14`. NULL has an empty label.
fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::query::ColumnInfo;
    use serde_json::json;

    fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::new(
            columns.iter().map(|c| ColumnInfo::new(*c, "TEXT")).collect(),
            rows,
        )
    }

    #[test]
    fn test_retention_bar_has_two_categories() {
        let table = result(
            &["is_prime_user", "retention"],
            vec![vec![json!("Yes"), json!(42.5)], vec![json!("No"), json!(18.2)]],
        );
        let spec = ChartSpec::bar("Retention % by Prime Status", "is_prime_user", &["retention"]);
        let chart = build_chart(&spec, &table).unwrap();

        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.categories(), vec!["Yes", "No"]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points[0].y, Some(42.5));
        assert_eq!(chart.series[0].points[1].y, Some(18.2));
        assert!(!chart.stacked);
    }

    #[test]
    fn test_empty_result_gives_empty_chart() {
        let spec = ChartSpec::bar("CTR % by Channel", "channel", &["ctr"]);
        let chart = build_chart(&spec, &QueryResult::empty()).unwrap();
        assert!(chart.series.is_empty());
        assert!(chart.is_empty());
        assert_eq!(chart.y_label, "ctr");
    }

    #[test]
    fn test_null_values_propagate() {
        let table = result(
            &["channel", "ctr"],
            vec![vec![json!("email"), Value::Null], vec![json!("social"), json!(3.1)]],
        );
        let chart = build_chart(&ChartSpec::bar("CTR", "channel", &["ctr"]), &table).unwrap();
        assert_eq!(chart.series[0].points[0].y, None);
        assert_eq!(chart.series[0].points[1].y, Some(3.1));
    }

    #[test]
    fn test_multiple_value_columns_melt_into_series() {
        let table = result(
            &["city", "prime_users", "non_prime_users", "order_count"],
            vec![
                vec![json!("Delhi"), json!(10), json!(4), json!(30)],
                vec![json!("Pune"), json!(2), json!(7), json!(12)],
            ],
        );
        let spec = ChartSpec::bar("Users by City", "city", &["prime_users", "non_prime_users"])
            .y_label("user_count");
        let chart = build_chart(&spec, &table).unwrap();

        assert!(chart.stacked);
        assert_eq!(chart.y_label, "user_count");
        let names: Vec<_> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["prime_users", "non_prime_users"]);
        assert_eq!(chart.series[1].points[1].y, Some(7.0));
    }

    #[test]
    fn test_color_column_splits_series() {
        let table = result(
            &["warehouse_id", "location", "order_hour", "total_order"],
            vec![
                vec![json!(3), json!("North"), json!(18.0), json!(40)],
                vec![json!(1), json!("South"), json!(14.0), json!(35)],
                vec![json!(1), json!("South"), json!(18.0), json!(20)],
            ],
        );
        let spec = ChartSpec::bar("Peak", "warehouse_id", &["total_order"]).color("order_hour");
        let chart = build_chart(&spec, &table).unwrap();

        let names: Vec<_> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["18", "14"]);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.categories(), vec!["3", "1"]);
    }

    #[test]
    fn test_pie_keeps_hole() {
        let table = result(
            &["order_status", "pct_of_orders"],
            vec![vec![json!("delivered"), json!(80.0)], vec![json!("cancelled"), json!(20.0)]],
        );
        let spec = ChartSpec::pie("Order Status", "order_status", &["pct_of_orders"]).hole(0.4);
        let chart = build_chart(&spec, &table).unwrap();
        assert_eq!(chart.hole, Some(0.4));
        assert!(!chart.stacked);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let table = result(&["channel", "cr"], vec![vec![json!("email"), json!(1.0)]]);
        let err = build_chart(&ChartSpec::bar("CR", "channel", &["ctr"]), &table).unwrap_err();
        assert!(matches!(err, AppError::ChartColumnMissing(ref c) if c == "ctr"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(label(&json!(7)), "7");
        assert_eq!(label(&json!(14.0)), "14");
        assert_eq!(label(&json!(2.5)), "2.5");
        assert_eq!(label(&json!("2024-01")), "2024-01");
        assert_eq!(label(&Value::Null), "");
        assert_eq!(numeric(&json!("12.75")), Some(12.75));
        assert_eq!(numeric(&json!("NaN")), None);
        assert_eq!(numeric(&json!(true)), None);
    }

    #[test]
    fn test_null_category_gets_empty_label() {
        let table = result(
            &["city", "warehouse_id", "orders"],
            vec![
                vec![Value::Null, json!(1), json!(4)],
                vec![json!("null"), json!(2), json!(6)],
                vec![json!("Pune"), Value::Null, json!(3)],
            ],
        );
        let chart = build_chart(&ChartSpec::bar("Orders", "city", &["orders"]), &table).unwrap();
        let xs: Vec<_> = chart.series[0].points.iter().map(|p| p.x.as_str()).collect();
        assert_eq!(xs, ["", "null", "Pune"]);

        let spec = ChartSpec::bar("Orders", "city", &["orders"]).color("warehouse_id");
        let names: Vec<_> = build_chart(&spec, &table)
            .unwrap()
            .series
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["1", "2", ""]);
    }
}

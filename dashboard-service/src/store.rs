//! Query execution against the backing store.

use std::time::Instant;

use async_trait::async_trait;
use common::config::StoreConfig;
use common::errors::{AppError, AppResult};
use common::models::query::{ColumnInfo, QueryResult};
use serde_json::Value;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::{Column, Decode, Executor, PgPool, Row, TypeInfo, ValueRef};

use crate::provider::{ConnectionProvider, PgConnector};

/// Executes a complete query string and materializes every row.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn fetch_all(&self, sql: &str) -> AppResult<QueryResult>;

    /// Whether the underlying handle has been opened.
    fn is_connected(&self) -> bool {
        true
    }
}

/// PostgreSQL store sharing one lazily opened handle.
pub struct PgStore {
    provider: ConnectionProvider<PgConnector>,
}

impl PgStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            provider: ConnectionProvider::new(PgConnector::new(config)),
        }
    }

    /// Opens the shared handle now instead of on the first query.
    pub async fn connect(&self) -> AppResult<()> {
        self.provider.get_connection().await.map(|_| ())
    }
}

#[async_trait]
impl QueryStore for PgStore {
    async fn fetch_all(&self, sql: &str) -> AppResult<QueryResult> {
        let pool = self.provider.get_connection().await?;
        let start = Instant::now();

        // Simple-query protocol: no bind parameters, every cell arrives as text.
        let rows = sqlx::raw_sql(sql).fetch_all(pool).await.map_err(store_error)?;

        let columns = match rows.first() {
            Some(row) => row_columns(row),
            None => describe_columns(pool, sql).await,
        };
        let rows = rows.iter().map(decode_row).collect::<AppResult<Vec<_>>>()?;
        let elapsed = start.elapsed().as_millis() as u64;

        tracing::debug!(rows = rows.len(), elapsed_ms = elapsed, "查询执行完成");
        Ok(QueryResult::new(columns, rows).with_execution_time(elapsed))
    }

    fn is_connected(&self) -> bool {
        self.provider.is_connected()
    }
}

/// Pool and transport failures are connection errors; everything else is a query error.
fn store_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => AppError::DatabaseConnection(e.to_string()),
        other => AppError::DatabaseQuery(other.to_string()),
    }
}

fn row_columns(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Column metadata for a result with no rows.
async fn describe_columns(pool: &PgPool, sql: &str) -> Vec<ColumnInfo> {
    match pool.describe(sql).await {
        Ok(described) => described
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| ColumnInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
                nullable: described.nullable(i),
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "无法获取空结果集的列信息");
            Vec::new()
        }
    }
}

fn decode_row(row: &PgRow) -> AppResult<Vec<Value>> {
    row.columns()
        .iter()
        .map(|col| {
            let raw = row
                .try_get_raw(col.ordinal())
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            if raw.is_null() {
                return Ok(Value::Null);
            }
            let text = <&str as Decode<'_, Postgres>>::decode(raw).map_err(|e| {
                AppError::DatabaseQuery(format!("column {}: {}", col.name(), e))
            })?;
            Ok(decode_text(col.type_info().name(), text))
        })
        .collect()
}

/// Converts one text-format cell into JSON according to its store type.
pub fn decode_text(type_name: &str, text: &str) -> Value {
    match type_name {
        "BOOL" => match text {
            "t" | "true" => Value::Bool(true),
            "f" | "false" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        "INT2" | "INT4" | "INT8" | "OID" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        // NaN and infinities have no JSON number form.
        "FLOAT4" | "FLOAT8" | "NUMERIC" => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        _ => Value::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_integers() {
        assert_eq!(decode_text("INT8", "1204"), json!(1204));
        assert_eq!(decode_text("INT4", "-3"), json!(-3));
    }

    #[test]
    fn test_decode_numeric_and_float() {
        assert_eq!(decode_text("NUMERIC", "42.50"), json!(42.5));
        assert_eq!(decode_text("FLOAT8", "14"), json!(14.0));
        assert_eq!(decode_text("NUMERIC", "NaN"), json!("NaN"));
        assert_eq!(decode_text("FLOAT8", "Infinity"), json!("Infinity"));
    }

    #[test]
    fn test_decode_bool() {
        assert_eq!(decode_text("BOOL", "t"), json!(true));
        assert_eq!(decode_text("BOOL", "f"), json!(false));
    }

    #[test]
    fn test_other_types_stay_text() {
        assert_eq!(decode_text("TEXT", "Yes"), json!("Yes"));
        assert_eq!(decode_text("DATE", "2024-03-01"), json!("2024-03-01"));
        assert_eq!(decode_text("VARCHAR", "42"), json!("42"));
    }

    #[test]
    fn test_store_error_classification() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            AppError::DatabaseConnection(_)
        ));
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            AppError::DatabaseQuery(_)
        ));
    }

    /// Store backed by `DATABASE_URL`; `None` when it is not set.
    fn live_store() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = common::config::AppConfig::from_lookup("dashboard-service", 8083, |key| {
            (key == "DATABASE_URL").then(|| url.clone())
        })
        .unwrap();
        Some(PgStore::new(config.store))
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn test_null_cell_decodes_to_json_null() {
        let Some(store) = live_store() else { return };
        let result = store
            .fetch_all("SELECT 'email' AS channel, NULLIF(0, 0)::numeric AS ctr")
            .await
            .unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0], vec![json!("email"), Value::Null]);
        assert_eq!(result.columns[1].name, "ctr");
        assert_eq!(result.columns[1].data_type, "NUMERIC");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn test_empty_result_keeps_described_columns() {
        let Some(store) = live_store() else { return };
        let result = store
            .fetch_all("SELECT 1::int4 AS warehouse_id, 2::int8 AS cancellations WHERE false")
            .await
            .unwrap();
        assert!(result.is_empty());
        let names: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["warehouse_id", "cancellations"]);
        assert_eq!(result.columns[0].data_type, "INT4");
    }
}

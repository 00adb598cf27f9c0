//! Read-through query result cache.
//!
//! Results are keyed by the exact query text and reused while younger than
//! the TTL. Expiry is checked on read; nothing is evicted in the background.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::errors::AppResult;
use common::models::query::QueryResult;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::QueryStore;

struct CacheEntry {
    result: Arc<QueryResult>,
    created: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created.elapsed() < ttl
    }
}

/// Per-query slot. Held across check, execute and store so a duplicate
/// concurrent request waits for the first one instead of re-running it.
type Slot = Mutex<Option<CacheEntry>>;

/// Query cache and executor shared by every request.
pub struct QueryCache {
    store: Arc<dyn QueryStore>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn QueryStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached result for `sql`, executing it when absent or expired.
    ///
    /// Store errors propagate unchanged and are not cached.
    pub async fn run_query(&self, sql: &str) -> AppResult<Arc<QueryResult>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(sql.to_string()).or_default().clone()
        };

        let mut entry = slot.lock().await;
        if let Some(cached) = (*entry).as_ref().filter(|e| e.is_fresh(self.ttl)) {
            tracing::debug!(age_ms = cached.created.elapsed().as_millis() as u64, "查询缓存命中");
            return Ok(cached.result.clone());
        }

        let result = Arc::new(self.store.fetch_all(sql).await?);
        tracing::info!(
            rows = result.row_count,
            elapsed_ms = result.execution_time_ms,
            "查询已执行并缓存"
        );
        *entry = Some(CacheEntry {
            result: result.clone(),
            created: Instant::now(),
        });
        Ok(result)
    }

    /// Number of query strings that currently hold a fresh result.
    pub async fn fresh_entries(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.lock().await.values().cloned().collect();
        let mut fresh = 0;
        for slot in slots {
            if let Ok(entry) = slot.try_lock() {
                if (*entry).as_ref().is_some_and(|e| e.is_fresh(self.ttl)) {
                    fresh += 1;
                }
            }
        }
        fresh
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store_connected(&self) -> bool {
        self.store.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::errors::AppError;
    use common::models::query::ColumnInfo;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts executions and returns the execution number as data.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryStore for CountingStore {
        async fn fetch_all(&self, sql: &str) -> AppResult<QueryResult> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            if sql.contains("SELEC ") {
                return Err(AppError::DatabaseQuery("syntax error".into()));
            }
            Ok(QueryResult::new(
                vec![ColumnInfo::new("n", "INT8")],
                vec![vec![json!(n)]],
            ))
        }
    }

    fn cache(ttl_secs: u64) -> (QueryCache, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        (
            QueryCache::new(store.clone(), Duration::from_secs(ttl_secs)),
            store,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_ttl_returns_same_result() {
        let (cache, store) = cache(600);
        let first = cache.run_query("SELECT count(*) FROM orders").await.unwrap();
        tokio::time::advance(Duration::from_secs(599)).await;
        let second = cache.run_query("SELECT count(*) FROM orders").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_ttl_re_executes() {
        let (cache, store) = cache(600);
        let first = cache.run_query("SELECT 1").await.unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;
        let second = cache.run_query("SELECT 1").await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.rows, vec![vec![json!(1)]]);
        assert_eq!(second.rows, vec![vec![json!(2)]]);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_exactly_at_ttl() {
        let (cache, store) = cache(600);
        cache.run_query("SELECT 1").await.unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;
        cache.run_query("SELECT 1").await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_queries_are_cached_separately() {
        let (cache, store) = cache(600);
        cache.run_query("SELECT 1").await.unwrap();
        cache.run_query("SELECT 1 ").await.unwrap();
        cache.run_query("SELECT 1").await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fresh_entries().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_execute_once() {
        let (cache, store) = cache(600);
        let (a, b, c) = tokio::join!(
            cache.run_query("SELECT 1"),
            cache.run_query("SELECT 1"),
            cache.run_query("SELECT 1")
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_propagate_and_are_not_cached() {
        let (cache, store) = cache(600);
        let err = cache.run_query("SELEC 1").await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseQuery(_)));
        assert!(cache.run_query("SELEC 1").await.is_err());
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fresh_entries().await, 0);
    }
}

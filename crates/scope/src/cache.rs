//! Content-addressed result cache.
//!
//! [`ResultCache`] sits between a scope and its executor. In pass-through
//! mode (the default) it only instruments the executor call. When the
//! [`ExecutionContext`] forces caching, it looks up the query fingerprint
//! first, serves hits without contacting the engine and stores misses.
//!
//! Storage is pluggable through [`CacheStore`]; [`MemoryCacheStore`] keeps
//! entries in process with a per-entry expiry.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::compiler::CompiledQuery;
use crate::context::ExecutionContext;
use crate::error::ScopeResult;
use crate::instrumentation::{Instrumentation, QueryEvent, QueryEventKind};
use crate::types::ResultSet;

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "elasticsearch";

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Storage backend for cached result sets.
///
/// Both operations must be safe for concurrent callers. A reader must never
/// observe a partially written entry.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Returns a copy of the live entry for `key`.
    async fn get(&self, key: &str) -> Option<ResultSet>;

    /// Stores `value` under `key` for `ttl`.
    async fn put(&self, key: &str, value: ResultSet, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ResultSet,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Entry map plus the earliest expiry it holds.
#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    next_expiry: Option<Instant>,
}

impl Entries {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        self.next_expiry = self.map.values().map(|entry| entry.expires_at).min();
        before - self.map.len()
    }

    fn insert(&mut self, key: String, entry: CacheEntry, now: Instant) {
        if self.next_expiry.is_some_and(|at| now >= at) {
            let removed = self.sweep(now);
            tracing::debug!(removed, "Swept expired cache entries");
        }
        self.next_expiry = Some(match self.next_expiry {
            Some(at) => at.min(entry.expires_at),
            None => entry.expires_at,
        });
        self.map.insert(key, entry);
    }
}

/// In-process cache store.
///
/// Expired entries are dropped when read, and swept in bulk by the first
/// `put` after the earliest stored expiry has passed.
#[derive(Debug)]
pub struct MemoryCacheStore {
    namespace: String,
    entries: RwLock<Entries>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl MemoryCacheStore {
    /// Creates an empty store whose keys are prefixed with `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Returns the key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Number of stored entries. Expired entries count until swept.
    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().map.is_empty()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.entries.write().sweep(Instant::now())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.map.clear();
        entries.next_expiry = None;
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<ResultSet> {
        let key = self.namespaced(key);
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.map.get(&key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write();
        if entries.map.get(&key).is_some_and(|e| e.is_expired(now)) {
            entries.map.remove(&key);
        }
        None
    }

    async fn put(&self, key: &str, value: ResultSet, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
        };
        self.entries.write().insert(self.namespaced(key), entry, now);
    }
}

/// What a cached execution is about.
#[derive(Debug, Clone, Copy)]
pub struct CacheRequest<'a> {
    /// Model name for instrumentation.
    pub model: &'a str,
    /// Cache key.
    pub fingerprint: &'a str,
    /// The compiled query.
    pub query: &'a CompiledQuery,
}

/// Result cache shared by every scope of a model.
#[derive(Debug, Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::in_memory(DEFAULT_NAMESPACE, DEFAULT_TTL)
    }
}

impl ResultCache {
    /// Creates a cache over the given store.
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Creates a cache over a fresh [`MemoryCacheStore`].
    pub fn in_memory(namespace: impl Into<String>, ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(namespace)), ttl)
    }

    /// Returns the entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Obtains a result set, reading through the cache when `ctx` forces it.
    ///
    /// `execute` runs at most once. Its errors are returned unchanged and
    /// nothing is cached for a failed execution.
    pub async fn fetch<F, Fut>(
        &self,
        ctx: &ExecutionContext,
        request: CacheRequest<'_>,
        instrumentation: &dyn Instrumentation,
        execute: F,
    ) -> ScopeResult<ResultSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ScopeResult<ResultSet>>,
    {
        let query_body = request.query.document.body.clone();

        if ctx.is_cache_forced() {
            if let Some(hit) = self.store.get(request.fingerprint).await {
                tracing::debug!(
                    model = %request.model,
                    fingerprint = %request.fingerprint,
                    "Serving scope from cache"
                );
                instrumentation.emit(
                    &QueryEvent::new(
                        QueryEventKind::CacheHit,
                        request.model,
                        request.fingerprint,
                        query_body,
                    )
                    .with_correlation_id(ctx.correlation_id()),
                );
                return Ok(hit);
            }
        }

        let started = Instant::now();
        let results = execute().await?;
        instrumentation.emit(
            &QueryEvent::new(
                QueryEventKind::QueryExecuted,
                request.model,
                request.fingerprint,
                query_body,
            )
            .with_elapsed(started.elapsed())
            .with_correlation_id(ctx.correlation_id()),
        );

        if ctx.is_cache_forced() {
            self.store
                .put(request.fingerprint, results.clone(), self.ttl)
                .await;
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::instrumentation::RecordingInstrumentation;
    use crate::types::{ClauseMap, Record};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> ResultSet {
        ResultSet::new(
            vec![Record::new(Some("1".to_string()), json!({ "n": 1 }))],
            1,
            Default::default(),
        )
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCacheStore::new("test");
        assert!(store.get("k").await.is_none());

        store.put("k", sample(), Duration::from_secs(60)).await;
        assert_eq!(store.get("k").await, Some(sample()));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expiry() {
        let store = MemoryCacheStore::default();
        store.put("k", sample(), Duration::from_secs(10)).await;

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("k").await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::default();
        store.put("short", sample(), Duration::from_secs(1)).await;
        store.put("long", sample(), Duration::from_secs(100)).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_entries() {
        let store = MemoryCacheStore::default();
        for i in 0..1000 {
            store
                .put(&format!("q-{i}"), sample(), Duration::from_secs(1))
                .await;
        }
        store.put("long", sample(), Duration::from_secs(100)).await;
        assert_eq!(store.len(), 1001);

        tokio::time::advance(Duration::from_secs(10)).await;
        store.put("fresh", sample(), Duration::from_secs(1)).await;

        assert_eq!(store.len(), 2);
        assert!(store.get("long").await.is_some());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_before_earliest_expiry_keeps_entries() {
        let store = MemoryCacheStore::default();
        store.put("a", sample(), Duration::from_secs(5)).await;
        store.put("b", sample(), Duration::from_secs(1)).await;

        tokio::time::advance(Duration::from_millis(500)).await;
        store.put("c", sample(), Duration::from_secs(5)).await;
        assert_eq!(store.len(), 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        store.put("d", sample(), Duration::from_secs(5)).await;
        assert_eq!(store.len(), 3);
        assert!(store.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_pass_through_never_stores() {
        let cache = ResultCache::default();
        let sink = RecordingInstrumentation::new();
        let query = compile(&ClauseMap::new()).unwrap();
        let calls = AtomicUsize::new(0);
        let ctx = ExecutionContext::new();

        for _ in 0..2 {
            let request = CacheRequest {
                model: "Article",
                fingerprint: "fp",
                query: &query,
            };
            cache
                .fetch(&ctx, request, &sink, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.count(QueryEventKind::QueryExecuted), 2);
        assert_eq!(sink.count(QueryEventKind::CacheHit), 0);
        assert!(cache.store().get("fp").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_forced_reads_through() {
        let cache = ResultCache::default();
        let sink = RecordingInstrumentation::new();
        let query = compile(&ClauseMap::new()).unwrap();
        let calls = AtomicUsize::new(0);
        let ctx = ExecutionContext::cached().with_correlation_id("req-9");

        for _ in 0..3 {
            let request = CacheRequest {
                model: "Article",
                fingerprint: "fp",
                query: &query,
            };
            let results = cache
                .fetch(&ctx, request, &sink, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await
                .unwrap();
            assert_eq!(results.total, 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.count(QueryEventKind::QueryExecuted), 1);
        assert_eq!(sink.count(QueryEventKind::CacheHit), 2);
        assert!(
            sink.events()
                .iter()
                .all(|e| e.correlation_id.as_deref() == Some("req-9"))
        );
    }

    #[tokio::test]
    async fn test_fetch_does_not_cache_failures() {
        let cache = ResultCache::default();
        let sink = RecordingInstrumentation::new();
        let query = compile(&ClauseMap::new()).unwrap();
        let ctx = ExecutionContext::cached();
        let request = CacheRequest {
            model: "Article",
            fingerprint: "fp",
            query: &query,
        };

        let result = cache
            .fetch(&ctx, request, &sink, || async {
                Err(crate::error::ScopeError::argument("where"))
            })
            .await;

        assert!(result.is_err());
        assert!(cache.store().get("fp").await.is_none());
        assert!(sink.events().is_empty());
    }
}

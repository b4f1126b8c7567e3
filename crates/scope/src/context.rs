//! Execution context for loading scopes.
//!
//! Every load takes an [`ExecutionContext`]. The context decides whether the
//! result cache is consulted, so two requests running side by side can use
//! different cache modes without observing each other.

use std::future::Future;

/// Whether executions read through the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// Always call the executor; the cache is neither read nor written.
    #[default]
    PassThrough,
    /// Look up the cache first and store misses.
    Forced,
}

/// Per-request settings threaded through scope execution.
///
/// # Examples
///
/// ```
/// use helios_scope::context::{CacheMode, ExecutionContext};
///
/// let ctx = ExecutionContext::new().with_correlation_id("req-42");
/// assert_eq!(ctx.cache_mode(), CacheMode::PassThrough);
///
/// let cached = ctx.clone().with_cache_mode(CacheMode::Forced);
/// assert!(cached.is_cache_forced());
/// assert!(!ctx.is_cache_forced());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cache_mode: CacheMode,
    correlation_id: Option<String>,
}

impl ExecutionContext {
    /// Creates a pass-through context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that reads through the cache.
    pub fn cached() -> Self {
        Self::new().with_cache_mode(CacheMode::Forced)
    }

    /// Sets the cache mode.
    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    /// Sets the correlation ID attached to instrumentation events.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the cache mode.
    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    /// Returns `true` if executions read through the cache.
    pub fn is_cache_forced(&self) -> bool {
        self.cache_mode == CacheMode::Forced
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Runs `body` with a forced-cache copy of this context.
    ///
    /// The cache mode only applies to loads that receive the context handed to
    /// `body`; `self` keeps its own mode.
    ///
    /// ```ignore
    /// let total = ctx
    ///     .cache(|ctx| async move {
    ///         let mut open = articles.where_(("status", "open"))?;
    ///         open.load(&ctx).await.map(|r| r.total)
    ///     })
    ///     .await?;
    /// ```
    pub async fn cache<F, Fut, T>(&self, body: F) -> T
    where
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = T>,
    {
        let forced = self.clone().with_cache_mode(CacheMode::Forced);
        body(forced).await
    }
}

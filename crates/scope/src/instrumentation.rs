//! Instrumentation events emitted around query execution.
//!
//! Sinks are fire-and-forget: [`Instrumentation::emit`] returns nothing and
//! implementations must not block or panic.

use std::fmt::{self, Debug};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

/// The kind of an instrumentation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryEventKind {
    /// The executor was called.
    QueryExecuted,
    /// The result was served from the cache.
    CacheHit,
}

impl QueryEventKind {
    /// Returns the event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryEventKind::QueryExecuted => "query.executed",
            QueryEventKind::CacheHit => "cache.query.hit",
        }
    }
}

impl fmt::Display for QueryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single instrumentation event.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    /// Event kind.
    pub kind: QueryEventKind,
    /// Model name.
    pub model: String,
    /// Cache fingerprint of the compiled query.
    pub fingerprint: String,
    /// Compiled query body.
    pub query: Value,
    /// Executor round-trip time, for executed queries.
    pub elapsed: Option<Duration>,
    /// Correlation ID of the execution context.
    pub correlation_id: Option<String>,
    /// When the event was emitted.
    pub at: DateTime<Utc>,
}

impl QueryEvent {
    /// Creates an event.
    pub fn new(
        kind: QueryEventKind,
        model: impl Into<String>,
        fingerprint: impl Into<String>,
        query: Value,
    ) -> Self {
        Self {
            kind,
            model: model.into(),
            fingerprint: fingerprint.into(),
            query,
            elapsed: None,
            correlation_id: None,
            at: Utc::now(),
        }
    }

    /// Sets the elapsed time.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Sets the correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: Option<&str>) -> Self {
        self.correlation_id = correlation_id.map(str::to_string);
        self
    }
}

/// Receives instrumentation events.
pub trait Instrumentation: Send + Sync + Debug {
    /// Records an event.
    fn emit(&self, event: &QueryEvent);
}

/// Emits events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn emit(&self, event: &QueryEvent) {
        tracing::debug!(
            event = event.kind.as_str(),
            model = %event.model,
            fingerprint = %event.fingerprint,
            elapsed_ms = event.elapsed.map(|d| d.as_millis() as u64),
            correlation_id = event.correlation_id.as_deref(),
            query = %event.query,
            "scope query"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn emit(&self, _event: &QueryEvent) {}
}

/// Keeps events in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingInstrumentation {
    events: Mutex<Vec<QueryEvent>>,
}

impl RecordingInstrumentation {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<QueryEvent> {
        self.events.lock().clone()
    }

    /// Counts recorded events of the given kind.
    pub fn count(&self, kind: QueryEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// Forgets all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Instrumentation for RecordingInstrumentation {
    fn emit(&self, event: &QueryEvent) {
        self.events.lock().push(event.clone());
    }
}

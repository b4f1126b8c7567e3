//! Shared test infrastructure for scope integration tests.
//!
//! Provides an in-memory [`RecordingExecutor`] that counts calls and returns
//! canned hits, an in-memory [`RecordingPersister`], and model fixtures wired
//! to a [`RecordingInstrumentation`] sink.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use helios_scope::compiler::CompiledQuery;
use helios_scope::error::ExecutorError;
use helios_scope::executor::{Executor, Persister, RawHit, SearchResponse};
use helios_scope::instrumentation::RecordingInstrumentation;
use helios_scope::model::ModelBuilder;
use helios_scope::types::Record;
use helios_scope::{Model, ResultCache};

/// A request seen by [`RecordingExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub index: String,
    pub query: CompiledQuery,
}

/// Executor returning canned hits and remembering every request.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    hits: Vec<RawHit>,
    aggregations: Map<String, Value>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    fail_with_status: Option<u16>,
}

impl RecordingExecutor {
    /// An executor whose index holds `hits`.
    pub fn with_hits(hits: Vec<RawHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// An executor that answers every request with the given engine status.
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Default::default()
        }
    }

    /// Adds aggregation results to every response.
    pub fn with_aggregations(mut self, aggregations: Value) -> Self {
        if let Value::Object(map) = aggregations {
            self.aggregations = map;
        }
        self
    }

    /// Number of search calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn search(
        &self,
        index: &str,
        query: &CompiledQuery,
    ) -> Result<SearchResponse, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(RecordedRequest {
            index: index.to_string(),
            query: query.clone(),
        });

        if let Some(status) = self.fail_with_status {
            return Err(ExecutorError::Engine {
                backend_name: "recording".to_string(),
                status,
                message: "canned failure".to_string(),
            });
        }

        let total = self.hits.len() as u64;
        let from = query.options.from.unwrap_or(0) as usize;
        let size = query.options.size.map(|s| s as usize).unwrap_or(usize::MAX);
        let hits = self.hits.iter().skip(from).take(size).cloned().collect();

        Ok(SearchResponse::new(hits, total).with_aggregations(self.aggregations.clone()))
    }
}

/// Persister storing created documents in memory.
#[derive(Debug, Default)]
pub struct RecordingPersister {
    created: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingPersister {
    /// Documents created so far, with their index.
    pub fn created(&self) -> Vec<(String, Map<String, Value>)> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl Persister for RecordingPersister {
    async fn create(
        &self,
        index: &str,
        attributes: Map<String, Value>,
    ) -> Result<Record, ExecutorError> {
        let mut created = self.created.lock();
        created.push((index.to_string(), attributes.clone()));
        let mut record = Record::new(Some(created.len().to_string()), Value::Object(attributes));
        record.index = Some(index.to_string());
        Ok(record)
    }
}

/// Builds a raw hit for the `articles` index.
pub fn hit(id: &str, source: Value) -> RawHit {
    RawHit {
        index: Some("articles".to_string()),
        id: Some(id.to_string()),
        score: Some(1.0),
        source,
        ..Default::default()
    }
}

/// Three article hits.
pub fn article_hits() -> Vec<RawHit> {
    vec![
        hit("1", json!({ "title": "Ownership", "status": "open", "tenant_id": 7 })),
        hit("2", json!({ "title": "Borrowing", "status": "open", "tenant_id": 7 })),
        hit("3", json!({ "title": "Lifetimes", "status": "closed", "tenant_id": 7 })),
    ]
}

/// A model under test together with its collaborators.
pub struct Fixture {
    pub model: Arc<Model>,
    pub executor: Arc<RecordingExecutor>,
    pub events: Arc<RecordingInstrumentation>,
}

impl Fixture {
    /// An `Article` model over [`article_hits`].
    pub fn articles() -> Self {
        Self::with(RecordingExecutor::with_hits(article_hits()), |b| b)
    }

    /// An `Article` model over `executor`, customized by `configure`.
    pub fn with(
        executor: RecordingExecutor,
        configure: impl FnOnce(ModelBuilder) -> ModelBuilder,
    ) -> Self {
        let executor = Arc::new(executor);
        let events = Arc::new(RecordingInstrumentation::new());
        let builder = Model::builder("Article", executor.clone())
            .instrumentation(events.clone())
            .cache(ResultCache::in_memory("test", std::time::Duration::from_secs(60)));
        let model = configure(builder).build();

        Self {
            model,
            executor,
            events,
        }
    }
}

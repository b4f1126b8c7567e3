//! Collaborators that talk to the search engine.
//!
//! The scope layer never performs I/O itself. It hands compiled queries to an
//! [`Executor`], turns the raw hits it gets back into records with a
//! [`Hydrator`], and delegates document creation to a [`Persister`].
//!
//! - [`hydrator`] - Raw hit to record conversion
//! - `elasticsearch` - Executor and persister backed by the official client
//!   (requires the `elasticsearch` feature)

pub mod hydrator;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::CompiledQuery;
use crate::error::ExecutorError;
use crate::types::Record;

pub use hydrator::{Hydrator, SourceHydrator};

/// A raw hit as returned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Index the hit came from.
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    /// Document ID.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Relevance score.
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// Document body.
    #[serde(rename = "_source", default)]
    pub source: Value,
    /// Highlight fragments.
    #[serde(default)]
    pub highlight: Map<String, Value>,
    /// Sort values.
    #[serde(default)]
    pub sort: Vec<Value>,
}

/// The raw outcome of a search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Hits in engine order.
    pub hits: Vec<RawHit>,
    /// Total number of matches.
    pub total: u64,
    /// Aggregation results keyed by name.
    pub aggregations: Map<String, Value>,
}

impl SearchResponse {
    /// Creates a response.
    pub fn new(hits: Vec<RawHit>, total: u64) -> Self {
        Self {
            hits,
            total,
            aggregations: Map::new(),
        }
    }

    /// Adds aggregation results.
    pub fn with_aggregations(mut self, aggregations: Map<String, Value>) -> Self {
        self.aggregations = aggregations;
        self
    }

    /// Parses an Elasticsearch search response body.
    ///
    /// Accepts both the object form of `hits.total` (`{"value": n}`) and the
    /// older bare number.
    pub fn from_body(backend_name: &str, body: &Value) -> Result<Self, ExecutorError> {
        let hits_node = body.get("hits").ok_or_else(|| ExecutorError::Response {
            backend_name: backend_name.to_string(),
            message: "missing hits".to_string(),
        })?;

        let hits = match hits_node.get("hits") {
            Some(raw) => serde_json::from_value::<Vec<RawHit>>(raw.clone()).map_err(|e| {
                ExecutorError::Response {
                    backend_name: backend_name.to_string(),
                    message: format!("Failed to parse hits: {}", e),
                }
            })?,
            None => Vec::new(),
        };

        let total = hits_node
            .get("total")
            .and_then(|t| t.get("value").and_then(Value::as_u64).or_else(|| t.as_u64()))
            .unwrap_or(hits.len() as u64);

        let aggregations = body
            .get("aggregations")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            hits,
            total,
            aggregations,
        })
    }
}

/// Performs search requests against the engine.
///
/// Implementations own transport concerns: connection handling, timeouts and
/// retries. Errors are propagated to the caller unchanged.
#[async_trait]
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Returns the backend name used in error messages.
    fn name(&self) -> &'static str;

    /// Executes a compiled query against an index.
    async fn search(
        &self,
        index: &str,
        query: &CompiledQuery,
    ) -> Result<SearchResponse, ExecutorError>;
}

/// Creates documents on behalf of a scope.
#[async_trait]
pub trait Persister: Send + Sync + std::fmt::Debug {
    /// Stores a new document and returns it as a record.
    async fn create(
        &self,
        index: &str,
        attributes: Map<String, Value>,
    ) -> Result<Record, ExecutorError>;
}

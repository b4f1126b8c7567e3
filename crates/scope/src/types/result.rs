//! Records and result sets produced by executing a scope.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ScopeError, ScopeResult};

/// Number of records shown by [`ResultSet::preview`].
pub const PREVIEW_LIMIT: usize = 10;

/// A hydrated search hit.
///
/// Records are opaque to the scope layer: they carry the document body and
/// the hit metadata, and can be deserialized into a domain type on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Document ID.
    pub id: Option<String>,
    /// Index the hit came from.
    pub index: Option<String>,
    /// Relevance score.
    pub score: Option<f64>,
    /// Document body.
    pub source: Value,
    /// Highlight fragments keyed by field.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub highlight: Map<String, Value>,
}

impl Record {
    /// Creates a record from a document body.
    pub fn new(id: Option<String>, source: Value) -> Self {
        Self {
            id,
            index: None,
            score: None,
            source,
            highlight: Map::new(),
        }
    }

    /// Returns a top-level attribute of the document body.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.source.get(attribute)
    }

    /// Deserializes the document body into a domain type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ScopeResult<T> {
        serde_json::from_value(self.source.clone()).map_err(|e| ScopeError::Hydration {
            message: e.to_string(),
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#<Record {} {}>", id, self.source),
            None => write!(f, "#<Record {}>", self.source),
        }
    }
}

/// The outcome of executing a scope.
///
/// Immutable once built. Copies handed out by the result cache are clones,
/// never shared references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Hydrated records, in hit order.
    pub records: Vec<Record>,
    /// Total number of matching documents.
    pub total: u64,
    /// Aggregation results keyed by aggregation name.
    pub aggregations: Map<String, Value>,
}

impl ResultSet {
    /// Creates a result set.
    pub fn new(records: Vec<Record>, total: u64, aggregations: Map<String, Value>) -> Self {
        Self {
            records,
            total,
            aggregations,
        }
    }

    /// An empty result set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the first record.
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Returns the last record.
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Returns the number of materialized records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records were materialized.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Returns an aggregation result by name.
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.get(name)
    }

    /// Renders a bounded preview: the first records, the total and the
    /// aggregation names.
    pub fn preview(&self) -> String {
        let mut entries: Vec<String> = self
            .records
            .iter()
            .take(PREVIEW_LIMIT)
            .map(ToString::to_string)
            .collect();
        if self.records.len() > PREVIEW_LIMIT {
            entries.push("...".to_string());
        }
        let aggregations: Vec<&str> = self.aggregations.keys().map(String::as_str).collect();
        format!(
            "[{}], total: {}, aggregations: [{}]",
            entries.join(", "),
            self.total,
            aggregations.join(", ")
        )
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Article {
        title: String,
    }

    #[test]
    fn test_record_deserialize() {
        let record = Record::new(Some("1".to_string()), json!({ "title": "Hello" }));
        let article: Article = record.deserialize().unwrap();
        assert_eq!(article.title, "Hello");
        assert_eq!(record.get("title"), Some(&json!("Hello")));
    }

    #[test]
    fn test_record_deserialize_mismatch() {
        let record = Record::new(None, json!({ "name": 1 }));
        let result: ScopeResult<Article> = record.deserialize();
        assert!(matches!(result, Err(ScopeError::Hydration { .. })));
    }

    #[test]
    fn test_preview_is_bounded() {
        let records = (0..15)
            .map(|i| Record::new(Some(i.to_string()), json!({ "n": i })))
            .collect();
        let mut aggregations = Map::new();
        aggregations.insert("by_status".to_string(), json!({ "buckets": [] }));
        let results = ResultSet::new(records, 42, aggregations);

        let preview = results.preview();
        assert!(preview.contains("#<Record 9 "));
        assert!(!preview.contains("#<Record 10 "));
        assert!(preview.contains("..."));
        assert!(preview.ends_with("total: 42, aggregations: [by_status]"));
    }

    #[test]
    fn test_empty_result_set() {
        let results = ResultSet::empty();
        assert!(results.is_empty());
        assert_eq!(results.total, 0);
        assert!(results.first().is_none());
        assert_eq!(results.preview(), "[], total: 0, aggregations: []");
    }
}

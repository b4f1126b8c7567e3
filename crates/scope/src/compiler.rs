//! Elasticsearch Query DSL compiler.
//!
//! Translates a [`ClauseMap`] into a [`QueryDocument`] plus the
//! [`SearchOptions`] that travel next to it. Compilation is pure and
//! deterministic: the same clause map always produces byte-identical output,
//! which is what the result cache fingerprints.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::error::{ScopeError, ScopeResult};
use crate::types::{
    ClauseArgs, ClauseMap, HighlightClause, NamedClause, OrderClause, SearchType, SortDirection,
    SourceFilter, WhereClause,
};

/// A compiled request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDocument {
    /// The complete body.
    pub body: Value,
}

impl QueryDocument {
    /// Returns a node of the body by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Returns `true` if the body has a `query` node.
    pub fn has_query(&self) -> bool {
        self.body.get("query").is_some()
    }

    /// Serializes the body to its canonical JSON string.
    pub fn to_json_string(&self) -> String {
        self.body.to_string()
    }
}

/// Request options sent alongside the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Number of hits to return; `Some(0)` asks for the total only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Number of hits to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// Shard routing value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    /// Search type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    /// Caller-supplied options.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl SearchOptions {
    /// Returns `true` if only the total is requested.
    pub fn is_count_only(&self) -> bool {
        self.size == Some(0)
    }
}

/// The output of compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Request body.
    pub document: QueryDocument,
    /// Request options.
    pub options: SearchOptions,
}

impl CompiledQuery {
    /// Returns the SHA-256 fingerprint of this query against the given index.
    ///
    /// Options take part in the fingerprint so that a count (`size=0`) and a
    /// full fetch of the same body never share a cache entry.
    pub fn fingerprint(&self, index: &str) -> String {
        // Options are plain data and always serialize; the Debug form only
        // guards against two distinct option sets hashing the same.
        let options = serde_json::to_string(&self.options)
            .unwrap_or_else(|_| format!("{:?}", self.options));
        let mut hasher = Sha256::new();
        hasher.update(index.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.document.to_json_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(options.as_bytes());

        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(&mut out, "{byte:02x}");
        }
        out
    }
}

/// Builds Elasticsearch requests from clause maps.
pub struct QueryCompiler<'a> {
    clauses: &'a ClauseMap,
}

impl<'a> QueryCompiler<'a> {
    /// Creates a compiler for the given clauses.
    pub fn new(clauses: &'a ClauseMap) -> Self {
        Self { clauses }
    }

    /// Compiles the clauses into a request body and options.
    ///
    /// # Errors
    ///
    /// * `ScopeError::InvalidSortDirection` - an order clause used a direction other than asc/desc
    /// * `ScopeError::UnsupportedArgumentType` - a filter or aggregation argument was not an object or array
    pub fn compile(&self) -> ScopeResult<CompiledQuery> {
        let mut body = Map::new();

        if let Some(query) = self.build_query()? {
            body.insert("query".to_string(), query);
        }

        if !self.clauses.filters.is_empty() {
            body.insert("filter".to_string(), self.build_filters()?);
        }

        if !self.clauses.aggregations.is_empty() {
            body.insert("aggregations".to_string(), self.build_aggregations()?);
        }

        if !self.clauses.orders.is_empty() {
            body.insert("sort".to_string(), build_sort(&self.clauses.orders)?);
        }

        if !self.clauses.fields.is_empty() {
            body.insert("fields".to_string(), json!(self.clauses.fields));
        }

        if let Some(source) = build_source(&self.clauses.sources) {
            body.insert("_source".to_string(), source);
        }

        if !self.clauses.highlights.is_empty() {
            body.insert(
                "highlight".to_string(),
                build_highlight(&self.clauses.highlights),
            );
        }

        let compiled = CompiledQuery {
            document: QueryDocument {
                body: Value::Object(body),
            },
            options: self.build_search_options(),
        };

        tracing::debug!(
            query = %compiled.document.to_json_string(),
            size = ?compiled.options.size,
            "compiled scope"
        );

        Ok(compiled)
    }

    /// Builds the `query` node, or `None` to match all documents.
    fn build_query(&self) -> ScopeResult<Option<Value>> {
        let base = self.build_bool_query();

        if self.clauses.query_filters.is_empty() {
            return Ok(base);
        }

        let filters = self
            .clauses
            .query_filters
            .iter()
            .map(|f| extract_clause("filter", f))
            .collect::<ScopeResult<Vec<Value>>>()?;

        Ok(Some(json!({
            "filtered": {
                "query": base.unwrap_or_else(|| json!({ "match_all": {} })),
                "filter": { "and": filters }
            }
        })))
    }

    /// Builds the bool query from where/must_not/should/query_string clauses.
    fn build_bool_query(&self) -> Option<Value> {
        if !self.clauses.has_query() {
            return None;
        }

        let mut must: Vec<Value> = self.clauses.wheres.iter().map(term_clause).collect();
        if !self.clauses.query_strings.is_empty() {
            must.push(json!({
                "query_string": { "query": self.clauses.query_strings.join(" AND ") }
            }));
        }
        let must_not: Vec<Value> = self.clauses.must_nots.iter().map(term_clause).collect();
        let should: Vec<Value> = self.clauses.shoulds.iter().map(term_clause).collect();

        let mut bool_query = Map::new();
        if let Some(must) = normalize(must) {
            bool_query.insert("must".to_string(), must);
        }
        if let Some(must_not) = normalize(must_not) {
            bool_query.insert("must_not".to_string(), must_not);
        }
        if let Some(should) = normalize(should) {
            bool_query.insert("should".to_string(), should);
        }

        Some(json!({ "bool": bool_query }))
    }

    /// Builds top-level filters; each clause is an independent sibling.
    fn build_filters(&self) -> ScopeResult<Value> {
        let filters = self
            .clauses
            .filters
            .iter()
            .map(|f| extract_clause("filter", f))
            .collect::<ScopeResult<Vec<Value>>>()?;
        Ok(Value::Array(filters))
    }

    /// Builds the aggregation map keyed by clause name.
    fn build_aggregations(&self) -> ScopeResult<Value> {
        let mut aggregations = Map::new();
        for clause in &self.clauses.aggregations {
            aggregations.insert(clause.name.clone(), extract_args("facet", clause)?);
        }
        Ok(Value::Object(aggregations))
    }

    fn build_search_options(&self) -> SearchOptions {
        let mut extra = Map::new();
        for (key, value) in &self.clauses.search_options {
            if BUILT_IN_OPTIONS.contains(&key.as_str()) {
                tracing::debug!(option = %key, "search option shadowed by built-in slot");
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        SearchOptions {
            size: self.clauses.size,
            from: self.clauses.offset,
            routing: self.clauses.routing.clone(),
            search_type: self.clauses.search_type,
            extra,
        }
    }
}

/// Option names owned by dedicated chain methods.
const BUILT_IN_OPTIONS: [&str; 4] = ["size", "from", "routing", "search_type"];

/// Compiles a clause map.
pub fn compile(clauses: &ClauseMap) -> ScopeResult<CompiledQuery> {
    QueryCompiler::new(clauses).compile()
}

/// Collapses single-element clause lists to the bare element.
fn normalize(mut clauses: Vec<Value>) -> Option<Value> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Value::Array(clauses)),
    }
}

fn term_clause(clause: &WhereClause) -> Value {
    match clause {
        WhereClause::Term { field, value } if value.is_array() => {
            json!({ "terms": { field.as_str(): value } })
        }
        WhereClause::Term { field, value } => json!({ "term": { field.as_str(): value } }),
        WhereClause::Raw(expr) => json!({ "query_string": { "query": expr } }),
    }
}

/// Renders `{name: args}`.
fn extract_clause(clause: &str, named: &NamedClause) -> ScopeResult<Value> {
    let args = extract_args(clause, named)?;
    Ok(json!({ named.name.as_str(): args }))
}

fn extract_args(clause: &str, named: &NamedClause) -> ScopeResult<Value> {
    match &named.args {
        ClauseArgs::Keyed(map) => Ok(Value::Object(map.clone())),
        ClauseArgs::List(items) => Ok(Value::Array(
            items.iter().cloned().map(Value::Object).collect(),
        )),
        ClauseArgs::Unsupported(_) => Err(ScopeError::UnsupportedArgumentType {
            clause: clause.to_string(),
            name: named.name.clone(),
            found: named.args.type_name().to_string(),
        }),
    }
}

fn build_sort(orders: &[OrderClause]) -> ScopeResult<Value> {
    let mut sort_clauses = Vec::with_capacity(orders.len());
    for order in orders {
        let direction = SortDirection::parse(&order.direction).ok_or_else(|| {
            ScopeError::InvalidSortDirection {
                field: order.field.clone(),
                direction: order.direction.clone(),
            }
        })?;
        sort_clauses.push(json!({ order.field.as_str(): direction.as_str() }));
    }
    Ok(Value::Array(sort_clauses))
}

fn build_source(sources: &[SourceFilter]) -> Option<Value> {
    let mut includes: Vec<&str> = Vec::new();
    let mut excludes: Vec<&str> = Vec::new();
    for source in sources {
        includes.extend(source.includes.iter().map(String::as_str));
        excludes.extend(source.excludes.iter().map(String::as_str));
    }

    if includes.is_empty() && excludes.is_empty() {
        return None;
    }

    let mut node = Map::new();
    if !includes.is_empty() {
        node.insert("includes".to_string(), json!(includes));
    }
    if !excludes.is_empty() {
        node.insert("excludes".to_string(), json!(excludes));
    }
    Some(Value::Object(node))
}

fn build_highlight(highlights: &[HighlightClause]) -> Value {
    let mut fields = Map::new();
    for highlight in highlights {
        fields.insert(
            highlight.field.clone(),
            Value::Object(highlight.options.clone()),
        );
    }
    json!({ "fields": fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses() -> ClauseMap {
        ClauseMap::new()
    }

    #[test]
    fn test_empty_clauses_have_no_query_node() {
        let compiled = compile(&clauses()).unwrap();
        assert!(!compiled.document.has_query());
        assert_eq!(compiled.document.body, json!({}));
        assert_eq!(compiled.options, SearchOptions::default());
    }

    #[test]
    fn test_single_where_collapses_to_bare_term() {
        let mut c = clauses();
        c.wheres.push(WhereClause::term("status", "open"));
        let compiled = compile(&c).unwrap();

        assert_eq!(
            compiled.document.body["query"]["bool"]["must"],
            json!({ "term": { "status": "open" } })
        );
    }

    #[test]
    fn test_two_wheres_compile_to_list() {
        let mut c = clauses();
        c.wheres.push(WhereClause::term("status", "open"));
        c.wheres.push(WhereClause::term("tenant_id", 7));
        let compiled = compile(&c).unwrap();

        assert_eq!(
            compiled.document.body["query"]["bool"]["must"],
            json!([
                { "term": { "status": "open" } },
                { "term": { "tenant_id": 7 } }
            ])
        );
    }

    #[test]
    fn test_array_value_compiles_to_terms() {
        let mut c = clauses();
        c.wheres
            .push(WhereClause::term("status", json!(["open", "closed"])));
        let compiled = compile(&c).unwrap();
        assert_eq!(
            compiled.document.body["query"]["bool"]["must"],
            json!({ "terms": { "status": ["open", "closed"] } })
        );
    }

    #[test]
    fn test_bool_sub_clauses_and_query_string() {
        let mut c = clauses();
        c.wheres.push(WhereClause::Raw("title:rust".to_string()));
        c.query_strings.push("ownership".to_string());
        c.query_strings.push("borrowing".to_string());
        c.must_nots.push(WhereClause::term("draft", true));
        c.shoulds.push(WhereClause::term("featured", true));
        c.shoulds.push(WhereClause::term("pinned", true));
        let compiled = compile(&c).unwrap();

        let bool_query = &compiled.document.body["query"]["bool"];
        assert_eq!(
            bool_query["must"],
            json!([
                { "query_string": { "query": "title:rust" } },
                { "query_string": { "query": "ownership AND borrowing" } }
            ])
        );
        assert_eq!(bool_query["must_not"], json!({ "term": { "draft": true } }));
        assert!(bool_query["should"].is_array());
    }

    #[test]
    fn test_query_filters_wrap_query_in_filtered_and() {
        let mut c = clauses();
        c.wheres.push(WhereClause::term("status", "open"));
        c.query_filters.push(NamedClause::new(
            "range",
            json!({ "views": { "gte": 10 } }),
        ));
        c.query_filters
            .push(NamedClause::new("exists", json!({ "field": "title" })));
        let compiled = compile(&c).unwrap();

        assert_eq!(
            compiled.document.body["query"],
            json!({
                "filtered": {
                    "query": { "bool": { "must": { "term": { "status": "open" } } } },
                    "filter": { "and": [
                        { "range": { "views": { "gte": 10 } } },
                        { "exists": { "field": "title" } }
                    ] }
                }
            })
        );
    }

    #[test]
    fn test_query_filters_without_query_match_all() {
        let mut c = clauses();
        c.query_filters
            .push(NamedClause::new("exists", json!({ "field": "title" })));
        let compiled = compile(&c).unwrap();
        assert_eq!(
            compiled.document.body["query"]["filtered"]["query"],
            json!({ "match_all": {} })
        );
    }

    #[test]
    fn test_plain_filters_are_siblings() {
        let mut c = clauses();
        c.filters
            .push(NamedClause::new("range", json!({ "gte": 1, "lte": 10 })));
        c.filters
            .push(NamedClause::new("exists", json!({ "field": "title" })));
        let compiled = compile(&c).unwrap();

        assert!(!compiled.document.has_query());
        assert_eq!(
            compiled.document.body["filter"],
            json!([
                { "range": { "gte": 1, "lte": 10 } },
                { "exists": { "field": "title" } }
            ])
        );
    }

    #[test]
    fn test_unsupported_filter_argument() {
        let mut c = clauses();
        c.filters.push(NamedClause::new("range", "bad"));
        let err = compile(&c).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::UnsupportedArgumentType { ref clause, ref name, .. }
                if clause == "filter" && name == "range"
        ));
    }

    #[test]
    fn test_aggregations_object_and_array_forms() {
        let mut c = clauses();
        c.aggregations.push(NamedClause::new(
            "by_status",
            json!({ "terms": { "field": "status" } }),
        ));
        c.aggregations.push(NamedClause {
            name: "ranges".to_string(),
            args: ClauseArgs::from(json!([{ "to": 10 }, { "from": 10 }])),
        });
        let compiled = compile(&c).unwrap();

        assert_eq!(
            compiled.document.body["aggregations"],
            json!({
                "by_status": { "terms": { "field": "status" } },
                "ranges": [{ "to": 10 }, { "from": 10 }]
            })
        );
    }

    #[test]
    fn test_unsupported_aggregation_argument() {
        let mut c = clauses();
        c.aggregations.push(NamedClause::new("by_status", json!(42)));
        assert!(matches!(
            compile(&c),
            Err(ScopeError::UnsupportedArgumentType { .. })
        ));
    }

    #[test]
    fn test_sort_preserves_order_and_normalizes_case() {
        let mut c = clauses();
        c.orders.push(OrderClause::new("created_at", "DESC"));
        c.orders.push(OrderClause::new("title", "asc"));
        let compiled = compile(&c).unwrap();

        assert_eq!(
            compiled.document.body["sort"],
            json!([{ "created_at": "desc" }, { "title": "asc" }])
        );
    }

    #[test]
    fn test_invalid_sort_direction() {
        let mut c = clauses();
        c.orders.push(OrderClause::new("title", "sideways"));
        let err = compile(&c).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::InvalidSortDirection { ref direction, .. } if direction == "sideways"
        ));
    }

    #[test]
    fn test_projection_and_highlight() {
        let mut c = clauses();
        c.fields.push("title".to_string());
        c.sources.push(SourceFilter {
            includes: vec!["title".to_string()],
            excludes: vec![],
        });
        c.sources.push(SourceFilter::default());
        let mut options = Map::new();
        options.insert("number_of_fragments".to_string(), json!(0));
        c.highlights.push(HighlightClause {
            field: "body".to_string(),
            options,
        });
        let compiled = compile(&c).unwrap();

        assert_eq!(compiled.document.body["fields"], json!(["title"]));
        assert_eq!(
            compiled.document.body["_source"],
            json!({ "includes": ["title"] })
        );
        assert_eq!(
            compiled.document.body["highlight"],
            json!({ "fields": { "body": { "number_of_fragments": 0 } } })
        );
    }

    #[test]
    fn test_empty_source_filter_is_omitted() {
        let mut c = clauses();
        c.sources.push(SourceFilter::default());
        let compiled = compile(&c).unwrap();
        assert!(compiled.document.get("_source").is_none());
    }

    #[test]
    fn test_search_options() {
        let mut c = clauses();
        c.size = Some(0);
        c.offset = Some(20);
        c.routing = Some("tenant-7".to_string());
        c.search_type = Some(SearchType::DfsQueryThenFetch);
        c.search_options
            .push(("preference".to_string(), json!("_local")));
        c.search_options.push(("size".to_string(), json!(50)));
        let compiled = compile(&c).unwrap();

        assert!(compiled.options.is_count_only());
        assert_eq!(compiled.options.from, Some(20));
        assert_eq!(compiled.options.routing.as_deref(), Some("tenant-7"));
        assert_eq!(compiled.options.extra["preference"], json!("_local"));
        assert!(!compiled.options.extra.contains_key("size"));
        // Options never leak into the body.
        assert_eq!(compiled.document.body, json!({}));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let mut c = clauses();
        c.wheres.push(WhereClause::term("status", "open"));
        c.orders.push(OrderClause::new("created_at", "desc"));
        c.aggregations.push(NamedClause::new(
            "by_status",
            json!({ "terms": { "field": "status", "size": 5 } }),
        ));

        let first = compile(&c).unwrap();
        let second = compile(&c.clone()).unwrap();
        assert_eq!(
            first.document.to_json_string(),
            second.document.to_json_string()
        );
        assert_eq!(first.fingerprint("articles"), second.fingerprint("articles"));
    }

    #[test]
    fn test_fingerprint_depends_on_index_and_options() {
        let mut c = clauses();
        c.wheres.push(WhereClause::term("status", "open"));
        let full = compile(&c).unwrap();
        c.size = Some(0);
        let count = compile(&c).unwrap();

        assert_ne!(full.fingerprint("articles"), count.fingerprint("articles"));
        assert_ne!(full.fingerprint("articles"), full.fingerprint("comments"));
        assert_eq!(full.fingerprint("articles").len(), 64);
    }

    #[test]
    fn test_fingerprint_covers_every_option() {
        let base = compile(&clauses()).unwrap();

        let mut routed = base.clone();
        routed.options.routing = Some("tenant-7".to_string());
        let mut extra = base.clone();
        extra
            .options
            .extra
            .insert("preference".to_string(), json!("_local"));

        let fingerprints = [
            base.fingerprint("articles"),
            routed.fingerprint("articles"),
            extra.fingerprint("articles"),
        ];
        assert_ne!(fingerprints[0], fingerprints[1]);
        assert_ne!(fingerprints[0], fingerprints[2]);
        assert_ne!(fingerprints[1], fingerprints[2]);
    }
}

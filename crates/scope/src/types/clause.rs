//! Clause types accumulated by a scope.
//!
//! A [`ClauseMap`] is the ordered, append-only record of everything a caller
//! chained onto a scope. It holds no logic beyond bookkeeping: compilation
//! lives in [`crate::compiler`], validation in [`crate::validation`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// The kind of a clause list in a [`ClauseMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    /// Required term or raw expression (`bool.must`).
    Where,
    /// Excluded term or raw expression (`bool.must_not`).
    MustNot,
    /// Optional term or raw expression (`bool.should`).
    Should,
    /// Free-text query string.
    QueryString,
    /// Top-level filter, one node per clause.
    Filter,
    /// Filter layered around the query with `and`.
    QueryFilter,
    /// Facet (alias of [`ClauseKind::Aggregation`]).
    Facet,
    /// Named aggregation.
    Aggregation,
    /// Stored field projection.
    Field,
    /// `_source` inclusion/exclusion.
    Source,
    /// Highlighted field.
    Highlight,
    /// Sort key.
    Order,
}

impl ClauseKind {
    /// All clause kinds, in compilation order.
    pub const ALL: [ClauseKind; 12] = [
        ClauseKind::Where,
        ClauseKind::MustNot,
        ClauseKind::Should,
        ClauseKind::QueryString,
        ClauseKind::Filter,
        ClauseKind::QueryFilter,
        ClauseKind::Facet,
        ClauseKind::Aggregation,
        ClauseKind::Field,
        ClauseKind::Source,
        ClauseKind::Highlight,
        ClauseKind::Order,
    ];

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseKind::Where => "where",
            ClauseKind::MustNot => "must_not",
            ClauseKind::Should => "should",
            ClauseKind::QueryString => "query_string",
            ClauseKind::Filter => "filter",
            ClauseKind::QueryFilter => "query_filter",
            ClauseKind::Facet => "facet",
            ClauseKind::Aggregation => "aggregation",
            ClauseKind::Field => "field",
            ClauseKind::Source => "source",
            ClauseKind::Highlight => "highlight",
            ClauseKind::Order => "order",
        }
    }

    /// Resolves aliases; facets are stored as aggregations.
    pub fn canonical(self) -> ClauseKind {
        match self {
            ClauseKind::Facet => ClauseKind::Aggregation,
            other => other,
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClauseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "where" => Ok(ClauseKind::Where),
            "must_not" | "where_not" => Ok(ClauseKind::MustNot),
            "should" => Ok(ClauseKind::Should),
            "query_string" => Ok(ClauseKind::QueryString),
            "filter" => Ok(ClauseKind::Filter),
            "query_filter" => Ok(ClauseKind::QueryFilter),
            "facet" => Ok(ClauseKind::Facet),
            "aggregation" | "aggs" => Ok(ClauseKind::Aggregation),
            "field" | "fields" => Ok(ClauseKind::Field),
            "source" | "_source" => Ok(ClauseKind::Source),
            "highlight" | "highlights" => Ok(ClauseKind::Highlight),
            "order" | "sort" => Ok(ClauseKind::Order),
            _ => Err(format!("unknown clause kind: {}", s)),
        }
    }
}

/// A single boolean-query clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereClause {
    /// Exact match of a field against a value.
    Term {
        /// Field name.
        field: String,
        /// Scalar (or array, for `terms`) value.
        value: Value,
    },
    /// Raw query-string expression such as `"status:open AND views:>10"`.
    Raw(String),
}

impl WhereClause {
    /// Creates a term clause.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        WhereClause::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the field names this clause constrains.
    ///
    /// Raw expressions contribute every `field:` prefix they contain.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            WhereClause::Term { field, .. } => vec![field.clone()],
            WhereClause::Raw(expr) => expr
                .split_whitespace()
                .filter_map(|token| token.split_once(':'))
                .map(|(field, _)| field.trim_start_matches(['(', '+', '-', '!']).to_string())
                .filter(|field| !field.is_empty())
                .collect(),
        }
    }

    /// Returns the clause as a JSON value (`{field: value}` or the raw string).
    pub fn to_value(&self) -> Value {
        match self {
            WhereClause::Term { field, value } => json!({ field.as_str(): value }),
            WhereClause::Raw(expr) => Value::String(expr.clone()),
        }
    }
}

/// Argument accepted by `where_`, `must_not` and `should`.
///
/// An object expands into one term clause per key, a string becomes a raw
/// expression, an array contributes each of its elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereExpr(pub Vec<WhereClause>);

impl WhereExpr {
    /// Returns `true` if the expression holds no clauses.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_value(&mut self, value: Value) {
        match value {
            Value::Object(map) => {
                for (field, value) in map {
                    self.0.push(WhereClause::Term { field, value });
                }
            }
            Value::String(expr) => {
                if !expr.trim().is_empty() {
                    self.0.push(WhereClause::Raw(expr));
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.push_value(item);
                }
            }
            Value::Null => {}
            other => self.0.push(WhereClause::Raw(other.to_string())),
        }
    }
}

impl From<Value> for WhereExpr {
    fn from(value: Value) -> Self {
        let mut expr = WhereExpr::default();
        expr.push_value(value);
        expr
    }
}

impl From<Map<String, Value>> for WhereExpr {
    fn from(map: Map<String, Value>) -> Self {
        Value::Object(map).into()
    }
}

impl From<&str> for WhereExpr {
    fn from(expr: &str) -> Self {
        Value::String(expr.to_string()).into()
    }
}

impl From<String> for WhereExpr {
    fn from(expr: String) -> Self {
        Value::String(expr).into()
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for WhereExpr {
    fn from((field, value): (K, V)) -> Self {
        WhereExpr(vec![WhereClause::term(field, value)])
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for WhereExpr {
    fn from(pairs: Vec<(K, V)>) -> Self {
        WhereExpr(
            pairs
                .into_iter()
                .map(|(field, value)| WhereClause::term(field, value))
                .collect(),
        )
    }
}

impl From<WhereClause> for WhereExpr {
    fn from(clause: WhereClause) -> Self {
        WhereExpr(vec![clause])
    }
}

/// Arguments of a filter, facet or aggregation clause.
///
/// The shape is resolved once, when the clause is created. Anything that is
/// neither an object nor an array of objects is kept as
/// [`ClauseArgs::Unsupported`] and rejected when the scope is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseArgs {
    /// Object arguments, rendered key by key.
    Keyed(Map<String, Value>),
    /// Array arguments, rendered as a sequence of per-item objects.
    List(Vec<Map<String, Value>>),
    /// Anything else.
    Unsupported(Value),
}

impl ClauseArgs {
    /// Returns the arguments as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            ClauseArgs::Keyed(map) => Value::Object(map.clone()),
            ClauseArgs::List(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
            ClauseArgs::Unsupported(value) => value.clone(),
        }
    }

    /// Returns a short name for the JSON type of unsupported arguments.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClauseArgs::Keyed(_) => "object",
            ClauseArgs::List(_) => "array",
            ClauseArgs::Unsupported(value) => match value {
                Value::Null => "null",
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) => "array of non-objects",
                Value::Object(_) => "object",
            },
        }
    }
}

impl Default for ClauseArgs {
    fn default() -> Self {
        ClauseArgs::Keyed(Map::new())
    }
}

impl From<Value> for ClauseArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ClauseArgs::Keyed(map),
            Value::Array(items) if items.iter().all(Value::is_object) => ClauseArgs::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
            ),
            other => ClauseArgs::Unsupported(other),
        }
    }
}

impl From<Map<String, Value>> for ClauseArgs {
    fn from(map: Map<String, Value>) -> Self {
        ClauseArgs::Keyed(map)
    }
}

impl From<&str> for ClauseArgs {
    fn from(value: &str) -> Self {
        ClauseArgs::Unsupported(Value::String(value.to_string()))
    }
}

impl From<String> for ClauseArgs {
    fn from(value: String) -> Self {
        ClauseArgs::Unsupported(Value::String(value))
    }
}

/// A named filter, facet or aggregation clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedClause {
    /// Clause name (`range`, `exists`, or the aggregation name).
    pub name: String,
    /// Clause arguments.
    pub args: ClauseArgs,
}

impl NamedClause {
    /// Creates a named clause.
    pub fn new(name: impl Into<String>, args: impl Into<ClauseArgs>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }

    /// Returns `{name: args}`.
    pub fn to_value(&self) -> Value {
        json!({ self.name.as_str(): self.args.to_value() })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`, ignoring case.
    pub fn parse(direction: &str) -> Option<Self> {
        if direction.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if direction.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    /// Returns the wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sort key as supplied by the caller.
///
/// The direction is kept verbatim and validated at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderClause {
    /// Field to sort on.
    pub field: String,
    /// Direction token (`asc`/`desc`, any case).
    pub direction: String,
}

impl OrderClause {
    /// Creates an order clause.
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: direction.into(),
        }
    }
}

/// Argument accepted by `order`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSpec(pub Vec<OrderClause>);

impl OrderSpec {
    /// Returns `true` if no sort keys were given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for OrderSpec {
    fn from(field: &str) -> Self {
        if field.trim().is_empty() {
            return OrderSpec::default();
        }
        OrderSpec(vec![OrderClause::new(field, "asc")])
    }
}

impl From<String> for OrderSpec {
    fn from(field: String) -> Self {
        field.as_str().into()
    }
}

impl<F: Into<String>, D: Into<String>> From<(F, D)> for OrderSpec {
    fn from((field, direction): (F, D)) -> Self {
        OrderSpec(vec![OrderClause::new(field, direction)])
    }
}

impl From<Value> for OrderSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => OrderSpec(
                map.into_iter()
                    .map(|(field, direction)| {
                        let direction = match direction {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        OrderClause::new(field, direction)
                    })
                    .collect(),
            ),
            Value::String(field) => field.into(),
            Value::Array(items) => OrderSpec(
                items
                    .into_iter()
                    .flat_map(|item| OrderSpec::from(item).0)
                    .collect(),
            ),
            _ => OrderSpec::default(),
        }
    }
}

/// A highlighted field with its highlighter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightClause {
    /// Field to highlight.
    pub field: String,
    /// Highlighter options for this field.
    pub options: Map<String, Value>,
}

/// `_source` inclusion and exclusion patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFilter {
    /// Patterns to include.
    pub includes: Vec<String>,
    /// Patterns to exclude.
    pub excludes: Vec<String>,
}

impl SourceFilter {
    /// Returns `true` if neither includes nor excludes are set.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

/// Search type passed to the engine with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Score with shard-local term frequencies.
    QueryThenFetch,
    /// Gather global term frequencies before scoring.
    DfsQueryThenFetch,
}

impl SearchType {
    /// Returns the wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::QueryThenFetch => "query_then_fetch",
            SearchType::DfsQueryThenFetch => "dfs_query_then_fetch",
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "query_then_fetch" => Ok(SearchType::QueryThenFetch),
            "dfs_query_then_fetch" => Ok(SearchType::DfsQueryThenFetch),
            _ => Err(format!("unknown search type: {}", s)),
        }
    }
}

/// Ordered accumulation of the clauses chained onto a scope.
///
/// Multi-valued kinds preserve insertion order. Single-valued slots are
/// overwritten by later calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClauseMap {
    /// `where` clauses.
    pub wheres: Vec<WhereClause>,
    /// `must_not` clauses.
    pub must_nots: Vec<WhereClause>,
    /// `should` clauses.
    pub shoulds: Vec<WhereClause>,
    /// Free-text query strings.
    pub query_strings: Vec<String>,
    /// Top-level filters.
    pub filters: Vec<NamedClause>,
    /// Filters layered around the query.
    pub query_filters: Vec<NamedClause>,
    /// Aggregations and facets.
    pub aggregations: Vec<NamedClause>,
    /// Projected fields.
    pub fields: Vec<String>,
    /// `_source` filters.
    pub sources: Vec<SourceFilter>,
    /// Highlighted fields.
    pub highlights: Vec<HighlightClause>,
    /// Sort keys, in precedence order.
    pub orders: Vec<OrderClause>,
    /// Bound values.
    pub binds: Vec<Value>,
    /// Validation rules this scope opts out of.
    pub skip_callbacks: Vec<String>,
    /// Extra search options, merged in order.
    pub search_options: Vec<(String, Value)>,
    /// Number of hits to return.
    pub size: Option<u64>,
    /// Number of hits to skip.
    pub offset: Option<u64>,
    /// Shard routing value.
    pub routing: Option<String>,
    /// Search type.
    pub search_type: Option<SearchType>,
    /// Short-circuit to an empty result.
    pub none: bool,
}

impl ClauseMap {
    /// Creates an empty clause map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any boolean-query clause is present.
    pub fn has_query(&self) -> bool {
        !self.wheres.is_empty()
            || !self.must_nots.is_empty()
            || !self.shoulds.is_empty()
            || !self.query_strings.is_empty()
    }

    /// Returns the names present in the given clause category.
    pub fn clause_names(&self, kind: ClauseKind) -> Vec<String> {
        match kind.canonical() {
            ClauseKind::Where => where_names(&self.wheres),
            ClauseKind::MustNot => where_names(&self.must_nots),
            ClauseKind::Should => where_names(&self.shoulds),
            ClauseKind::QueryString => self.query_strings.clone(),
            ClauseKind::Filter => named(&self.filters),
            ClauseKind::QueryFilter => named(&self.query_filters),
            ClauseKind::Aggregation | ClauseKind::Facet => named(&self.aggregations),
            ClauseKind::Field => self.fields.clone(),
            ClauseKind::Source => self
                .sources
                .iter()
                .flat_map(|s| s.includes.iter().cloned())
                .collect(),
            ClauseKind::Highlight => self.highlights.iter().map(|h| h.field.clone()).collect(),
            ClauseKind::Order => self.orders.iter().map(|o| o.field.clone()).collect(),
        }
    }

    /// Returns the clause values present in the given category, as JSON.
    pub fn clause_values(&self, kind: ClauseKind) -> Vec<Value> {
        match kind.canonical() {
            ClauseKind::Where => self.wheres.iter().map(WhereClause::to_value).collect(),
            ClauseKind::MustNot => self.must_nots.iter().map(WhereClause::to_value).collect(),
            ClauseKind::Should => self.shoulds.iter().map(WhereClause::to_value).collect(),
            ClauseKind::QueryString => self
                .query_strings
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
            ClauseKind::Filter => self.filters.iter().map(NamedClause::to_value).collect(),
            ClauseKind::QueryFilter => self
                .query_filters
                .iter()
                .map(NamedClause::to_value)
                .collect(),
            ClauseKind::Aggregation | ClauseKind::Facet => self
                .aggregations
                .iter()
                .map(NamedClause::to_value)
                .collect(),
            ClauseKind::Field => self.fields.iter().cloned().map(Value::String).collect(),
            ClauseKind::Source => self
                .sources
                .iter()
                .map(|s| json!({ "includes": s.includes, "excludes": s.excludes }))
                .collect(),
            ClauseKind::Highlight => self
                .highlights
                .iter()
                .map(|h| json!({ h.field.as_str(): h.options }))
                .collect(),
            ClauseKind::Order => self
                .orders
                .iter()
                .map(|o| json!({ o.field.as_str(): o.direction }))
                .collect(),
        }
    }

    /// Removes every clause of the given kind.
    pub fn clear(&mut self, kind: ClauseKind) {
        match kind.canonical() {
            ClauseKind::Where => self.wheres.clear(),
            ClauseKind::MustNot => self.must_nots.clear(),
            ClauseKind::Should => self.shoulds.clear(),
            ClauseKind::QueryString => self.query_strings.clear(),
            ClauseKind::Filter => self.filters.clear(),
            ClauseKind::QueryFilter => self.query_filters.clear(),
            ClauseKind::Aggregation | ClauseKind::Facet => self.aggregations.clear(),
            ClauseKind::Field => self.fields.clear(),
            ClauseKind::Source => self.sources.clear(),
            ClauseKind::Highlight => self.highlights.clear(),
            ClauseKind::Order => self.orders.clear(),
        }
    }

    /// Returns `true` if the named validation rule is skipped.
    pub fn skips_callback(&self, name: &str) -> bool {
        self.skip_callbacks.iter().any(|skipped| skipped == name)
    }
}

fn where_names(clauses: &[WhereClause]) -> Vec<String> {
    clauses.iter().flat_map(WhereClause::field_names).collect()
}

fn named(clauses: &[NamedClause]) -> Vec<String> {
    clauses.iter().map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_expr_from_object_expands_per_key() {
        let expr = WhereExpr::from(json!({ "status": "open", "views": 10 }));
        assert_eq!(expr.0.len(), 2);
        assert!(expr.0.contains(&WhereClause::term("status", "open")));
        assert!(expr.0.contains(&WhereClause::term("views", 10)));
    }

    #[test]
    fn test_where_expr_blank_string_is_empty() {
        assert!(WhereExpr::from("   ").is_empty());
        assert!(WhereExpr::from(json!({})).is_empty());
        assert!(WhereExpr::from(Value::Null).is_empty());
    }

    #[test]
    fn test_raw_where_field_names() {
        let clause = WhereClause::Raw("tenant_id:7 AND (status:open OR -draft:true)".to_string());
        assert_eq!(clause.field_names(), vec!["tenant_id", "status", "draft"]);
    }

    #[test]
    fn test_clause_args_shape_resolution() {
        assert!(matches!(
            ClauseArgs::from(json!({ "gte": 1 })),
            ClauseArgs::Keyed(_)
        ));
        assert!(matches!(
            ClauseArgs::from(json!([{ "a": 1 }, { "b": 2 }])),
            ClauseArgs::List(ref items) if items.len() == 2
        ));
        assert!(matches!(
            ClauseArgs::from("bad"),
            ClauseArgs::Unsupported(Value::String(_))
        ));
        assert!(matches!(
            ClauseArgs::from(json!([1, 2])),
            ClauseArgs::Unsupported(_)
        ));
        assert_eq!(ClauseArgs::from(json!(3)).type_name(), "number");
    }

    #[test]
    fn test_order_argument_forms() {
        assert_eq!(
            OrderSpec::from("title").0,
            vec![OrderClause::new("title", "asc")]
        );
        assert_eq!(
            OrderSpec::from(("created_at", "DESC")).0,
            vec![OrderClause::new("created_at", "DESC")]
        );
        assert_eq!(
            OrderSpec::from(json!({ "views": "desc" })).0,
            vec![OrderClause::new("views", "desc")]
        );
        assert!(OrderSpec::from("").is_empty());
    }

    #[test]
    fn test_order_object_keeps_caller_key_order() {
        assert_eq!(
            OrderSpec::from(json!({ "views": "desc", "created_at": "asc" })).0,
            vec![
                OrderClause::new("views", "desc"),
                OrderClause::new("created_at", "asc"),
            ]
        );
    }

    #[test]
    fn test_sort_direction_parse_is_case_insensitive() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("Desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("up"), None);
    }

    #[test]
    fn test_clause_names_and_clear() {
        let mut clauses = ClauseMap::new();
        clauses.wheres.push(WhereClause::term("tenant_id", 7));
        clauses
            .aggregations
            .push(NamedClause::new("by_status", json!({ "terms": { "field": "status" } })));

        assert_eq!(clauses.clause_names(ClauseKind::Where), vec!["tenant_id"]);
        assert_eq!(clauses.clause_names(ClauseKind::Facet), vec!["by_status"]);
        assert_eq!(
            clauses.clause_values(ClauseKind::Where),
            vec![json!({ "tenant_id": 7 })]
        );

        clauses.clear(ClauseKind::Facet);
        assert!(clauses.aggregations.is_empty());
        assert!(clauses.has_query());
    }

    #[test]
    fn test_clause_kind_parse() {
        assert_eq!("sort".parse::<ClauseKind>(), Ok(ClauseKind::Order));
        assert_eq!("WHERE".parse::<ClauseKind>(), Ok(ClauseKind::Where));
        assert!("bogus".parse::<ClauseKind>().is_err());
    }
}

//! Chainable, lazily evaluated query scopes.
//!
//! Every chain method comes in two forms. The plain form (`where_`, `order`,
//! ...) takes `&self` and returns a new scope, leaving the receiver
//! untouched. The `_mut` form appends to the receiver in place and returns it
//! for further chaining. Both refuse to touch a scope that has already been
//! loaded.
//!
//! ```ignore
//! let mut open = articles
//!     .where_(("status", "open"))?
//!     .order(("published_at", "desc"))?
//!     .size(20)?;
//!
//! let records = open.to_a(&ctx).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::context::ExecutionContext;
use crate::error::{ScopeError, ScopeResult};
use crate::model::Model;
use crate::types::{
    ClauseArgs, ClauseKind, ClauseMap, HighlightClause, NamedClause, OrderClause, OrderSpec,
    Record, ResultSet, SearchType, SourceFilter, WhereClause, WhereExpr,
};

/// A query against a [`Model`], built up one clause at a time.
#[derive(Clone)]
pub struct Scope {
    model: Arc<Model>,
    clauses: ClauseMap,
    results: Option<ResultSet>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("model", &self.model.name())
            .field("clauses", &self.clauses)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Scope {
    /// Creates an empty scope over `model`.
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            clauses: ClauseMap::new(),
            results: None,
        }
    }

    /// Returns the model this scope queries.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Returns the accumulated clauses.
    pub fn values(&self) -> &ClauseMap {
        &self.clauses
    }

    /// Returns `true` once the scope has been executed.
    pub fn is_loaded(&self) -> bool {
        self.results.is_some()
    }

    /// Returns the memoized results without executing.
    pub fn loaded_results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    /// Returns an unloaded copy of this scope with the same clauses.
    pub fn spawn(&self) -> Scope {
        Scope {
            model: Arc::clone(&self.model),
            clauses: self.clauses.clone(),
            results: None,
        }
    }

    fn ensure_mutable(&self) -> ScopeResult<()> {
        if self.is_loaded() {
            return Err(ScopeError::ImmutableScope {
                model: self.model.name().to_string(),
            });
        }
        Ok(())
    }

    fn derive<F>(&self, apply: F) -> ScopeResult<Scope>
    where
        F: FnOnce(&mut Scope) -> ScopeResult<&mut Scope>,
    {
        self.ensure_mutable()?;
        let mut child = self.spawn();
        apply(&mut child)?;
        Ok(child)
    }

    // ========================================================================
    // Query clauses
    // ========================================================================

    /// Adds `must` clauses.
    pub fn where_(&self, expr: impl Into<WhereExpr>) -> ScopeResult<Scope> {
        self.derive(|s| s.where_mut(expr))
    }

    /// In-place form of [`Scope::where_`].
    pub fn where_mut(&mut self, expr: impl Into<WhereExpr>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let expr = expr.into();
        if expr.is_empty() {
            return Err(ScopeError::argument("where"));
        }
        self.clauses.wheres.extend(expr.0);
        Ok(self)
    }

    /// Adds `must_not` clauses.
    pub fn must_not(&self, expr: impl Into<WhereExpr>) -> ScopeResult<Scope> {
        self.derive(|s| s.must_not_mut(expr))
    }

    /// In-place form of [`Scope::must_not`].
    pub fn must_not_mut(&mut self, expr: impl Into<WhereExpr>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let expr = expr.into();
        if expr.is_empty() {
            return Err(ScopeError::argument("must_not"));
        }
        self.clauses.must_nots.extend(expr.0);
        Ok(self)
    }

    /// Adds `should` clauses.
    pub fn should(&self, expr: impl Into<WhereExpr>) -> ScopeResult<Scope> {
        self.derive(|s| s.should_mut(expr))
    }

    /// In-place form of [`Scope::should`].
    pub fn should_mut(&mut self, expr: impl Into<WhereExpr>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let expr = expr.into();
        if expr.is_empty() {
            return Err(ScopeError::argument("should"));
        }
        self.clauses.shoulds.extend(expr.0);
        Ok(self)
    }

    /// Adds a free-text query string. Multiple strings are joined with `AND`.
    pub fn query_string(&self, query: impl Into<String>) -> ScopeResult<Scope> {
        self.derive(|s| s.query_string_mut(query))
    }

    /// In-place form of [`Scope::query_string`].
    pub fn query_string_mut(&mut self, query: impl Into<String>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ScopeError::argument("query_string"));
        }
        self.clauses.query_strings.push(query);
        Ok(self)
    }

    // ========================================================================
    // Sorting and paging
    // ========================================================================

    /// Appends sort keys. Earlier keys take precedence.
    pub fn order(&self, ordering: impl Into<OrderSpec>) -> ScopeResult<Scope> {
        self.derive(|s| s.order_mut(ordering))
    }

    /// In-place form of [`Scope::order`].
    pub fn order_mut(&mut self, ordering: impl Into<OrderSpec>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let ordering = ordering.into();
        if ordering.is_empty() {
            return Err(ScopeError::argument("order"));
        }
        self.clauses.orders.extend(ordering.0);
        Ok(self)
    }

    /// Alias for [`Scope::order`].
    pub fn sort(&self, ordering: impl Into<OrderSpec>) -> ScopeResult<Scope> {
        self.order(ordering)
    }

    /// Alias for [`Scope::order_mut`].
    pub fn sort_mut(&mut self, ordering: impl Into<OrderSpec>) -> ScopeResult<&mut Self> {
        self.order_mut(ordering)
    }

    /// Sets the number of hits; `0` asks for the total only.
    pub fn size(&self, size: u64) -> ScopeResult<Scope> {
        self.derive(|s| s.size_mut(size))
    }

    /// In-place form of [`Scope::size`].
    pub fn size_mut(&mut self, size: u64) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        self.clauses.size = Some(size);
        Ok(self)
    }

    /// Alias for [`Scope::size`].
    pub fn limit(&self, size: u64) -> ScopeResult<Scope> {
        self.size(size)
    }

    /// Alias for [`Scope::size_mut`].
    pub fn limit_mut(&mut self, size: u64) -> ScopeResult<&mut Self> {
        self.size_mut(size)
    }

    /// Sets the number of hits to skip.
    pub fn offset(&self, offset: u64) -> ScopeResult<Scope> {
        self.derive(|s| s.offset_mut(offset))
    }

    /// In-place form of [`Scope::offset`].
    pub fn offset_mut(&mut self, offset: u64) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        self.clauses.offset = Some(offset);
        Ok(self)
    }

    // ========================================================================
    // Filters and aggregations
    // ========================================================================

    /// Adds a top-level filter.
    pub fn filter(
        &self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.derive(|s| s.filter_mut(name, args))
    }

    /// In-place form of [`Scope::filter`].
    pub fn filter_mut(
        &mut self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let clause = named_clause("filter", name, args)?;
        self.clauses.filters.push(clause);
        Ok(self)
    }

    /// Adds a filter applied around the query with `and`.
    pub fn query_filter(
        &self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.derive(|s| s.query_filter_mut(name, args))
    }

    /// In-place form of [`Scope::query_filter`].
    pub fn query_filter_mut(
        &mut self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let clause = named_clause("query_filter", name, args)?;
        self.clauses.query_filters.push(clause);
        Ok(self)
    }

    /// Requires `field` to exist in matching documents.
    pub fn has_field(&self, field: impl Into<String>) -> ScopeResult<Scope> {
        self.derive(|s| s.has_field_mut(field))
    }

    /// In-place form of [`Scope::has_field`].
    pub fn has_field_mut(&mut self, field: impl Into<String>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let field = field.into();
        if field.trim().is_empty() {
            return Err(ScopeError::argument("has_field"));
        }
        let mut args = Map::new();
        args.insert("field".to_string(), Value::String(field));
        self.clauses
            .filters
            .push(NamedClause::new("exists", ClauseArgs::Keyed(args)));
        Ok(self)
    }

    /// Adds a named aggregation.
    pub fn aggregation(
        &self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.derive(|s| s.aggregation_mut(name, args))
    }

    /// In-place form of [`Scope::aggregation`].
    pub fn aggregation_mut(
        &mut self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let clause = named_clause("aggregation", name, args)?;
        self.clauses.aggregations.push(clause);
        Ok(self)
    }

    /// Alias for [`Scope::aggregation`].
    pub fn facet(
        &self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.aggregation(name, args)
    }

    /// Alias for [`Scope::aggregation_mut`].
    pub fn facet_mut(
        &mut self,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<&mut Self> {
        self.aggregation_mut(name, args)
    }

    // ========================================================================
    // Projection and highlighting
    // ========================================================================

    /// Restricts the returned stored fields.
    pub fn field<I, S>(&self, names: I) -> ScopeResult<Scope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derive(|s| s.field_mut(names))
    }

    /// In-place form of [`Scope::field`].
    pub fn field_mut<I, S>(&mut self, names: I) -> ScopeResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_mutable()?;
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ScopeError::argument("field"));
        }
        self.clauses.fields.extend(names);
        Ok(self)
    }

    /// Alias for [`Scope::field`].
    pub fn fields<I, S>(&self, names: I) -> ScopeResult<Scope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field(names)
    }

    /// Alias for [`Scope::field_mut`].
    pub fn fields_mut<I, S>(&mut self, names: I) -> ScopeResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_mut(names)
    }

    /// Adds `_source` includes and excludes.
    pub fn source(&self, includes: &[&str], excludes: &[&str]) -> ScopeResult<Scope> {
        self.derive(|s| s.source_mut(includes, excludes))
    }

    /// In-place form of [`Scope::source`].
    pub fn source_mut(&mut self, includes: &[&str], excludes: &[&str]) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let filter = SourceFilter {
            includes: includes.iter().map(|s| s.to_string()).collect(),
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
        };
        if filter.is_empty() {
            return Err(ScopeError::argument("source"));
        }
        self.clauses.sources.push(filter);
        Ok(self)
    }

    /// Highlights `field` with the given highlighter options.
    pub fn highlight(
        &self,
        field: impl Into<String>,
        options: Map<String, Value>,
    ) -> ScopeResult<Scope> {
        self.derive(|s| s.highlight_mut(field, options))
    }

    /// In-place form of [`Scope::highlight`].
    pub fn highlight_mut(
        &mut self,
        field: impl Into<String>,
        options: Map<String, Value>,
    ) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let field = field.into();
        if field.trim().is_empty() {
            return Err(ScopeError::argument("highlight"));
        }
        self.clauses
            .highlights
            .push(HighlightClause { field, options });
        Ok(self)
    }

    // ========================================================================
    // Search options
    // ========================================================================

    /// Routes the request to the shards owning `routing`.
    pub fn routing(&self, routing: impl Into<String>) -> ScopeResult<Scope> {
        self.derive(|s| s.routing_mut(routing))
    }

    /// In-place form of [`Scope::routing`].
    pub fn routing_mut(&mut self, routing: impl Into<String>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let routing = routing.into();
        if routing.is_empty() {
            return Err(ScopeError::argument("routing"));
        }
        self.clauses.routing = Some(routing);
        Ok(self)
    }

    /// Sets the search type.
    pub fn search_type(&self, search_type: SearchType) -> ScopeResult<Scope> {
        self.derive(|s| s.search_type_mut(search_type))
    }

    /// In-place form of [`Scope::search_type`].
    pub fn search_type_mut(&mut self, search_type: SearchType) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        self.clauses.search_type = Some(search_type);
        Ok(self)
    }

    /// Passes an extra option to the executor. Later values win.
    pub fn search_option(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> ScopeResult<Scope> {
        self.derive(|s| s.search_option_mut(key, value))
    }

    /// In-place form of [`Scope::search_option`].
    pub fn search_option_mut(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let key = key.into();
        if key.is_empty() {
            return Err(ScopeError::argument("search_option"));
        }
        self.clauses.search_options.push((key, value.into()));
        Ok(self)
    }

    // ========================================================================
    // Scope control
    // ========================================================================

    /// Records a bind value.
    pub fn bind(&self, value: impl Into<Value>) -> ScopeResult<Scope> {
        self.derive(|s| s.bind_mut(value))
    }

    /// In-place form of [`Scope::bind`].
    pub fn bind_mut(&mut self, value: impl Into<Value>) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let value = value.into();
        if value.is_null() {
            return Err(ScopeError::argument("bind"));
        }
        self.clauses.binds.push(value);
        Ok(self)
    }

    /// Makes the scope yield an empty result without contacting the engine.
    pub fn none(&self) -> ScopeResult<Scope> {
        self.derive(|s| s.none_mut())
    }

    /// In-place form of [`Scope::none`].
    pub fn none_mut(&mut self) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        self.clauses.none = true;
        Ok(self)
    }

    /// Removes every clause of the given kinds.
    pub fn unscope(&self, kinds: &[ClauseKind]) -> ScopeResult<Scope> {
        self.derive(|s| s.unscope_mut(kinds))
    }

    /// In-place form of [`Scope::unscope`].
    pub fn unscope_mut(&mut self, kinds: &[ClauseKind]) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        if kinds.is_empty() {
            return Err(ScopeError::argument("unscope"));
        }
        for kind in kinds {
            self.clauses.clear(*kind);
        }
        Ok(self)
    }

    /// Skips the named validation rules for this scope.
    pub fn skip_callbacks<I, S>(&self, names: I) -> ScopeResult<Scope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derive(|s| s.skip_callbacks_mut(names))
    }

    /// In-place form of [`Scope::skip_callbacks`].
    pub fn skip_callbacks_mut<I, S>(&mut self, names: I) -> ScopeResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_mutable()?;
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ScopeError::argument("skip_callbacks"));
        }
        self.clauses.skip_callbacks.extend(names);
        Ok(self)
    }

    // ========================================================================
    // Finders
    // ========================================================================

    /// Returns the oldest record by the model's default sort key.
    ///
    /// On a loaded scope this is the first loaded record and nothing is
    /// executed.
    pub async fn first(&self, ctx: &ExecutionContext) -> ScopeResult<Option<Record>> {
        if let Some(results) = &self.results {
            return Ok(results.first().cloned());
        }
        let mut child = self.spawn();
        child.first_mut()?;
        Ok(child.load(ctx).await?.first().cloned())
    }

    /// Sorts ascending by the default sort key and limits to one hit.
    pub fn first_mut(&mut self) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let key = self.model.default_sort_key().to_string();
        self.clauses.orders.push(OrderClause::new(key, "asc"));
        self.clauses.size = Some(1);
        Ok(self)
    }

    /// Returns the newest record by the model's default sort key.
    pub async fn last(&self, ctx: &ExecutionContext) -> ScopeResult<Option<Record>> {
        if let Some(results) = &self.results {
            return Ok(results.last().cloned());
        }
        let mut child = self.spawn();
        child.last_mut()?;
        Ok(child.load(ctx).await?.first().cloned())
    }

    /// Sorts descending by the default sort key and limits to one hit.
    pub fn last_mut(&mut self) -> ScopeResult<&mut Self> {
        self.ensure_mutable()?;
        let key = self.model.default_sort_key().to_string();
        self.clauses.orders.push(OrderClause::new(key, "desc"));
        self.clauses.size = Some(1);
        Ok(self)
    }

    /// Returns the number of matching documents without fetching any.
    pub async fn count(&self, ctx: &ExecutionContext) -> ScopeResult<u64> {
        if let Some(results) = &self.results {
            return Ok(results.total);
        }
        let mut child = self.spawn();
        child.count_mut()?;
        Ok(child.load(ctx).await?.total)
    }

    /// Turns this scope into a count request (`size = 0`).
    pub fn count_mut(&mut self) -> ScopeResult<&mut Self> {
        self.size_mut(0)
    }

    /// Returns `true` if any document matches.
    pub async fn exists(&self, ctx: &ExecutionContext) -> ScopeResult<bool> {
        Ok(self.count(ctx).await? > 0)
    }

    /// Alias for [`Scope::exists`].
    pub async fn any(&self, ctx: &ExecutionContext) -> ScopeResult<bool> {
        self.exists(ctx).await
    }

    /// Returns `true` if more than one document matches.
    pub async fn many(&self, ctx: &ExecutionContext) -> ScopeResult<bool> {
        Ok(self.count(ctx).await? > 1)
    }

    /// Returns `true` if no document matches.
    pub async fn is_empty(&self, ctx: &ExecutionContext) -> ScopeResult<bool> {
        Ok(self.count(ctx).await? == 0)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Executes the scope once and memoizes the result.
    ///
    /// Later calls return the memoized result without executing again.
    ///
    /// # Errors
    ///
    /// * `ScopeError::ValidationFailed` - a required clause is missing; the engine is not contacted
    /// * `ScopeError::InvalidSortDirection` / `ScopeError::UnsupportedArgumentType` - compilation failed
    /// * `ScopeError::Executor` - the executor reported a failure
    pub async fn load(&mut self, ctx: &ExecutionContext) -> ScopeResult<&ResultSet> {
        let results = match self.results.take() {
            Some(results) => results,
            None => self.exec_queries(ctx).await?,
        };
        Ok(self.results.insert(results))
    }

    /// Alias for [`Scope::load`].
    pub async fn results(&mut self, ctx: &ExecutionContext) -> ScopeResult<&ResultSet> {
        self.load(ctx).await
    }

    /// Loads the scope and returns its records.
    pub async fn to_a(&mut self, ctx: &ExecutionContext) -> ScopeResult<&[Record]> {
        Ok(&self.load(ctx).await?.records)
    }

    /// Loads the scope and renders the record bodies as a JSON array.
    pub async fn to_json(&mut self, ctx: &ExecutionContext) -> ScopeResult<Value> {
        let results = self.load(ctx).await?;
        Ok(Value::Array(
            results.iter().map(|r| r.source.clone()).collect(),
        ))
    }

    /// Compiles the scope without executing it.
    pub fn to_elastic(&self) -> ScopeResult<CompiledQuery> {
        QueryCompiler::new(&self.clauses).compile()
    }

    /// Loads the scope and renders a bounded preview of its results.
    pub async fn inspect(&mut self, ctx: &ExecutionContext) -> ScopeResult<String> {
        self.load(ctx).await?;
        Ok(self.to_string())
    }

    async fn exec_queries(&self, ctx: &ExecutionContext) -> ScopeResult<ResultSet> {
        if self.clauses.none {
            tracing::debug!(model = %self.model.name(), "none() scope short-circuited");
            return Ok(ResultSet::empty());
        }

        self.model.registry().validate(&self.clauses)?;
        let query = QueryCompiler::new(&self.clauses).compile()?;
        self.model.fetch(ctx, &query).await
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Default attributes implied by this scope: its term `where` clauses.
    pub fn scope_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        for clause in &self.clauses.wheres {
            if let WhereClause::Term { field, value } = clause {
                attributes.insert(field.clone(), value.clone());
            }
        }
        attributes
    }

    /// Creates a document from the scope's default attributes overlaid with
    /// `attributes`.
    pub async fn create(&self, attributes: Map<String, Value>) -> ScopeResult<Record> {
        let mut merged = self.scope_attributes();
        merged.extend(attributes);
        self.model.persist(merged).await
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.results {
            Some(results) => write!(f, "#<Scope {} {}>", self.model.name(), results.preview()),
            None => match self.to_elastic() {
                Ok(query) => write!(
                    f,
                    "#<Scope {} (not loaded) {}>",
                    self.model.name(),
                    query.document.to_json_string()
                ),
                Err(e) => write!(f, "#<Scope {} (invalid: {})>", self.model.name(), e),
            },
        }
    }
}

fn named_clause(
    method: &str,
    name: impl Into<String>,
    args: impl Into<ClauseArgs>,
) -> ScopeResult<NamedClause> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(ScopeError::argument(method));
    }
    Ok(NamedClause::new(name, args))
}

//! Model descriptors.
//!
//! A [`Model`] is what a scope queries: an index name plus the collaborators
//! used to execute, hydrate, cache and validate queries against it. Models are
//! built once, shared behind an `Arc`, and never mutated afterwards.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::{CacheRequest, ResultCache};
use crate::compiler::CompiledQuery;
use crate::config::ScopeConfig;
use crate::context::ExecutionContext;
use crate::error::{ScopeError, ScopeResult};
use crate::executor::{Executor, Hydrator, Persister, SearchResponse, SourceHydrator};
use crate::instrumentation::{Instrumentation, TracingInstrumentation};
use crate::scope::Scope;
use crate::types::{ClauseArgs, OrderSpec, Record, ResultSet, WhereExpr};
use crate::validation::{RuleOptions, ValidationRegistry, ValidationRule};

/// Field used by `first`/`last` unless configured otherwise.
pub const DEFAULT_SORT_KEY: &str = "created_at";

/// A queryable document type.
pub struct Model {
    name: String,
    index: String,
    default_sort_key: String,
    registry: ValidationRegistry,
    executor: Arc<dyn Executor>,
    hydrator: Arc<dyn Hydrator>,
    persister: Option<Arc<dyn Persister>>,
    cache: ResultCache,
    instrumentation: Arc<dyn Instrumentation>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("default_sort_key", &self.default_sort_key)
            .field("rules", &self.registry.len())
            .field("executor", &self.executor.name())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Starts building a model that executes queries with `executor`.
    pub fn builder(name: impl Into<String>, executor: Arc<dyn Executor>) -> ModelBuilder {
        ModelBuilder::new(name, executor)
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the index queried by this model.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns the field used by `first`/`last`.
    pub fn default_sort_key(&self) -> &str {
        &self.default_sort_key
    }

    /// Returns the validation rules.
    pub fn registry(&self) -> &ValidationRegistry {
        &self.registry
    }

    /// Returns the result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Returns an empty scope over this model.
    pub fn all(self: &Arc<Self>) -> Scope {
        Scope::new(Arc::clone(self))
    }

    /// Shorthand for `all().where_(expr)`.
    pub fn where_(self: &Arc<Self>, expr: impl Into<WhereExpr>) -> ScopeResult<Scope> {
        self.all().where_(expr)
    }

    /// Shorthand for `all().order(ordering)`.
    pub fn order(self: &Arc<Self>, ordering: impl Into<OrderSpec>) -> ScopeResult<Scope> {
        self.all().order(ordering)
    }

    /// Shorthand for `all().filter(name, args)`.
    pub fn filter(
        self: &Arc<Self>,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.all().filter(name, args)
    }

    /// Shorthand for `all().aggregation(name, args)`.
    pub fn aggregation(
        self: &Arc<Self>,
        name: impl Into<String>,
        args: impl Into<ClauseArgs>,
    ) -> ScopeResult<Scope> {
        self.all().aggregation(name, args)
    }

    /// Shorthand for `all().size(size)`.
    pub fn size(self: &Arc<Self>, size: u64) -> ScopeResult<Scope> {
        self.all().size(size)
    }

    /// Shorthand for `all().routing(routing)`.
    pub fn routing(self: &Arc<Self>, routing: impl Into<String>) -> ScopeResult<Scope> {
        self.all().routing(routing)
    }

    /// Shorthand for `all().none()`.
    pub fn none(self: &Arc<Self>) -> ScopeResult<Scope> {
        self.all().none()
    }

    /// Shorthand for `all().first(ctx)`.
    pub async fn first(self: &Arc<Self>, ctx: &ExecutionContext) -> ScopeResult<Option<Record>> {
        self.all().first(ctx).await
    }

    /// Shorthand for `all().last(ctx)`.
    pub async fn last(self: &Arc<Self>, ctx: &ExecutionContext) -> ScopeResult<Option<Record>> {
        self.all().last(ctx).await
    }

    /// Shorthand for `all().count(ctx)`.
    pub async fn count(self: &Arc<Self>, ctx: &ExecutionContext) -> ScopeResult<u64> {
        self.all().count(ctx).await
    }

    /// Shorthand for `all().exists(ctx)`.
    pub async fn exists(self: &Arc<Self>, ctx: &ExecutionContext) -> ScopeResult<bool> {
        self.all().exists(ctx).await
    }

    /// Creates a document from `attributes`.
    pub async fn create(
        self: &Arc<Self>,
        attributes: Map<String, Value>,
    ) -> ScopeResult<Record> {
        self.all().create(attributes).await
    }

    /// Executes a compiled query, going through the result cache.
    pub(crate) async fn fetch(
        &self,
        ctx: &ExecutionContext,
        query: &CompiledQuery,
    ) -> ScopeResult<ResultSet> {
        let fingerprint = query.fingerprint(&self.index);
        let request = CacheRequest {
            model: &self.name,
            fingerprint: &fingerprint,
            query,
        };

        self.cache
            .fetch(ctx, request, self.instrumentation.as_ref(), || async {
                let response = self.executor.search(&self.index, query).await?;
                self.hydrate(response, query.options.is_count_only())
            })
            .await
    }

    fn hydrate(&self, response: SearchResponse, count_only: bool) -> ScopeResult<ResultSet> {
        let records = if count_only {
            Vec::new()
        } else {
            response
                .hits
                .iter()
                .map(|hit| self.hydrator.from_hit(hit))
                .collect::<ScopeResult<Vec<_>>>()?
        };
        Ok(ResultSet::new(records, response.total, response.aggregations))
    }

    /// Stores a new document through the persister.
    pub(crate) async fn persist(&self, attributes: Map<String, Value>) -> ScopeResult<Record> {
        let persister = self
            .persister
            .as_ref()
            .ok_or_else(|| ScopeError::PersistenceUnavailable {
                model: self.name.clone(),
            })?;
        Ok(persister.create(&self.index, attributes).await?)
    }
}

/// Builder for [`Model`].
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    index: Option<String>,
    default_sort_key: String,
    registry: ValidationRegistry,
    rules: Vec<ValidationRule>,
    executor: Arc<dyn Executor>,
    hydrator: Arc<dyn Hydrator>,
    persister: Option<Arc<dyn Persister>>,
    cache: ResultCache,
    instrumentation: Arc<dyn Instrumentation>,
}

impl ModelBuilder {
    /// Creates a builder with default collaborators.
    pub fn new(name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            index: None,
            default_sort_key: DEFAULT_SORT_KEY.to_string(),
            registry: ValidationRegistry::empty(),
            rules: Vec::new(),
            executor,
            hydrator: Arc::new(SourceHydrator),
            persister: None,
            cache: ResultCache::default(),
            instrumentation: Arc::new(TracingInstrumentation),
        }
    }

    /// Sets the index (default: the lowercased model name).
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Sets the field used by `first`/`last`.
    pub fn default_sort_key(mut self, key: impl Into<String>) -> Self {
        self.default_sort_key = key.into();
        self
    }

    /// Requires clause `name` on every query of this model.
    pub fn require_clause(mut self, name: impl Into<String>, options: RuleOptions) -> Self {
        self.rules.push(ValidationRule::new(name, options));
        self
    }

    /// Uses a prebuilt registry. Rules added with `require_clause` are
    /// appended to it.
    pub fn validation(mut self, registry: ValidationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the hydrator.
    pub fn hydrator(mut self, hydrator: Arc<dyn Hydrator>) -> Self {
        self.hydrator = hydrator;
        self
    }

    /// Sets the persister used by `create`.
    pub fn persister(mut self, persister: Arc<dyn Persister>) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Sets the result cache.
    pub fn cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the instrumentation sink.
    pub fn instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    /// Applies the sort key and cache settings of `config`.
    pub fn config(mut self, config: &ScopeConfig) -> Self {
        self.default_sort_key = config.default_sort_key.clone();
        self.cache = config.build_cache();
        self
    }

    /// Finishes the model.
    pub fn build(self) -> Arc<Model> {
        let index = self
            .index
            .unwrap_or_else(|| self.name.to_lowercase());

        let registry = if self.rules.is_empty() {
            self.registry
        } else {
            let mut builder = ValidationRegistry::builder();
            for rule in self.registry.rules().iter().cloned().chain(self.rules) {
                builder = builder.rule(rule);
            }
            builder.build()
        };

        tracing::debug!(
            model = %self.name,
            index = %index,
            rules = registry.len(),
            "Model defined"
        );

        Arc::new(Model {
            name: self.name,
            index,
            default_sort_key: self.default_sort_key,
            registry,
            executor: self.executor,
            hydrator: self.hydrator,
            persister: self.persister,
            cache: self.cache,
            instrumentation: self.instrumentation,
        })
    }
}

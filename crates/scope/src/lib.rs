//! Helios Query Scopes
//!
//! This crate provides chainable, lazily evaluated query scopes for
//! Elasticsearch. A scope accumulates clauses (`where_`, `order`, `filter`,
//! `aggregation`, ...) without touching the engine, compiles them into a
//! deterministic request body on first read, checks the model's required
//! clauses, and executes at most once.
//!
//! # Features
//!
//! - **Copy-on-write chaining**: every chain call returns a new scope
//! - **Deterministic compilation**: identical clauses yield byte-identical bodies
//! - **Required clauses**: per-model rules reject scopes before execution
//! - **Result cache**: content-addressed, opt-in per execution context
//!
//! Enable the bundled executor with the `elasticsearch` feature:
//!
//! ```toml
//! [dependencies]
//! helios-scope = { version = "0.1", features = ["elasticsearch"] }
//! ```
//!
//! # Architecture
//!
//! - [`types`] - Clause maps, records and result sets
//! - [`compiler`] - Clause map to request body compilation
//! - [`scope`] - The chainable query handle
//! - [`model`] - Model descriptors scopes are built from
//! - [`validation`] - Required-clause rules
//! - [`cache`] - Result cache and cache stores
//! - [`context`] - Per-request execution settings
//! - [`executor`] - Search engine collaborators
//! - [`instrumentation`] - Query events
//! - [`config`] - Environment configuration and logging setup
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use helios_scope::{ExecutionContext, Model, RuleOptions, ClauseKind};
//! use helios_scope::executor::elasticsearch::{ElasticsearchConfig, ElasticsearchExecutor};
//!
//! let executor = Arc::new(ElasticsearchExecutor::new(ElasticsearchConfig::default())?);
//! let articles = Model::builder("Article", executor)
//!     .require_clause("tenant_id", RuleOptions::in_category(ClauseKind::Where))
//!     .build();
//!
//! let ctx = ExecutionContext::new();
//! let mut open = articles
//!     .where_(("tenant_id", 7))?
//!     .where_(("status", "open"))?
//!     .order(("published_at", "desc"))?;
//!
//! for record in open.to_a(&ctx).await? {
//!     println!("{record}");
//! }
//!
//! // Identical queries inside a cache block hit the engine once.
//! let total = ctx
//!     .cache(|ctx| async move { articles.where_(("tenant_id", 7))?.count(&ctx).await })
//!     .await?;
//! ```
//!
//! # Compilation
//!
//! ```
//! use helios_scope::compiler::compile;
//! use helios_scope::types::{ClauseMap, OrderClause, WhereClause};
//! use serde_json::json;
//!
//! let mut clauses = ClauseMap::new();
//! clauses.wheres.push(WhereClause::term("status", "open"));
//! clauses.orders.push(OrderClause::new("created_at", "DESC"));
//!
//! let query = compile(&clauses).unwrap();
//! assert_eq!(
//!     query.document.body,
//!     json!({
//!         "query": { "bool": { "must": { "term": { "status": "open" } } } },
//!         "sort": [{ "created_at": "desc" }]
//!     })
//! );
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod instrumentation;
pub mod model;
pub mod scope;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use cache::{CacheStore, MemoryCacheStore, ResultCache};
pub use compiler::{CompiledQuery, QueryCompiler, QueryDocument, SearchOptions};
pub use config::ScopeConfig;
pub use context::{CacheMode, ExecutionContext};
pub use error::{ExecutorError, ScopeError, ScopeResult};
pub use executor::{Executor, Hydrator, Persister};
pub use model::Model;
pub use scope::Scope;
pub use types::{ClauseKind, ClauseMap, Record, ResultSet};
pub use validation::{RuleOptions, ValidationRegistry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

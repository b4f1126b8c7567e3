//! Core types for clauses and results.
//!
//! - [`clause`] - The clause map a scope accumulates
//! - [`result`] - Records and result sets returned by execution

pub mod clause;
pub mod result;

pub use clause::{
    ClauseArgs, ClauseKind, ClauseMap, HighlightClause, NamedClause, OrderClause, OrderSpec,
    SearchType, SortDirection, SourceFilter, WhereClause, WhereExpr,
};
pub use result::{PREVIEW_LIMIT, Record, ResultSet};

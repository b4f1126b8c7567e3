//! Error types for query scopes.
//!
//! Errors raised by the scope layer itself ([`ScopeError`] variants other than
//! [`ScopeError::Executor`]) are local and deterministic: they signal misuse of
//! the chaining API or a misconfigured validation rule and are never worth
//! retrying. Only [`ExecutorError`] originates outside the process.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all scope operations.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A chain method was called without the arguments it requires.
    #[error("The method .{method}() must contain arguments.")]
    Argument { method: String },

    /// A clause was added to a scope that has already been loaded.
    #[error("cannot modify a loaded scope on {model}")]
    ImmutableScope { model: String },

    /// An `order` clause carried a direction other than `asc`/`desc`.
    #[error("direction \"{direction}\" is invalid for {field}; valid directions are: asc, desc")]
    InvalidSortDirection { field: String, direction: String },

    /// A filter, facet or aggregation argument was neither an object nor an array.
    #[error("#{clause} only accepts Hash or Array (got {found} for {name})")]
    UnsupportedArgumentType {
        clause: String,
        name: String,
        found: String,
    },

    /// A required-clause rule rejected the scope before execution.
    #[error("{rule} {message}")]
    ValidationFailed {
        rule: String,
        category: String,
        message: String,
    },

    /// `create` was called on a model without a persister.
    #[error("model {model} has no persister configured")]
    PersistenceUnavailable { model: String },

    /// A raw hit could not be turned into a record.
    #[error("failed to hydrate hit: {message}")]
    Hydration { message: String },

    /// Transport or engine failure reported by the executor.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl ScopeError {
    /// Creates an [`ScopeError::Argument`] for the given chain method.
    pub fn argument(method: impl Into<String>) -> Self {
        ScopeError::Argument {
            method: method.into(),
        }
    }

    /// Returns `true` if retrying the operation could succeed.
    ///
    /// Everything raised by the scope layer is a usage error; only transport
    /// failures reported by the executor are considered transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScopeError::Executor(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Errors reported by an [`Executor`](crate::executor::Executor) or
/// [`Persister`](crate::executor::Persister).
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The engine could not be reached.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// The request could not be sent or timed out.
    #[error("request to {backend_name} failed: {message}")]
    Request {
        backend_name: String,
        message: String,
    },

    /// The engine answered with an error status.
    #[error("{backend_name} returned status {status}: {message}")]
    Engine {
        backend_name: String,
        status: u16,
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("invalid response from {backend_name}: {message}")]
    Response {
        backend_name: String,
        message: String,
    },

    /// Internal collaborator error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExecutorError {
    /// Returns `true` for failures that may disappear on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ExecutorError::ConnectionFailed { .. } | ExecutorError::Request { .. } => true,
            ExecutorError::Engine { status, .. } => *status == 429 || *status >= 500,
            ExecutorError::Response { .. } | ExecutorError::Internal { .. } => false,
        }
    }
}

/// Result type for scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_message() {
        let err = ScopeError::argument("order");
        assert_eq!(err.to_string(), "The method .order() must contain arguments.");
    }

    #[test]
    fn test_validation_message() {
        let err = ScopeError::ValidationFailed {
            rule: "tenant_id".to_string(),
            category: "where".to_string(),
            message: "does not exist in where.".to_string(),
        };
        assert_eq!(err.to_string(), "tenant_id does not exist in where.");
    }

    #[test]
    fn test_core_errors_are_not_retryable() {
        assert!(!ScopeError::argument("where").is_retryable());
        assert!(
            !ScopeError::ImmutableScope {
                model: "Article".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ScopeError::InvalidSortDirection {
                field: "title".to_string(),
                direction: "up".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_executor_error_transience() {
        let conn: ScopeError = ExecutorError::ConnectionFailed {
            backend_name: "elasticsearch".to_string(),
            message: "refused".to_string(),
        }
        .into();
        assert!(conn.is_retryable());

        let bad_request = ExecutorError::Engine {
            backend_name: "elasticsearch".to_string(),
            status: 400,
            message: "parsing_exception".to_string(),
        };
        assert!(!bad_request.is_transient());

        let overloaded = ExecutorError::Engine {
            backend_name: "elasticsearch".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(overloaded.is_transient());
    }
}

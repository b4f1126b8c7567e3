//! Runtime configuration for query scopes.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SCOPE_CACHE_STORE` | memory | Result cache store kind |
//! | `SCOPE_CACHE_NAMESPACE` | elasticsearch | Prefix for cache keys |
//! | `SCOPE_CACHE_TTL` | 5m | Cache entry lifetime (humantime syntax) |
//! | `SCOPE_DEFAULT_SORT_KEY` | created_at | Field used by `first`/`last` |
//! | `SCOPE_LOG_LEVEL` | info | Log level |
//!
//! # Example
//!
//! ```rust
//! use helios_scope::config::ScopeConfig;
//!
//! let config = ScopeConfig {
//!     cache_ttl: "30s".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.cache_ttl().as_secs(), 30);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_TTL, ResultCache};
use crate::model::DEFAULT_SORT_KEY;

/// Supported result cache stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStoreKind {
    /// In-process store.
    #[default]
    Memory,
}

impl fmt::Display for CacheStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStoreKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for CacheStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "memory_store" => Ok(CacheStoreKind::Memory),
            _ => Err(format!("unknown cache store: {}", s)),
        }
    }
}

/// Scope configuration.
///
/// Can be built from environment variables with [`ScopeConfig::from_env`],
/// from command line arguments with [`ScopeConfig::parse`], or
/// programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "helios-scope")]
#[command(about = "Elasticsearch query scope settings")]
pub struct ScopeConfig {
    /// Result cache store (memory).
    #[arg(long, env = "SCOPE_CACHE_STORE", default_value = "memory")]
    pub cache_store: String,

    /// Namespace prefixed to every cache key.
    #[arg(long, env = "SCOPE_CACHE_NAMESPACE", default_value = "elasticsearch")]
    pub cache_namespace: String,

    /// Cache entry lifetime, e.g. `90s` or `5m`.
    #[arg(long, env = "SCOPE_CACHE_TTL", default_value = "5m")]
    pub cache_ttl: String,

    /// Field used to order `first`/`last` lookups.
    #[arg(long, env = "SCOPE_DEFAULT_SORT_KEY", default_value = "created_at")]
    pub default_sort_key: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SCOPE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            cache_store: "memory".to_string(),
            cache_namespace: DEFAULT_NAMESPACE.to_string(),
            cache_ttl: "5m".to_string(),
            default_sort_key: DEFAULT_SORT_KEY.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ScopeConfig {
    /// Reads the configuration from the environment, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::try_parse_from(["helios-scope"]).unwrap_or_default()
    }

    /// Returns the cache entry lifetime.
    ///
    /// An unparseable value falls back to five minutes.
    pub fn cache_ttl(&self) -> Duration {
        humantime::parse_duration(&self.cache_ttl).unwrap_or(DEFAULT_TTL)
    }

    /// Returns the cache store kind, falling back to memory.
    pub fn cache_store_kind(&self) -> CacheStoreKind {
        match self.cache_store.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("{}; using the memory store", e);
                CacheStoreKind::Memory
            }
        }
    }

    /// Builds the result cache described by this configuration.
    pub fn build_cache(&self) -> ResultCache {
        match self.cache_store_kind() {
            CacheStoreKind::Memory => {
                ResultCache::in_memory(self.cache_namespace.clone(), self.cache_ttl())
            }
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match humantime::parse_duration(&self.cache_ttl) {
            Ok(ttl) if ttl.is_zero() => errors.push("Cache TTL cannot be 0".to_string()),
            Ok(_) => {}
            Err(e) => errors.push(format!("Invalid cache TTL '{}': {}", self.cache_ttl, e)),
        }

        if self.cache_namespace.is_empty() {
            errors.push("Cache namespace cannot be empty".to_string());
        }

        if let Err(e) = self.cache_store.parse::<CacheStoreKind>() {
            errors.push(e);
        }

        if self.default_sort_key.trim().is_empty() {
            errors.push("Default sort key cannot be empty".to_string());
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `helios_scope` logs at `level`. A
/// subscriber that is already installed is left in place.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_scope={}", level)));

    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScopeConfig::default();
        assert_eq!(config.cache_store, "memory");
        assert_eq!(config.cache_namespace, "elasticsearch");
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.default_sort_key, "created_at");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_from_args() {
        let config = ScopeConfig::try_parse_from([
            "helios-scope",
            "--cache-ttl",
            "90s",
            "--cache-namespace",
            "search",
            "--default-sort-key",
            "published_at",
        ])
        .unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(90));
        assert_eq!(config.cache_namespace, "search");
        assert_eq!(config.default_sort_key, "published_at");
    }

    #[test]
    fn test_validation_errors() {
        let config = ScopeConfig {
            cache_ttl: "soon".to_string(),
            cache_namespace: String::new(),
            cache_store: "redis".to_string(),
            log_level: "loud".to_string(),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("Invalid cache TTL")));
        assert!(errors.iter().any(|e| e.contains("unknown cache store")));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = ScopeConfig {
            cache_ttl: "0s".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            vec!["Cache TTL cannot be 0".to_string()]
        );
    }

    #[test]
    fn test_unknown_store_falls_back_to_memory() {
        let config = ScopeConfig {
            cache_store: "redis".to_string(),
            ..Default::default()
        };
        assert_eq!(config.cache_store_kind(), CacheStoreKind::Memory);
        assert_eq!(config.build_cache().ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_ttl_falls_back_to_default() {
        let config = ScopeConfig {
            cache_ttl: "later".to_string(),
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), DEFAULT_TTL);
    }
}

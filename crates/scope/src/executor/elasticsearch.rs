//! Executor backed by the official Elasticsearch client.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::params::{Refresh, SearchType as EsSearchType};
use elasticsearch::{Elasticsearch, IndexParts, SearchParts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::CompiledQuery;
use crate::error::ExecutorError;
use crate::types::{Record, SearchType};

use super::{Executor, Persister, SearchResponse};

const BACKEND_NAME: &str = "elasticsearch";

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Connection settings for [`ElasticsearchExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    pub nodes: Vec<String>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,

    /// Refresh the index after `create` so the document is searchable at once.
    #[serde(default)]
    pub refresh_on_create: bool,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
            refresh_on_create: false,
        }
    }
}

/// Runs compiled scopes against an Elasticsearch cluster.
pub struct ElasticsearchExecutor {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: ElasticsearchConfig) -> Result<Self, ExecutorError> {
        let client = Self::build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Elasticsearch, config: ElasticsearchConfig) -> Self {
        Self { client, config }
    }

    fn build_client(config: &ElasticsearchConfig) -> Result<Elasticsearch, ExecutorError> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url =
            url.parse().map_err(|e| ExecutorError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid URL: {}", e),
            })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder
            .build()
            .map_err(|e| ExecutorError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Failed to build transport: {}", e),
            })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the executor configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }
}

fn request_error(e: elasticsearch::Error) -> ExecutorError {
    ExecutorError::Request {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
    }
}

fn response_error(message: String) -> ExecutorError {
    ExecutorError::Response {
        backend_name: BACKEND_NAME.to_string(),
        message,
    }
}

fn to_i64(option: &str, value: u64) -> Result<i64, ExecutorError> {
    i64::try_from(value).map_err(|_| ExecutorError::Request {
        backend_name: BACKEND_NAME.to_string(),
        message: format!("{} out of range: {}", option, value),
    })
}

fn es_search_type(search_type: SearchType) -> EsSearchType {
    match search_type {
        SearchType::QueryThenFetch => EsSearchType::QueryThenFetch,
        SearchType::DfsQueryThenFetch => EsSearchType::DfsQueryThenFetch,
    }
}

#[async_trait]
impl Executor for ElasticsearchExecutor {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn search(
        &self,
        index: &str,
        query: &CompiledQuery,
    ) -> Result<SearchResponse, ExecutorError> {
        let options = &query.options;
        let indices = [index];
        let routing: Vec<&str> = options.routing.iter().map(String::as_str).collect();
        let preference = options.extra.get("preference").and_then(Value::as_str);
        let timeout = options.extra.get("timeout").and_then(Value::as_str);

        let mut request = self
            .client
            .search(SearchParts::Index(&indices))
            .body(query.document.body.clone());

        if let Some(size) = options.size {
            request = request.size(to_i64("size", size)?);
        }
        if let Some(from) = options.from {
            request = request.from(to_i64("from", from)?);
        }
        if !routing.is_empty() {
            request = request.routing(&routing);
        }
        if let Some(search_type) = options.search_type {
            request = request.search_type(es_search_type(search_type));
        }
        if let Some(preference) = preference {
            request = request.preference(preference);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        if let Some(request_cache) = options.extra.get("request_cache").and_then(Value::as_bool) {
            request = request.request_cache(request_cache);
        }
        for key in options.extra.keys() {
            if !matches!(key.as_str(), "preference" | "timeout" | "request_cache") {
                tracing::debug!(option = %key, "Ignoring unsupported search option");
            }
        }

        let response = request.send().await.map_err(request_error)?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Engine {
                backend_name: BACKEND_NAME.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| response_error(format!("Failed to parse search response: {}", e)))?;

        SearchResponse::from_body(BACKEND_NAME, &body)
    }
}

#[async_trait]
impl Persister for ElasticsearchExecutor {
    async fn create(
        &self,
        index: &str,
        attributes: Map<String, Value>,
    ) -> Result<Record, ExecutorError> {
        let source = Value::Object(attributes);

        let mut request = self
            .client
            .index(IndexParts::Index(index))
            .body(source.clone());
        if self.config.refresh_on_create {
            request = request.refresh(Refresh::WaitFor);
        }

        let response = request.send().await.map_err(request_error)?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Engine {
                backend_name: BACKEND_NAME.to_string(),
                status: status.as_u16(),
                message: format!("Failed to index document: {}", body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| response_error(format!("Failed to parse index response: {}", e)))?;

        let mut record = Record::new(
            body.get("_id").and_then(Value::as_str).map(str::to_string),
            source,
        );
        record.index = Some(index.to_string());
        Ok(record)
    }
}

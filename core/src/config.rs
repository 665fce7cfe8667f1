//! Manager-wide defaults and per-request configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpMethod, ProgressEvent, ProgressHandler, RequestBody, ResponseType, TransportOptions};
use crate::url::{Query, QueryValue};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Defaults applied to every request a manager issues. Loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Client-side timeout in milliseconds. Must be greater than zero.
    pub timeout_ms: u64,
    pub method: HttpMethod,
    pub response_type: ResponseType,
    /// Sent with every request; a per-request header of the same name wins.
    pub headers: BTreeMap<String, String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            method: HttpMethod::Get,
            response_type: ResponseType::Json,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
}

impl ManagerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ManagerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.display(), timeout_ms = config.timeout_ms, "loaded manager config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Predicate deciding whether an HTTP status counts as success.
pub type StatusValidator = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// `200 <= status < 300`.
pub fn default_validate_status(status: u16) -> bool {
    (200..300).contains(&status)
}

pub(crate) fn default_validator() -> StatusValidator {
    Arc::new(default_validate_status)
}

/// One call to [`RequestManager::request`](crate::RequestManager::request).
///
/// Unset fields fall back to the manager's [`ManagerConfig`].
#[derive(Clone)]
pub struct RequestConfig {
    pub(crate) url: String,
    pub(crate) method: Option<HttpMethod>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) query: Query,
    pub(crate) body: Option<RequestBody>,
    pub(crate) response_type: Option<ResponseType>,
    pub(crate) validate_status: Option<StatusValidator>,
    pub(crate) cancel_token: Option<CancellationToken>,
    pub(crate) options: TransportOptions,
    pub(crate) upload_progress: Option<ProgressHandler>,
    pub(crate) download_progress: Option<ProgressHandler>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
            headers: BTreeMap::new(),
            timeout: None,
            query: Query::new(),
            body: None,
            response_type: None,
            validate_status: None,
            cancel_token: None,
            options: TransportOptions::new(),
            upload_progress: None,
            download_progress: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parameters to merge into the URL's embedded query.
    pub fn extra_query(&self) -> &Query {
        &self.query
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Header names are case-insensitive and stored lower-cased.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parameters merged into the URL's own query; they never replace it.
    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn query_value(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(name, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json(self, value: serde_json::Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn validate_status<F>(mut self, validate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        let validate: StatusValidator = Arc::new(validate);
        self.validate_status = Some(validate);
        self
    }

    /// Bind a caller-owned token; firing it settles the call as `CancelError`.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Forwarded verbatim to the transport.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Called as the request body is sent. How often is up to the transport.
    pub fn on_upload_progress<F>(mut self, handler: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.upload_progress = Some(ProgressHandler::new(handler));
        self
    }

    /// Called as the response body arrives. Never called once the request
    /// has settled.
    pub fn on_download_progress<F>(mut self, handler: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.download_progress = Some(ProgressHandler::new(handler));
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("response_type", &self.response_type)
            .field("validate_status", &self.validate_status.as_ref().map(|_| "<fn>"))
            .field("cancel_token", &self.cancel_token)
            .field("options", &self.options)
            .field("upload_progress", &self.upload_progress)
            .field("download_progress", &self.download_progress)
            .finish()
    }
}

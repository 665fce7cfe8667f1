//! Error types for the request manager.
//!
//! # Design
//! Every terminal state of a request other than success is a `RequestError`
//! returned through `Result`. The variants are the taxonomy callers branch
//! on: `Abort` (something else superseded the call) is kept apart from
//! `Cancel` (the caller's own token fired) so a UI can ignore the former and
//! report the latter. `Validate` carries the whole response because callers
//! usually want to look at the status code and body.

use thiserror::Error;

use crate::http::{Response, ResponseType};

/// Stable classification of a [`RequestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Params,
    Abort,
    Cancel,
    Timeout,
    Network,
    Validate,
    Decode,
}

impl ErrorKind {
    /// Name callers match on, e.g. `"AbortError"`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Params => "ParamsError",
            ErrorKind::Abort => "AbortError",
            ErrorKind::Cancel => "CancelError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Validate => "ValidateError",
            ErrorKind::Decode => "DecodeError",
        }
    }
}

/// Errors settled by [`RequestManager::request`](crate::RequestManager::request).
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request configuration was rejected before any I/O.
    #[error("{message}")]
    Params { code: &'static str, message: String },

    /// Superseded by a newer call to the same URL, or aborted by the manager.
    #[error("request to {url} was aborted")]
    Abort { url: String },

    /// The caller's cancellation token fired.
    #[error("request to {url} was cancelled")]
    Cancel { url: String },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// The transport failed below the HTTP layer.
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: TransportError,
    },

    /// A response arrived but the status validator rejected it.
    #[error("HTTP {} from {} failed status validation", .response.status, .response.url)]
    Validate { response: Box<Response> },

    #[error("failed to decode {response_type} body from {url}: {message}")]
    Decode {
        url: String,
        response_type: ResponseType,
        message: String,
    },
}

impl RequestError {
    pub(crate) fn missing_url() -> Self {
        RequestError::Params {
            code: "ERR_MISSING_URL",
            message: "missing url parameter".to_string(),
        }
    }

    pub(crate) fn invalid_params(message: impl Into<String>) -> Self {
        RequestError::Params {
            code: "ERR_INVALID_PARAMS",
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Params { .. } => ErrorKind::Params,
            RequestError::Abort { .. } => ErrorKind::Abort,
            RequestError::Cancel { .. } => ErrorKind::Cancel,
            RequestError::Timeout { .. } => ErrorKind::Timeout,
            RequestError::Network { .. } => ErrorKind::Network,
            RequestError::Validate { .. } => ErrorKind::Validate,
            RequestError::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Machine-readable code, e.g. `"ERR_TIMEOUT"`.
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Params { code, .. } => *code,
            RequestError::Abort { .. } => "ERR_ABORT",
            RequestError::Cancel { .. } => "ERR_CANCEL",
            RequestError::Timeout { .. } => "ERR_TIMEOUT",
            RequestError::Network { .. } => "ERR_NETWORK",
            RequestError::Validate { .. } => "ERR_VALIDATE",
            RequestError::Decode { .. } => "ERR_DECODE",
        }
    }

    /// The rejected response, for `Validate` errors.
    pub fn response(&self) -> Option<&Response> {
        match self {
            RequestError::Validate { response } => Some(response.as_ref()),
            _ => None,
        }
    }
}

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// A method string that is not a supported HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

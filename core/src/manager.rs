//! Request lifecycle: supersession, timeout and cancellation.
//!
//! # Design
//! `RequestManager` owns a [`PendingRegistry`] and a [`Transport`]. A call
//! resolves its canonical URL, registers itself (aborting any call already
//! pending for that URL), then races four futures in one `select!`:
//! supersession, the caller's token, the timeout and the transport. The
//! first to finish decides the result and the rest are dropped, which also
//! aborts the in-flight exchange. The registry slot is released when the
//! call's [`Registration`](crate::registry::Registration) drops, on every
//! path including the caller dropping the future.
//!
//! Registering happens before the first await, so two calls issued
//! back-to-back always abort the first one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{default_validator, ManagerConfig, RequestConfig, StatusValidator};
use crate::decode::decode_body;
use crate::error::{ErrorKind, RequestError, TransportError};
use crate::http::{RawResponse, Response, ResponseData, ResponseType, TransportRequest};
use crate::registry::PendingRegistry;
use crate::transport::{ReqwestTransport, Transport};
use crate::url;

/// Outcome of one call: the response, or why there is none.
pub type FetchResult = Result<Response, RequestError>;

/// Issues requests, keeping at most one pending per canonical URL.
///
/// Cloning is cheap and clones share the registry and transport.
pub struct RequestManager<T = ReqwestTransport> {
    transport: Arc<T>,
    registry: PendingRegistry,
    config: ManagerConfig,
}

impl RequestManager<ReqwestTransport> {
    /// Manager over the default reqwest transport with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self::with_transport(ReqwestTransport::new()?, ManagerConfig::default()))
    }

    pub fn with_config(config: ManagerConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(ReqwestTransport::new()?, config))
    }
}

impl<T: Transport> RequestManager<T> {
    pub fn with_transport(transport: T, config: ManagerConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            registry: PendingRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a call for the canonical `url` is in flight.
    pub fn is_pending(&self, url: &str) -> bool {
        self.registry.contains(url)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Settle the call pending for the canonical `url` with `AbortError`.
    /// Returns whether there was one.
    pub fn abort(&self, url: &str) -> bool {
        self.registry.abort(url)
    }

    /// Settle every in-flight call with `AbortError`.
    pub fn abort_all(&self) {
        tracing::debug!(pending = self.registry.len(), "aborting all pending requests");
        self.registry.abort_all();
    }

    /// Issue one request.
    ///
    /// Always settles exactly once, within the timeout plus scheduling slack.
    pub async fn request(&self, config: RequestConfig) -> FetchResult {
        let RequestConfig {
            url: raw_url,
            method,
            headers,
            timeout,
            query,
            body,
            response_type,
            validate_status,
            cancel_token,
            options,
            upload_progress,
            download_progress,
        } = config;

        if raw_url.trim().is_empty() {
            return Err(RequestError::missing_url());
        }
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        if timeout.is_zero() {
            return Err(RequestError::invalid_params("timeout must be greater than zero"));
        }

        let url = url::join(&raw_url, &query);
        let method = method.unwrap_or(self.config.method);
        let response_type = response_type.unwrap_or(self.config.response_type);
        let validate_status = validate_status.unwrap_or_else(default_validator);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let mut merged_headers: BTreeMap<String, String> = self
            .config
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        merged_headers.extend(headers);

        // No await between registering and issuing: a later call for the same
        // URL always observes this one.
        let registration = self.registry.register(&url);
        let request_id = registration.id();
        tracing::debug!(%request_id, %url, %method, timeout_ms, "issuing request");

        let request = TransportRequest {
            method,
            url: url.clone(),
            headers: merged_headers.into_iter().collect(),
            body,
            options,
            upload_progress,
            download_progress,
        };

        // Dropping the losing branches also drops the transport future, so
        // progress handlers stop firing once the call has settled.
        let outcome = tokio::select! {
            biased;
            _ = registration.aborted() => Err(RequestError::Abort { url: url.clone() }),
            _ = cancelled(cancel_token.as_ref()) => Err(RequestError::Cancel { url: url.clone() }),
            _ = tokio::time::sleep(timeout) => Err(RequestError::Timeout { url: url.clone(), timeout_ms }),
            sent = self.transport.send(request) => settle(sent, &url, response_type, &validate_status),
        };
        drop(registration);

        log_outcome(&outcome, request_id, &url);
        outcome
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn settle(
    sent: Result<RawResponse, TransportError>,
    url: &str,
    response_type: ResponseType,
    validate_status: &StatusValidator,
) -> FetchResult {
    let raw = sent.map_err(|source| RequestError::Network {
        url: url.to_string(),
        source,
    })?;

    if validate_status(raw.status) {
        let data = decode_body(response_type, &raw)?;
        return Ok(raw.into_response(data));
    }

    // Keep the rejected response inspectable even if its body does not decode.
    let data = decode_body(response_type, &raw).unwrap_or_else(|_| ResponseData::ArrayBuffer(raw.body.clone()));
    Err(RequestError::Validate {
        response: Box::new(raw.into_response(data)),
    })
}

fn log_outcome(outcome: &FetchResult, request_id: uuid::Uuid, url: &str) {
    match outcome {
        Ok(response) => {
            tracing::debug!(%request_id, %url, status = response.status, "request succeeded");
        }
        Err(err) => match err.kind() {
            ErrorKind::Network | ErrorKind::Decode => {
                tracing::warn!(%request_id, %url, error = %err, "request failed");
            }
            kind => {
                tracing::debug!(%request_id, %url, kind = kind.name(), error = %err, "request settled with error");
            }
        },
    }
}

impl<T> Clone for RequestManager<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            registry: self.registry.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for RequestManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

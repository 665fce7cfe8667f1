//! The transport seam and its reqwest-backed default.
//!
//! # Design
//! The manager owns timing, cancellation and registry bookkeeping; a
//! transport only moves one request over the wire and reads the body.
//! Aborting is done by dropping the future returned from `send`, so a
//! transport needs no cancellation API of its own.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use crate::error::TransportError;
use crate::http::{HttpMethod, ProgressEvent, RawResponse, RequestBody, TransportRequest};

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and read the full response body.
    ///
    /// Any HTTP status is a successful exchange; only failures below the HTTP
    /// layer are `Err`. Progress handlers on the request are only called while
    /// the returned future is being polled.
    fn send(&self, request: TransportRequest) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// Default transport built on `reqwest`.
///
/// Honors the `redirect` pass-through option: `manual` returns 3xx responses
/// as-is, anything else follows redirects.
///
/// Download progress fires once per body chunk. reqwest does not expose how
/// much of a request body has been written, so upload progress fires a single
/// event covering the whole body once the response head arrives.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    follow: reqwest::Client,
    manual: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let follow = reqwest::Client::builder().build()?;
        let manual = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { follow, manual })
    }

    fn client_for(&self, request: &TransportRequest) -> &reqwest::Client {
        match request.options.get("redirect") {
            Some("manual") => &self.manual,
            _ => &self.follow,
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        let client = self.client_for(&request).clone();
        async move {
            let has_content_type = request
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));

            let mut builder = client.request(request.method.into(), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let payload = match request.body {
                Some(RequestBody::Text(text)) => Some(text.into_bytes()),
                Some(RequestBody::Bytes(bytes)) => Some(bytes),
                Some(RequestBody::Json(value)) => {
                    if !has_content_type {
                        builder = builder.header(CONTENT_TYPE, "application/json");
                    }
                    Some(serde_json::to_vec(&value).map_err(|e| TransportError::Request(e.to_string()))?)
                }
                None => None,
            };
            let upload_len = payload.as_ref().map(|bytes| bytes.len() as u64);
            if let Some(payload) = payload {
                builder = builder.body(payload);
            }

            let mut response = builder.send().await?;
            if let (Some(progress), Some(len)) = (&request.upload_progress, upload_len) {
                progress.emit(ProgressEvent {
                    loaded: len,
                    total: Some(len),
                });
            }

            let status = response.status();
            let url = response.url().to_string();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    (name.as_str().to_string(), value)
                })
                .collect();

            let total = response.content_length();
            let mut body = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?
            {
                body.extend_from_slice(&chunk);
                if let Some(progress) = &request.download_progress {
                    progress.emit(ProgressEvent {
                        loaded: body.len() as u64,
                        total,
                    });
                }
            }

            Ok(RawResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                url,
                headers,
                body,
            })
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

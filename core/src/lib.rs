//! Abortable HTTP requests for code that keeps re-issuing the same query.
//!
//! # Overview
//! [`RequestManager::request`] sends one request and guarantees that only the
//! most recent call for a given resolved URL ever settles successfully: a new
//! call aborts the one still pending for the same URL. Each call also races a
//! client-side timeout and an optional caller-owned cancellation token.
//!
//! # Design
//! - [`url`] splits URL-like strings and merges extra query parameters; its
//!   output is the key of the pending-request registry.
//! - The registry lives inside each `RequestManager`, so independent managers
//!   (and tests) never share state.
//! - Network I/O sits behind the [`Transport`] trait. [`ReqwestTransport`] is
//!   the default; tests plug in scripted transports.
//! - Every outcome is a [`FetchResult`]; nothing panics on a failed request.

pub mod cancel;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod manager;
pub mod registry;
pub mod transport;
pub mod url;

pub use cancel::{create_cancellation_token, CancelSource};
pub use config::{default_validate_status, ConfigError, ManagerConfig, RequestConfig, StatusValidator};
pub use error::{ErrorKind, RequestError, TransportError, UnknownMethod};
pub use http::{
    HttpMethod, ProgressEvent, ProgressHandler, RawResponse, RequestBody, Response, ResponseData, ResponseType,
    TransportOptions, TransportRequest,
};
pub use manager::{FetchResult, RequestManager};
pub use registry::{PendingRegistry, Registration};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ReqwestTransport, Transport};
pub use url::{join, parse, ParsedUrl, Query, QueryValue};

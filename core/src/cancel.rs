//! Caller-owned cancellation.

use tokio_util::sync::CancellationToken;

/// Owner side of a cancellation token.
///
/// Hand [`token`](CancelSource::token) to one or more
/// [`RequestConfig`](crate::RequestConfig)s and call
/// [`cancel`](CancelSource::cancel) to settle every in-flight call bound to it
/// with `CancelError`. A cancelled source stays cancelled; calls started with
/// it afterwards settle immediately.
#[derive(Debug, Clone, Default)]
pub struct CancelSource {
    token: CancellationToken,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Create a fresh [`CancelSource`].
pub fn create_cancellation_token() -> CancelSource {
    CancelSource::new()
}

//! Registry of in-flight requests, one per canonical URL.
//!
//! # Design
//! Each entry holds the abort token of the call currently pending for a URL,
//! tagged with a per-call id. [`PendingRegistry::register`] swaps the new
//! entry in with a single map insert and only then fires the displaced
//! token, so two back-to-back registrations can never both see an empty
//! slot. Removal happens in [`Registration`]'s `Drop` and checks the id, so
//! a superseded call tearing down late never evicts its successor.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

#[derive(Debug)]
struct PendingEntry {
    id: Uuid,
    abort: CancellationToken,
}

/// Map from canonical URL to the pending call for it.
#[derive(Debug, Clone, Default)]
pub struct PendingRegistry {
    entries: Arc<DashMap<String, PendingEntry>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new pending call for `url`, aborting the one it replaces.
    pub fn register(&self, url: &str) -> Registration {
        let id = Uuid::new_v4();
        let abort = CancellationToken::new();
        let previous = self.entries.insert(
            url.to_string(),
            PendingEntry {
                id,
                abort: abort.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(%url, superseded = %previous.id, request_id = %id, "superseding pending request");
            previous.abort.cancel();
        }
        Registration {
            registry: self.clone(),
            url: url.to_string(),
            id,
            abort,
        }
    }

    /// Abort the call pending for `url`, if any.
    pub fn abort(&self, url: &str) -> bool {
        let token = self.entries.get(url).map(|entry| entry.abort.clone());
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Abort every pending call.
    pub fn abort_all(&self) {
        let tokens: Vec<CancellationToken> = self.entries.iter().map(|entry| entry.abort.clone()).collect();
        for token in tokens {
            token.cancel();
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A call's slot in the registry. Dropping it releases the slot if it still
/// belongs to this call.
#[derive(Debug)]
pub struct Registration {
    registry: PendingRegistry,
    url: String,
    id: Uuid,
    abort: CancellationToken,
}

impl Registration {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolves once this call has been superseded or aborted.
    pub fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.abort.cancelled()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry
            .entries
            .remove_if(&self.url, |_, entry| entry.id == self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_supersedes_previous() {
        let registry = PendingRegistry::new();
        let first = registry.register("http://x/a");
        assert!(!first.is_aborted());
        assert_eq!(first.url(), "http://x/a");

        let second = registry.register("http://x/a");
        assert!(first.is_aborted());
        assert!(!second.is_aborted());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn superseded_drop_keeps_successor() {
        let registry = PendingRegistry::new();
        let first = registry.register("http://x/a");
        let second = registry.register("http://x/a");

        drop(first);
        assert!(registry.contains("http://x/a"));

        drop(second);
        assert!(registry.is_empty());
    }

    #[test]
    fn distinct_urls_do_not_interfere() {
        let registry = PendingRegistry::new();
        let a = registry.register("http://x/a");
        let b = registry.register("http://x/b");
        assert!(!a.is_aborted());
        assert!(!b.is_aborted());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn abort_by_url() {
        let registry = PendingRegistry::new();
        let a = registry.register("http://x/a");
        assert!(registry.abort("http://x/a"));
        assert!(a.is_aborted());
        assert!(!registry.abort("http://x/missing"));
    }

    #[test]
    fn abort_all_fires_every_token() {
        let registry = PendingRegistry::new();
        let a = registry.register("http://x/a");
        let b = registry.register("http://x/b");
        registry.abort_all();
        assert!(a.is_aborted());
        assert!(b.is_aborted());
    }
}

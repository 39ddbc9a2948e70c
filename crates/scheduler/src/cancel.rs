//! Cancellation tokens for page render tasks
//!
//! A render task carries a token; the scheduler fires it when the page leaves the
//! render window or when a newer scale supersedes the task. Rasterisers poll the
//! token between units of work and stop early.

use pdfmask_engine::CancelSignal;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

/// Cancellation token for cooperative render cancellation
///
/// Clones share the same underlying flag, so the scheduler can keep one copy and
/// hand another to the worker performing the raster.
///
/// # Example
///
/// ```
/// use pdfmask_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl CancelSignal for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

/// Tokens of in-flight renders, keyed by page index
///
/// At most one token is registered per page, matching the scheduler's
/// one-render-per-page rule. Registering a new token for a page cancels the
/// previous one.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<u32, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<u32, CancellationToken>> {
        // A poisoned map still holds valid tokens; keep using it.
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh token for `page_index` and return a clone of it.
    pub fn register(&self, page_index: u32) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.tokens().insert(page_index, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel the token registered for `page_index`, keeping it registered.
    ///
    /// Returns `true` if a token was found.
    pub fn cancel(&self, page_index: u32) -> bool {
        match self.tokens().get(&page_index) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and remove every registered token. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut tokens = self.tokens();
        let count = tokens.len();
        for (_, token) in tokens.drain() {
            token.cancel();
        }
        count
    }

    /// Forget the token for `page_index` without cancelling it.
    pub fn unregister(&self, page_index: u32) -> bool {
        self.tokens().remove(&page_index).is_some()
    }

    pub fn get(&self, page_index: u32) -> Option<CancellationToken> {
        self.tokens().get(&page_index).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        assert!(!token2.is_cancelled());

        token1.cancel();
        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_token_as_cancel_signal() {
        let token = CancellationToken::new();
        let signal: &dyn CancelSignal = &token;
        assert!(!signal.is_cancelled());
        token.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_registry_register_replaces_and_cancels_previous() {
        let registry = CancellationRegistry::new();

        let first = registry.register(3);
        let second = registry.register(3);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_cancel_by_page() {
        let registry = CancellationRegistry::new();
        let token = registry.register(1);

        assert!(registry.cancel(1));
        assert!(token.is_cancelled());
        assert!(!registry.cancel(99));
    }

    #[test]
    fn test_registry_cancel_all() {
        let registry = CancellationRegistry::new();
        let a = registry.register(1);
        let b = registry.register(2);

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_unregister_leaves_token_live() {
        let registry = CancellationRegistry::new();
        let token = registry.register(7);

        assert!(registry.unregister(7));
        assert!(!registry.unregister(7));
        assert!(!token.is_cancelled());
        assert!(registry.get(7).is_none());
    }
}

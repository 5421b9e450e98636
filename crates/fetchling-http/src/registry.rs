//! In-flight call bookkeeping and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Identity of one outstanding call: caller-supplied tag plus request URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    /// Opaque grouping key for bulk cancellation, if any.
    pub tag: Option<String>,
    /// Request URL.
    pub url: String,
}

impl CallKey {
    /// Build a key from an optional tag and a URL.
    pub fn new(tag: Option<impl Into<String>>, url: impl Into<String>) -> Self {
        Self {
            tag: tag.map(Into::into),
            url: url.into(),
        }
    }
}

/// Cancellation capability for one in-flight call.
///
/// Clones share state: cancelling any clone cancels the call. Cancellation is
/// cooperative — the I/O task is woken and stops, and no listener delivery
/// happens once the flag is observed.
#[derive(Debug, Clone, Default)]
pub struct CallHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CallHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the call to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether two handles control the same call.
    pub(crate) fn same(&self, other: &CallHandle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }

    /// Resolve once the handle is cancelled.
    pub(crate) async fn cancelled_wait(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Tracks in-flight calls so they can be cancelled one at a time or in bulk
/// by tag.
///
/// Registering the same (tag, url) twice keeps both entries; identical
/// concurrent requests coexist silently. This mirrors the permissive contract
/// callers rely on and is pinned by tests rather than "fixed".
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: Mutex<Vec<(CallKey, CallHandle)>>,
}

impl CallRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle under the given key. Pre-existing entries under the
    /// same key are left untouched.
    pub fn register(&self, key: CallKey, handle: CallHandle) {
        let mut calls = self.lock();
        calls.push((key, handle));
    }

    /// Remove one entry matching the key. No-op if absent. With duplicate
    /// registrations any one matching entry is removed; handles under the
    /// same key are interchangeable with respect to identity.
    pub fn remove(&self, key: &CallKey) {
        let mut calls = self.lock();
        if let Some(pos) = calls.iter().position(|(k, _)| k == key) {
            calls.swap_remove(pos);
        }
    }

    /// Remove the entry owned by exactly this handle. No-op if a cancel
    /// operation already drained it. Keeps "unregistered exactly once" even
    /// when duplicate (tag, url) entries coexist.
    pub(crate) fn deregister(&self, key: &CallKey, handle: &CallHandle) {
        let mut calls = self.lock();
        if let Some(pos) = calls
            .iter()
            .position(|(k, h)| k == key && h.same(handle))
        {
            calls.swap_remove(pos);
        }
    }

    /// Cancel and remove one entry matching the key.
    pub fn cancel(&self, key: &CallKey) {
        let mut calls = self.lock();
        if let Some(pos) = calls.iter().position(|(k, _)| k == key) {
            let (_, handle) = calls.swap_remove(pos);
            handle.cancel();
        }
    }

    /// Cancel and remove every entry whose tag matches.
    ///
    /// Acts on a snapshot: entries registered after this call starts are not
    /// affected. Untagged calls are never matched; cancel them individually
    /// or via [`cancel_all`](Self::cancel_all).
    pub fn cancel_by_tag(&self, tag: &str) {
        let drained: Vec<_> = {
            let mut calls = self.lock();
            let mut kept = Vec::with_capacity(calls.len());
            let mut matched = Vec::new();
            for entry in calls.drain(..) {
                if entry.0.tag.as_deref() == Some(tag) {
                    matched.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            *calls = kept;
            matched
        };

        if !drained.is_empty() {
            tracing::debug!(tag, count = drained.len(), "cancelling calls by tag");
        }
        for (_, handle) in drained {
            handle.cancel();
        }
    }

    /// Cancel and remove every entry.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = {
            let mut calls = self.lock();
            calls.drain(..).collect()
        };
        for (_, handle) in drained {
            handle.cancel();
        }
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no calls are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of entries registered under the given tag.
    pub fn count_for_tag(&self, tag: &str) -> usize {
        self.lock()
            .iter()
            .filter(|(k, _)| k.tag.as_deref() == Some(tag))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(CallKey, CallHandle)>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

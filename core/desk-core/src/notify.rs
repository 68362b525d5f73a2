//! Inactive-user notification channel.
//!
//! A single process-wide `Notifier` is created at application start (owned by
//! the engine) and torn down with it. Observers register explicitly via
//! `subscribe`/`unsubscribe`; delivery is fire-and-forget with no return
//! value, so a slow or missing observer never affects the gated call that
//! triggered the broadcast.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Payload carried by the inactive-user broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct InactiveNotice {
    pub message: String,
}

impl InactiveNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&InactiveNotice) + Send + Sync>;

/// Observer registry for inactive-user notices.
///
/// Multiple subscribers are permitted and are not deduplicated; each receives
/// every broadcast in registration order.
pub struct Notifier {
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers an observer. The callback runs on whichever thread performs
    /// the gated call that triggers the broadcast.
    pub fn subscribe(&self, callback: impl Fn(&InactiveNotice) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push((id, Arc::new(callback)));
        }
        id
    }

    /// Removes an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Delivers a notice to every current subscriber. Fire-and-forget: a
    /// poisoned registry drops the broadcast rather than propagating a panic
    /// into the gated call. Callbacks run outside the registry lock, so an
    /// observer may subscribe or unsubscribe from within its own callback.
    pub fn broadcast(&self, notice: &InactiveNotice) {
        let callbacks: Vec<Callback> = match self.subscribers.lock() {
            Ok(subs) => subs.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => {
                tracing::warn!("notifier registry poisoned, dropping notice");
                return;
            }
        };
        tracing::debug!(subscribers = callbacks.len(), message = %notice.message, "broadcasting inactive notice");
        for callback in callbacks {
            callback(notice);
        }
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

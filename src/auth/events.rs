//! Auth state-change notifications.
//!
//! A small publish/subscribe channel with explicit semantics instead of
//! incidental listener order: events are delivered to subscribers in
//! registration order, at least once per transition. Listeners must be
//! idempotent against duplicate delivery of the same transition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::Session;

/// What kind of transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// Synthetic event fired once on subscription, reflecting current state.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A transient notification carrying the current session, if any.
///
/// Not persisted; exists only for the duration of listener calls.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .expect("subscriber registry poisoned")
            .push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .expect("subscriber registry poisoned")
            .retain(|(entry_id, _)| *entry_id != id);
    }

    /// Deliver `event` to all current subscribers in registration order.
    ///
    /// Listeners run outside the registry lock so they may subscribe or
    /// unsubscribe re-entrantly.
    pub(crate) fn emit(&self, event: &AuthEvent) {
        let listeners: Vec<Listener> = self
            .entries
            .lock()
            .expect("subscriber registry poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("subscriber registry poisoned").len()
    }
}

/// Handle returned by `IdentityClient::subscribe`.
///
/// Dropping it unsubscribes the listener.
pub struct Subscription {
    id: u64,
    registry: Weak<Subscribers>,
}

impl Subscription {
    /// Explicitly unsubscribe. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

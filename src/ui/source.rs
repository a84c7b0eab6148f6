//! Session sources
//!
//! A source owns the authoritative session state and notifies subscribers when
//! it changes. Providers subscribe on mount and unsubscribe on unmount.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::auth::SessionState;
use crate::metrics::SESSION_SUBSCRIPTIONS_ACTIVE;

/// Handle returned by [`SessionSource::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Something that can feed session state to providers
#[cfg_attr(test, mockall::automock)]
pub trait SessionSource: Send + Sync {
    /// Start receiving session state
    fn subscribe(&self) -> (SubscriptionId, watch::Receiver<SessionState>);

    /// Stop a subscription obtained from [`SessionSource::subscribe`]
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Watch-channel backed session source
pub struct SessionHub {
    sender: watch::Sender<SessionState>,
    next_id: AtomicU64,
    active: Mutex<HashSet<SubscriptionId>>,
}

impl SessionHub {
    pub fn new(initial: SessionState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender,
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the current state and notify every subscriber
    pub fn publish(&self, state: SessionState) {
        tracing::debug!(status = state.status(), "Publishing session state");
        self.sender.send_replace(state);
    }

    pub fn current(&self) -> SessionState {
        self.sender.borrow().clone()
    }

    /// Number of subscriptions not yet released
    pub fn subscriber_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(SessionState::Loading)
    }
}

impl SessionSource for SessionHub {
    fn subscribe(&self) -> (SubscriptionId, watch::Receiver<SessionState>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        SESSION_SUBSCRIPTIONS_ACTIVE.inc();

        (id, self.sender.subscribe())
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if removed {
            SESSION_SUBSCRIPTIONS_ACTIVE.dec();
        } else {
            tracing::warn!(subscription = id.0, "Unsubscribe for unknown session subscription");
        }
    }
}

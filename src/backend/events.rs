use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::models::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A single auth state change: what happened and the session after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Broadcast point for auth state changes, owned by an auth service implementation.
///
/// Subscribers only observe changes published after they subscribed.
pub struct AuthEvents {
    tx: watch::Sender<AuthChange>,
    next_id: AtomicU64,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthChange {
            event: AuthEvent::InitialSession,
            session: None,
        });
        Self {
            tx,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn publish(&self, event: AuthEvent, session: Option<Session>) {
        tracing::debug!(?event, has_session = session.is_some(), "auth state change");
        self.tx.send_replace(AuthChange { event, session });
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        AuthSubscription {
            id,
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellable handle on the auth change stream. Released on `unsubscribe` or drop.
pub struct AuthSubscription {
    id: u64,
    rx: Option<watch::Receiver<AuthChange>>,
}

impl AuthSubscription {
    /// Wait for the next change. `None` once unsubscribed or the publisher is gone.
    pub async fn changed(&mut self) -> Option<AuthChange> {
        let rx = self.rx.as_mut()?;
        match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            tracing::debug!(subscription = self.id, "auth subscription released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

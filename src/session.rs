//! Session gate: decides whether the list screen may proceed.

use std::sync::Arc;

use crate::backend::{AuthService, AuthSubscription};
use crate::models::AuthUser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Authenticated(AuthUser),
    /// No session; the display layer redirects to sign-in.
    Unauthenticated,
}

impl GateState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            GateState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionGate {
    auth: Arc<dyn AuthService>,
    subscription: Option<AuthSubscription>,
    state: GateState,
}

impl SessionGate {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            subscription: None,
            state: GateState::Pending,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Subscribe to auth changes, then settle on the current session.
    ///
    /// The subscription is taken first so a change racing the initial read is not lost.
    pub async fn mount(&mut self) -> &GateState {
        if self.subscription.is_none() {
            self.subscription = Some(self.auth.on_auth_state_change());
        }

        self.state = match self.auth.get_session().await {
            Ok(Some(session)) => GateState::Authenticated(session.user),
            Ok(None) => GateState::Unauthenticated,
            Err(e) => {
                tracing::warn!(error = %e, "could not read session, treating as signed out");
                GateState::Unauthenticated
            }
        };
        tracing::info!(authenticated = self.state.user().is_some(), "session gate settled");
        &self.state
    }

    /// Wait for the next auth change and apply it. `None` once torn down.
    pub async fn next_change(&mut self) -> Option<&GateState> {
        let change = self.subscription.as_mut()?.changed().await?;
        self.state = match change.session {
            Some(session) => GateState::Authenticated(session.user),
            None => GateState::Unauthenticated,
        };
        tracing::info!(event = ?change.event, authenticated = self.state.user().is_some(), "session changed");
        Some(&self.state)
    }

    pub fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().map(|s| s.is_active()).unwrap_or(false)
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.teardown();
    }
}

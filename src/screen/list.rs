//! The main list screen.
//!
//! `Loading -> Ready` once the session gate and role resolver have settled; `Ready` loops
//! through a re-fetch after every successful action; `Unauthenticated` is reachable from anywhere
//! when the auth service reports no session.

use std::sync::Arc;
use uuid::Uuid;

use super::{Notice, Notices};
use crate::backend::{AuthService, Collaborators};
use crate::error::TodoError;
use crate::filter::{Counts, Filter};
use crate::models::{AuthUser, ItemView, Role, Viewer};
use crate::role::{RoleMode, RoleResolver};
use crate::session::{GateState, SessionGate};
use crate::store::{FetchOutcome, ItemStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    Loading,
    Ready(Viewer),
    /// Terminal; the display layer redirects to sign-in.
    Unauthenticated,
}

/// Creation form input, kept until a create succeeds so a failed attempt can be retried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: Option<String>,
}

pub struct ListScreen {
    auth: Arc<dyn AuthService>,
    gate: SessionGate,
    resolver: Option<RoleResolver>,
    store: ItemStore,
    state: ScreenState,
    filter: Filter,
    draft: Draft,
    notices: Notices,
}

impl ListScreen {
    pub fn new(ctx: &Collaborators, mode: RoleMode) -> Self {
        let resolver = match mode {
            RoleMode::Enabled => Some(RoleResolver::new(ctx.roles.clone())),
            RoleMode::Disabled => None,
        };

        Self {
            auth: ctx.auth.clone(),
            gate: SessionGate::new(ctx.auth.clone()),
            resolver,
            store: ItemStore::new(ctx.items.clone(), ctx.profiles.clone()),
            state: ScreenState::Loading,
            filter: Filter::default(),
            draft: Draft::default(),
            notices: Notices::default(),
        }
    }

    pub async fn mount(&mut self) -> &ScreenState {
        let gate_state = self.gate.mount().await.clone();
        self.settle(gate_state).await;
        &self.state
    }

    /// Wait for the next auth change and follow it. `None` once torn down.
    pub async fn handle_auth_change(&mut self) -> Option<&ScreenState> {
        let gate_state = self.gate.next_change().await?.clone();
        self.settle(gate_state).await;
        Some(&self.state)
    }

    async fn settle(&mut self, gate_state: GateState) {
        match gate_state {
            GateState::Authenticated(user) => {
                if self.viewer().map(|v| v.id) == Some(user.id) {
                    return;
                }
                self.enter(user).await;
            }
            GateState::Unauthenticated => self.leave().await,
            GateState::Pending => self.state = ScreenState::Loading,
        }
    }

    async fn enter(&mut self, user: AuthUser) {
        self.state = ScreenState::Loading;
        let role = match &self.resolver {
            Some(resolver) => resolver.resolve(user.id).await,
            None => Role::User,
        };
        let viewer = Viewer::new(&user, role);
        tracing::info!(viewer = %viewer.id, role = %viewer.role, "list screen ready");

        self.store.clear().await;
        self.state = ScreenState::Ready(viewer);
        self.refresh().await;
    }

    async fn leave(&mut self) {
        if self.state != ScreenState::Unauthenticated {
            tracing::info!("no session, redirecting to sign-in");
        }
        self.store.clear().await;
        self.draft = Draft::default();
        self.state = ScreenState::Unauthenticated;
    }

    /// Re-fetch the viewer's items. Failures leave the held list untouched.
    pub async fn refresh(&mut self) -> bool {
        let Some(viewer) = self.viewer().cloned() else {
            return false;
        };
        match self.store.fetch(&viewer).await {
            Ok(FetchOutcome::Applied { count }) => {
                tracing::debug!(count, "items refreshed");
                true
            }
            Ok(FetchOutcome::Stale) => true,
            Err(e) => {
                self.notices.push(Notice::failure("Error fetching todos", &e));
                false
            }
        }
    }

    pub async fn add(&mut self, title: &str, content: Option<&str>) -> bool {
        self.draft = Draft {
            title: title.to_string(),
            content: content.map(str::to_string),
        };
        let Some(viewer) = self.ready_viewer() else {
            return false;
        };

        match self.store.add(&viewer, title, content).await {
            Ok(()) => {
                self.draft = Draft::default();
                self.refresh().await;
                self.notices
                    .push(Notice::success("Todo added!", "Your new todo has been created."));
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Flip an item's completion. Returns the stored value on success, even if the re-fetch fails.
    pub async fn toggle(&mut self, id: Uuid) -> Option<bool> {
        self.ready_viewer()?;
        match self.store.toggle(id).await {
            Ok(completed) => {
                self.refresh().await;
                Some(completed)
            }
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    pub async fn remove(&mut self, id: Uuid) -> bool {
        if self.ready_viewer().is_none() {
            return false;
        }
        match self.store.remove(id).await {
            Ok(()) => {
                self.refresh().await;
                self.notices
                    .push(Notice::success("Note deleted", "Your note has been removed."));
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub async fn sign_out(&mut self) -> bool {
        match self.auth.sign_out().await {
            Ok(()) => {
                self.notices.push(Notice::success(
                    "Signed out",
                    "You've been successfully signed out.",
                ));
                self.leave().await;
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn teardown(&mut self) {
        self.gate.teardown();
    }

    fn ready_viewer(&mut self) -> Option<Viewer> {
        let viewer = self.viewer().cloned();
        if viewer.is_none() {
            self.report(TodoError::auth("Not signed in"));
        }
        viewer
    }

    fn report(&mut self, err: TodoError) {
        self.notices.push(Notice::failure("Error", &err));
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        match &self.state {
            ScreenState::Ready(viewer) => Some(viewer),
            _ => None,
        }
    }

    /// Whether the creation form is offered.
    pub fn can_create(&self) -> bool {
        self.viewer().map(Viewer::can_create).unwrap_or(false)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub async fn visible(&self) -> Vec<ItemView> {
        self.store.visible(self.filter).await
    }

    pub async fn counts(&self) -> Counts {
        self.store.counts().await
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}

impl Drop for ListScreen {
    fn drop(&mut self) {
        self.teardown();
    }
}

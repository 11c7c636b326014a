//! Contracts for the hosted backend.
//!
//! Auth, row storage and row-level security live outside this crate; screens only see these
//! traits, bundled as [`Collaborators`] and passed in explicitly.

pub mod events;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::TodoError;
use crate::models::{Item, NewItem, Profile, Session, SignUpOutcome};

pub use events::{AuthChange, AuthEvent, AuthEvents, AuthSubscription};

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Current session, or `None` when signed out. Absence is not an error.
    async fn get_session(&self) -> Result<Option<Session>, TodoError>;

    /// Subscribe to auth state changes published after this call.
    fn on_auth_state_change(&self) -> AuthSubscription;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, TodoError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect: Option<&str>,
    ) -> Result<SignUpOutcome, TodoError>;

    async fn sign_out(&self) -> Result<(), TodoError>;
}

/// The `todos` table. Implementations return rows newest-first.
#[async_trait]
pub trait ItemTable: Send + Sync {
    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Item>, TodoError>;

    async fn list_all(&self) -> Result<Vec<Item>, TodoError>;

    async fn insert(&self, item: &NewItem) -> Result<(), TodoError>;

    async fn set_completed(&self, id: Uuid, completed: bool) -> Result<(), TodoError>;

    async fn delete(&self, id: Uuid) -> Result<(), TodoError>;
}

/// The `user_roles` table.
#[async_trait]
pub trait RoleTable: Send + Sync {
    /// Stored role string for the user, `None` when no row exists.
    async fn find_role(&self, user_id: Uuid) -> Result<Option<String>, TodoError>;
}

/// The `profiles` table, consulted on the admin path only.
#[async_trait]
pub trait ProfileTable: Send + Sync {
    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, TodoError>;
}

/// The privileged `set-admin-role` function.
#[async_trait]
pub trait RoleAssignment: Send + Sync {
    async fn assign_admin(&self, user_id: Uuid, admin_credential: &str) -> Result<(), TodoError>;
}

/// Explicit context handed to screens in place of process-wide globals.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthService>,
    pub items: Arc<dyn ItemTable>,
    pub roles: Arc<dyn RoleTable>,
    pub profiles: Arc<dyn ProfileTable>,
    pub role_assignment: Arc<dyn RoleAssignment>,
}

impl Collaborators {
    /// Use one backend value for every collaborator.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: AuthService + ItemTable + RoleTable + ProfileTable + RoleAssignment + 'static,
    {
        Self {
            auth: backend.clone(),
            items: backend.clone(),
            roles: backend.clone(),
            profiles: backend.clone(),
            role_assignment: backend,
        }
    }
}

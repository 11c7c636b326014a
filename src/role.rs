use std::sync::Arc;
use uuid::Uuid;

use crate::backend::RoleTable;
use crate::models::Role;

/// Which screen variant is running: without a role concept, or with admin support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMode {
    Disabled,
    Enabled,
}

impl RoleMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            RoleMode::Enabled
        } else {
            RoleMode::Disabled
        }
    }
}

/// Looks up a viewer's role. Never grants more than `User` on a missing row or a failed query.
#[derive(Clone)]
pub struct RoleResolver {
    roles: Arc<dyn RoleTable>,
}

impl RoleResolver {
    pub fn new(roles: Arc<dyn RoleTable>) -> Self {
        Self { roles }
    }

    pub async fn resolve(&self, user_id: Uuid) -> Role {
        match self.roles.find_role(user_id).await {
            Ok(Some(stored)) => {
                let role = Role::from_stored(&stored);
                tracing::debug!(%user_id, %role, "resolved role");
                role
            }
            Ok(None) => Role::User,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "role lookup failed, defaulting to user");
                Role::User
            }
        }
    }
}

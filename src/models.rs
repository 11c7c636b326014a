//! Domain records shared by the store, screens and backend adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TodoError;

/// Label used when an admin sees an item whose owner has no profile row.
pub const UNKNOWN_OWNER: &str = "Unknown User";

/// A persisted todo/note row (`todos` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `todos` table.
///
/// Only constructible through [`NewItem::new`], so a blank title never reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewItem {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    user_id: Uuid,
    completed: bool,
}

impl NewItem {
    pub fn new(owner: Uuid, title: &str, content: Option<&str>) -> Result<Self, TodoError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoError::validation("Title cannot be empty"));
        }

        let content = content
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            title: title.to_string(),
            content,
            user_id: owner,
            completed: false,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn owner(&self) -> Uuid {
        self.user_id
    }
}

/// An item as presented to the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    /// Owner's display email/name; only populated on the admin path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_label: Option<String>,
}

impl ItemView {
    pub fn own(item: Item) -> Self {
        Self { item, owner_label: None }
    }

    pub fn annotated(item: Item, label: impl Into<String>) -> Self {
        Self { item, owner_label: Some(label.into()) }
    }

    pub fn id(&self) -> Uuid {
        self.item.id
    }

    pub fn completed(&self) -> bool {
        self.item.completed
    }
}

/// Capability tier of a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Parse a role string from the role table. Anything unrecognised is `User`.
    pub fn from_stored(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor with its resolved role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl Viewer {
    pub fn new(user: &AuthUser, role: Role) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role,
        }
    }

    /// Admins browse everything but do not create items.
    pub fn can_create(&self) -> bool {
        !self.role.is_admin()
    }
}

/// Display metadata row (`profiles` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Profile {
    pub fn display_label(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.full_name.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        }
    }
}

/// Result of a sign-up: a session when the project auto-confirms, otherwise just the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationPending(AuthUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpOutcome::SignedIn(session) => &session.user,
            SignUpOutcome::ConfirmationPending(user) => user,
        }
    }
}

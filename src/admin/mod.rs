//! The privileged `set-admin-role` function.
//!
//! Grants the admin role when the caller presents the shared admin credential. This is a plaintext
//! shared secret compared with `==`; it is a known weak scheme, kept as the documented contract.
//! The secret itself comes from configuration and is never logged.

pub mod error;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::error::TodoError;
use crate::models::Role;
use crate::supabase::SupabaseClient;

pub use error::ApiError;

/// Writes role rows with elevated privileges.
#[async_trait]
pub trait RoleWriter: Send + Sync {
    async fn grant_admin(&self, user_id: Uuid) -> Result<(), TodoError>;
}

#[async_trait]
impl RoleWriter for SupabaseClient {
    async fn grant_admin(&self, user_id: Uuid) -> Result<(), TodoError> {
        self.update_user_role(user_id, Role::Admin).await
    }
}

#[derive(Clone)]
pub struct AdminState {
    credential: Arc<str>,
    writer: Arc<dyn RoleWriter>,
}

impl AdminState {
    pub fn new(credential: &str, writer: Arc<dyn RoleWriter>) -> Self {
        Self {
            credential: Arc::from(credential),
            writer,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAdminRoleRequest {
    user_id: Uuid,
    #[serde(default)]
    admin_credential: Option<String>,
}

async fn set_admin_role(
    State(state): State<AdminState>,
    payload: Result<Json<SetAdminRoleRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    tracing::info!(
        user_id = %request.user_id,
        has_credential = request.admin_credential.is_some(),
        "Setting admin role request"
    );

    if request.admin_credential.as_deref() != Some(&*state.credential) {
        return Err(ApiError::forbidden("Invalid admin credential"));
    }

    if let Err(e) = state.writer.grant_admin(request.user_id).await {
        tracing::error!(user_id = %request.user_id, error = %e, "Error setting admin role");
        return Err(e.into());
    }

    tracing::info!(user_id = %request.user_id, "Admin role set successfully");
    Ok(Json(json!({
        "success": true,
        "message": "Admin role assigned successfully"
    })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/set-admin-role", post(set_admin_role))
        .with_state(state)
}

/// Router with the browser-facing layers: permissive CORS and request tracing.
pub fn app(state: AdminState) -> Router {
    router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

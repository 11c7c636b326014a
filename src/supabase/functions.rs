use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use super::{expect_success, ErrorKind, SupabaseClient};
use crate::backend::RoleAssignment;
use crate::error::TodoError;

pub const SET_ADMIN_ROLE: &str = "set-admin-role";

#[async_trait]
impl RoleAssignment for SupabaseClient {
    async fn assign_admin(&self, user_id: Uuid, admin_credential: &str) -> Result<(), TodoError> {
        let url = self.function_endpoint(SET_ADMIN_ROLE)?;
        let response = self
            .authed(Method::POST, url)
            .await
            .json(&json!({ "userId": user_id, "adminCredential": admin_credential }))
            .send()
            .await?;
        expect_success(response, ErrorKind::Query).await?;
        tracing::info!(user = %user_id, "admin role assigned");
        Ok(())
    }
}

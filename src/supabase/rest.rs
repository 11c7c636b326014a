use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{expect_success, ErrorKind, SupabaseClient};
use crate::backend::{ItemTable, ProfileTable, RoleTable};
use crate::error::TodoError;
use crate::models::{Item, NewItem, Profile, Role};

const TODOS: &str = "rest/v1/todos";
const USER_ROLES: &str = "rest/v1/user_roles";
const PROFILES: &str = "rest/v1/profiles";

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

impl SupabaseClient {
    async fn select_todos(&self, owner: Option<Uuid>) -> Result<Vec<Item>, TodoError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("user_id", eq(owner)));
        }

        let response = self
            .authed(Method::GET, self.endpoint(TODOS)?)
            .await
            .query(&query)
            .send()
            .await?;
        Ok(expect_success(response, ErrorKind::Query).await?.json().await?)
    }

    /// Overwrite a user's role row. Only meaningful on a service-role client.
    pub async fn update_user_role(&self, user_id: Uuid, role: Role) -> Result<(), TodoError> {
        let response = self
            .authed(Method::PATCH, self.endpoint(USER_ROLES)?)
            .await
            .query(&[("user_id", eq(user_id))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "role": role.as_str() }))
            .send()
            .await?;
        expect_success(response, ErrorKind::Query).await?;
        Ok(())
    }
}

#[async_trait]
impl ItemTable for SupabaseClient {
    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Item>, TodoError> {
        self.select_todos(Some(owner)).await
    }

    async fn list_all(&self) -> Result<Vec<Item>, TodoError> {
        self.select_todos(None).await
    }

    async fn insert(&self, item: &NewItem) -> Result<(), TodoError> {
        let response = self
            .authed(Method::POST, self.endpoint(TODOS)?)
            .await
            .header("Prefer", "return=minimal")
            .json(item)
            .send()
            .await?;
        expect_success(response, ErrorKind::Query).await?;
        Ok(())
    }

    async fn set_completed(&self, id: Uuid, completed: bool) -> Result<(), TodoError> {
        let response = self
            .authed(Method::PATCH, self.endpoint(TODOS)?)
            .await
            .query(&[("id", eq(id))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "completed": completed }))
            .send()
            .await?;
        expect_success(response, ErrorKind::Query).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), TodoError> {
        let response = self
            .authed(Method::DELETE, self.endpoint(TODOS)?)
            .await
            .query(&[("id", eq(id))])
            .send()
            .await?;
        expect_success(response, ErrorKind::Query).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleTable for SupabaseClient {
    async fn find_role(&self, user_id: Uuid) -> Result<Option<String>, TodoError> {
        let response = self
            .authed(Method::GET, self.endpoint(USER_ROLES)?)
            .await
            .query(&[
                ("select", "role".to_string()),
                ("user_id", eq(user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<RoleRow> = expect_success(response, ErrorKind::Query).await?.json().await?;
        Ok(rows.into_iter().next().map(|row| row.role))
    }
}

#[async_trait]
impl ProfileTable for SupabaseClient {
    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, TodoError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = user_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .authed(Method::GET, self.endpoint(PROFILES)?)
            .await
            .query(&[("select", "*".to_string()), ("id", format!("in.({})", ids))])
            .send()
            .await?;
        Ok(expect_success(response, ErrorKind::Query).await?.json().await?)
    }
}

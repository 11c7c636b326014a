//! Supabase-backed implementation of every collaborator trait.
//!
//! Auth goes to GoTrue (`/auth/v1`), tables to PostgREST (`/rest/v1`), and the role-assignment
//! function to the functions endpoint. Row-level security is enforced by the backend; this client
//! only attaches the caller's access token.

mod auth;
mod functions;
mod rest;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::backend::AuthEvents;
use crate::config::AppConfig;
use crate::error::TodoError;
use crate::models::Session;

pub use auth::token_expiry;

/// Which error family a failed response maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    Auth,
    Query,
}

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    functions_url: Url,
    api_key: String,
    session: RwLock<Option<Session>>,
    events: AuthEvents,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, TodoError> {
        let base_url = directory_url(base_url)?;
        let functions_url = base_url.join("functions/v1/")?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            functions_url,
            api_key: api_key.into(),
            session: RwLock::new(None),
            events: AuthEvents::new(),
        })
    }

    /// Client acting as the end user, keyed with the public anon key.
    pub fn from_config(config: &AppConfig) -> Result<Self, TodoError> {
        let timeout = Duration::from_secs(config.supabase.request_timeout_secs);
        Self::new(&config.supabase.url, config.supabase.anon_key.clone(), timeout)?
            .with_functions_url(&config.functions_url())
    }

    /// Privileged client keyed with the service-role key; bypasses row-level security.
    pub fn service_role(config: &AppConfig) -> Result<Self, TodoError> {
        let key = config
            .admin
            .service_role_key
            .clone()
            .ok_or_else(|| TodoError::config("SUPABASE_SERVICE_ROLE_KEY is not set"))?;
        let timeout = Duration::from_secs(config.supabase.request_timeout_secs);
        Self::new(&config.supabase.url, key, timeout)
    }

    pub fn with_functions_url(mut self, functions_url: &str) -> Result<Self, TodoError> {
        self.functions_url = directory_url(functions_url)?;
        Ok(self)
    }

    /// Adopt a previously persisted session, e.g. one the CLI saved to disk.
    pub async fn restore_session(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        self.events
            .publish(crate::backend::AuthEvent::InitialSession, Some(session));
    }

    /// The held session as-is, without any expiry handling.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url, TodoError> {
        Ok(self.base_url.join(path)?)
    }

    fn function_endpoint(&self, name: &str) -> Result<Url, TodoError> {
        Ok(self.functions_url.join(name)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, path = url.path(), "supabase request");
        self.http.request(method, url).header("apikey", &self.api_key)
    }

    /// Request carrying the user's access token, or the API key when signed out.
    async fn authed(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.api_key.clone(),
        };
        self.request(method, url).bearer_auth(bearer)
    }
}

fn directory_url(raw: &str) -> Result<Url, TodoError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) async fn expect_success(response: Response, kind: ErrorKind) -> Result<Response, TodoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::debug!(%status, %message, "supabase request failed");

    Err(match kind {
        ErrorKind::Auth => TodoError::Auth(message),
        ErrorKind::Query if status == StatusCode::UNAUTHORIZED => TodoError::Auth(message),
        ErrorKind::Query => TodoError::Query(message),
    })
}

/// Pull the human-readable message out of a GoTrue / PostgREST / function error body.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

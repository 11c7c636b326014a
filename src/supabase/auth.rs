use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{expect_success, ErrorKind, SupabaseClient};
use crate::backend::{AuthEvent, AuthService, AuthSubscription};
use crate::error::TodoError;
use crate::models::{AuthUser, Session, SignUpOutcome};

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 10;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs))
            .or_else(|| token_expiry(&self.access_token));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Read the `exp` claim of an access token.
///
/// The signature is not verified: the token is only inspected to decide when to refresh, and
/// the backend validates it on every request.
pub fn token_expiry(access_token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<ExpiryClaims>(access_token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

fn needs_refresh(session: &Session) -> bool {
    let deadline = Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS);
    match session.expires_at {
        Some(_) => session.is_expired_at(deadline),
        None => token_expiry(&session.access_token)
            .map(|exp| exp <= deadline.timestamp())
            .unwrap_or(false),
    }
}

impl SupabaseClient {
    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, TodoError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.request(Method::POST, url).json(&body).send().await?;
        let response = expect_success(response, ErrorKind::Auth).await?;
        Ok(response.json::<TokenResponse>().await?.into_session())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, TodoError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn store_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.session.write().await = session.clone();
        self.events.publish(event, session);
    }
}

#[async_trait]
impl AuthService for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, TodoError> {
        let Some(session) = self.current_session().await else {
            return Ok(None);
        };
        if !needs_refresh(&session) {
            return Ok(Some(session));
        }

        tracing::debug!(user = %session.user.id, "session expired, refreshing");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.store_session(Some(fresh.clone()), AuthEvent::TokenRefreshed)
                    .await;
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed, signing out locally");
                self.store_session(None, AuthEvent::SignedOut).await;
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, TodoError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.store_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect: Option<&str>,
    ) -> Result<SignUpOutcome, TodoError> {
        let mut url = self.endpoint("auth/v1/signup")?;
        if let Some(redirect) = redirect {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        let response = self
            .request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = expect_success(response, ErrorKind::Auth).await?.json().await?;

        // Auto-confirmed projects answer with a session; otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
            self.store_session(Some(session.clone()), AuthEvent::SignedIn)
                .await;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        let user_value = body.get("user").cloned().unwrap_or(body);
        let user: AuthUser = serde_json::from_value(user_value)?;
        Ok(SignUpOutcome::ConfirmationPending(user))
    }

    async fn sign_out(&self) -> Result<(), TodoError> {
        if self.current_session().await.is_some() {
            let url = self.endpoint("auth/v1/logout")?;
            let response = self.authed(Method::POST, url).await.send().await?;
            let status = response.status();
            let already_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !already_gone {
                expect_success(response, ErrorKind::Auth).await?;
            }
        }

        self.store_session(None, AuthEvent::SignedOut).await;
        Ok(())
    }
}

//! Sign-in / sign-up flow.

use super::{Notice, Notices};
use crate::backend::Collaborators;
use crate::error::TodoError;
use crate::models::{Session, SignUpOutcome};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Client-side settings for the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignUpSettings {
    /// Email confirmation redirect passed to the auth service.
    pub redirect: Option<String>,
    /// When set, a supplied admin credential must equal this before the role-assignment
    /// function is called. This is a plaintext shared secret and offers no real protection;
    /// the function re-checks it server-side.
    pub admin_credential: Option<String>,
}

pub struct AuthScreen {
    ctx: Collaborators,
    settings: SignUpSettings,
    notices: Notices,
}

impl AuthScreen {
    pub fn new(ctx: &Collaborators, settings: SignUpSettings) -> Self {
        Self {
            ctx: ctx.clone(),
            settings,
            notices: Notices::default(),
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Option<Session> {
        if let Err(e) = validate_credentials(email, password) {
            self.notices.push(Notice::failure("Error", &e));
            return None;
        }

        match self.ctx.auth.sign_in(email.trim(), password).await {
            Ok(session) => {
                tracing::info!(user = %session.user.id, "signed in");
                self.notices
                    .push(Notice::success("Welcome back!", "You've successfully logged in."));
                Some(session)
            }
            Err(e) => {
                self.notices.push(Notice::failure("Error", &e));
                None
            }
        }
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        admin_credential: Option<&str>,
    ) -> Option<SignUpOutcome> {
        if let Err(e) = validate_credentials(email, password) {
            self.notices.push(Notice::failure("Error", &e));
            return None;
        }

        let outcome = match self
            .ctx
            .auth
            .sign_up(email.trim(), password, self.settings.redirect.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notices.push(Notice::failure("Error", &e));
                return None;
            }
        };
        tracing::info!(user = %outcome.user().id, "account created");

        match admin_credential.filter(|c| self.credential_accepted(c)) {
            Some(credential) => self.elevate(&outcome, credential).await,
            None => self
                .notices
                .push(Notice::success("Account created!", "You can now start using the app.")),
        }

        Some(outcome)
    }

    fn credential_accepted(&self, supplied: &str) -> bool {
        if supplied.is_empty() {
            return false;
        }
        match &self.settings.admin_credential {
            Some(expected) => supplied == expected,
            None => true,
        }
    }

    async fn elevate(&mut self, outcome: &SignUpOutcome, credential: &str) {
        let user_id = outcome.user().id;
        match self.ctx.role_assignment.assign_admin(user_id, credential).await {
            Ok(()) => self.notices.push(Notice::success(
                "Admin account created!",
                "You now have admin access to view all notes.",
            )),
            Err(e) => {
                tracing::error!(user = %user_id, error = %e, "admin role assignment failed");
                self.notices.push(Notice::error(
                    "Warning",
                    "Account created but admin role assignment failed.",
                ));
            }
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), TodoError> {
    if email.trim().is_empty() {
        return Err(TodoError::validation("Email is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(TodoError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

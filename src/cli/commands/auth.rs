use clap::Subcommand;
use serde_json::json;

use super::{failure, password_or_prompt};
use crate::backend::{AuthService, Collaborators};
use crate::cli::config::{clear_session, open_client, persist_session, save_session};
use crate::cli::utils::{output_notices, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::models::{Role, SignUpOutcome};
use crate::role::{RoleMode, RoleResolver};
use crate::screen::AuthScreen;
use crate::session::{GateState, SessionGate};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Create a new account")]
    Signup {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Admin credential; grants the admin role when accepted")]
        admin_credential: Option<String>,
    },

    #[command(about = "Sign out and forget the saved session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    let client = open_client(config).await?;
    let ctx = Collaborators::from_shared(client.clone());

    match cmd {
        AuthCommands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let mut screen = AuthScreen::new(&ctx, config.sign_up_settings());
            let session = screen.sign_in(&email, &password).await;
            let notices = screen.drain_notices();

            let Some(session) = session else {
                return Err(failure(&notices));
            };
            save_session(&session)?;
            output_notices(
                &output_format,
                &notices,
                Some(json!({ "user_id": session.user.id, "email": session.user.email })),
            )
        }
        AuthCommands::Signup { email, password, admin_credential } => {
            let password = password_or_prompt(password)?;
            let mut screen = AuthScreen::new(&ctx, config.sign_up_settings());
            let outcome = screen
                .sign_up(&email, &password, admin_credential.as_deref())
                .await;
            let notices = screen.drain_notices();

            let Some(outcome) = outcome else {
                return Err(failure(&notices));
            };
            let confirmation_pending = match &outcome {
                SignUpOutcome::SignedIn(session) => {
                    save_session(session)?;
                    false
                }
                SignUpOutcome::ConfirmationPending(_) => true,
            };
            output_notices(
                &output_format,
                &notices,
                Some(json!({
                    "user_id": outcome.user().id,
                    "confirmation_pending": confirmation_pending,
                })),
            )?;
            if confirmation_pending && matches!(output_format, OutputFormat::Text) {
                println!("Check your email to confirm the account, then run `todo auth login`.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if client.current_session().await.is_none() {
                return output_success(&output_format, "Not signed in", None);
            }
            client.sign_out().await?;
            clear_session()?;
            output_success(&output_format, "You've been successfully signed out.", None)
        }
        AuthCommands::Status => {
            let mut gate = SessionGate::new(ctx.auth.clone());
            let state = gate.mount().await.clone();
            gate.teardown();
            persist_session(&client).await?;

            let GateState::Authenticated(user) = state else {
                return output_success(
                    &output_format,
                    "Not signed in",
                    Some(json!({ "authenticated": false })),
                );
            };

            let role = match config.role_mode() {
                RoleMode::Enabled => RoleResolver::new(ctx.roles.clone()).resolve(user.id).await,
                RoleMode::Disabled => Role::User,
            };
            let label = user.email.clone().unwrap_or_else(|| user.id.to_string());
            output_success(
                &output_format,
                &format!("Signed in as {} ({})", label, role),
                Some(json!({
                    "authenticated": true,
                    "user_id": user.id,
                    "email": user.email,
                    "role": role,
                })),
            )
        }
    }
}

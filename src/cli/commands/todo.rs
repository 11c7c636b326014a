use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::failure;
use crate::backend::Collaborators;
use crate::cli::config::{clear_session, open_client, persist_session};
use crate::cli::utils::{
    output_counts, output_empty_collection, output_items, output_notices, output_success,
};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::error::TodoError;
use crate::filter::Filter;
use crate::screen::{ListScreen, ScreenState};
use crate::supabase::SupabaseClient;

#[derive(Subcommand)]
pub enum TodoCommands {
    #[command(about = "List todos")]
    List {
        #[arg(long, value_enum, default_value_t = Filter::All, help = "Which todos to show")]
        filter: Filter,
    },

    #[command(about = "Add a todo")]
    Add {
        #[arg(help = "Title")]
        title: String,
        #[arg(long, help = "Optional longer text")]
        content: Option<String>,
    },

    #[command(about = "Flip a todo between active and completed")]
    Toggle {
        #[arg(help = "Todo ID")]
        id: Uuid,
    },

    #[command(about = "Delete a todo")]
    Delete {
        #[arg(help = "Todo ID")]
        id: Uuid,
    },

    #[command(about = "Show total, active, and completed counts")]
    Stats,
}

pub async fn handle(cmd: TodoCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (client, mut screen) = open_screen().await?;
    let result = run_command(cmd, &mut screen, &output_format).await;

    screen.teardown();
    persist_session(&client).await?;
    result
}

/// Mount a list screen on the saved session. Fails when there is no usable session.
async fn open_screen() -> anyhow::Result<(Arc<SupabaseClient>, ListScreen)> {
    let config = config();
    let client = open_client(config).await?;
    let ctx = Collaborators::from_shared(client.clone());

    let mut screen = ListScreen::new(&ctx, config.role_mode());
    let state = screen.mount().await.clone();
    match state {
        ScreenState::Ready(viewer) => {
            tracing::debug!(viewer = %viewer.id, role = %viewer.role, "list screen mounted");
            Ok((client, screen))
        }
        ScreenState::Unauthenticated | ScreenState::Loading => {
            clear_session()?;
            Err(TodoError::auth("Not signed in. Run `todo auth login <email>` first.").into())
        }
    }
}

async fn run_command(
    cmd: TodoCommands,
    screen: &mut ListScreen,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    // The initial fetch happens on mount; a failure there is reported like any other.
    let mounted = screen.drain_notices();
    if mounted.iter().any(|n| n.is_error()) {
        return Err(failure(&mounted));
    }

    match cmd {
        TodoCommands::List { filter } => {
            screen.set_filter(filter);
            let items = screen.visible().await;
            if items.is_empty() {
                let message = match filter {
                    Filter::All => "No todos yet".to_string(),
                    other => format!("No {} todos", other),
                };
                return output_empty_collection(output_format, "items", &message);
            }
            output_items(output_format, &items, screen.counts().await)
        }
        TodoCommands::Add { title, content } => {
            if !screen.add(&title, content.as_deref()).await {
                return Err(failure(&screen.drain_notices()));
            }
            let notices = screen.drain_notices();
            output_notices(
                output_format,
                &notices,
                Some(json!({ "counts": screen.counts().await })),
            )
        }
        TodoCommands::Toggle { id } => {
            let Some(completed) = screen.toggle(id).await else {
                return Err(failure(&screen.drain_notices()));
            };
            let message = if completed { "Marked completed" } else { "Marked active" };
            output_success(
                output_format,
                message,
                Some(json!({ "id": id, "completed": completed })),
            )
        }
        TodoCommands::Delete { id } => {
            if !screen.remove(id).await {
                return Err(failure(&screen.drain_notices()));
            }
            let notices = screen.drain_notices();
            output_notices(output_format, &notices, Some(json!({ "id": id })))
        }
        TodoCommands::Stats => output_counts(output_format, screen.counts().await),
    }
}

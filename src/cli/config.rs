use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::Session;
use crate::supabase::SupabaseClient;

const SESSION_FILE: &str = "session.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("TODO_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("todo-notes").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<Session>> {
    read_session(&get_config_dir()?)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    write_session(&get_config_dir()?, session)
}

pub fn clear_session() -> anyhow::Result<()> {
    remove_session(&get_config_dir()?)
}

fn read_session(dir: &Path) -> anyhow::Result<Option<Session>> {
    let session_file = dir.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let session: Session = serde_json::from_str(&content)?;
    Ok(Some(session))
}

fn write_session(dir: &Path, session: &Session) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(session)?;
    fs::write(dir.join(SESSION_FILE), content)?;
    Ok(())
}

fn remove_session(dir: &Path) -> anyhow::Result<()> {
    let session_file = dir.join(SESSION_FILE);
    if session_file.exists() {
        fs::remove_file(session_file)?;
    }
    Ok(())
}

/// Client for the configured project, carrying the saved session if there is one.
pub async fn open_client(config: &AppConfig) -> anyhow::Result<Arc<SupabaseClient>> {
    let client = Arc::new(SupabaseClient::from_config(config)?);
    if let Some(session) = load_session()? {
        client.restore_session(session).await;
    }
    Ok(client)
}

/// Write back whatever session the client ended up with (it may have been refreshed or dropped).
pub async fn persist_session(client: &SupabaseClient) -> anyhow::Result<()> {
    match client.current_session().await {
        Some(session) => save_session(&session),
        None => clear_session(),
    }
}

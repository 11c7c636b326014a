use std::sync::Arc;

use todo_notes::admin::{self, AdminState};
use todo_notes::supabase::SupabaseClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL, ADMIN_CREDENTIAL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = todo_notes::config::config();
    tracing::info!("Starting role-assignment function in {:?} mode", config.environment);

    let Some(credential) = config.admin.server_credential.as_deref() else {
        anyhow::bail!("ADMIN_CREDENTIAL is not set; refusing to start");
    };
    let writer = Arc::new(SupabaseClient::service_role(config)?);

    let state = AdminState::new(credential, writer);
    let app = if config.server.enable_request_logging {
        admin::app(state)
    } else {
        admin::router(state).layer(tower_http::cors::CorsLayer::permissive())
    };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("set-admin-role listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

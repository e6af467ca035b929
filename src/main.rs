use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod pipeline;
mod routes;
mod state;

use config::settings::AppConfig;
use infrastructure::storage::s3::StorageService;
use modules::job::repository::PgJobStore;
use pipeline::workspace::WorkspaceManager;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    info!("Starting transcoder service...");

    let config = AppConfig::new().map_err(|e| anyhow::anyhow!("incomplete configuration: {e}"))?;

    let db = infrastructure::db::pool::connect_to_db(&config.database_url).await?;
    let storage = StorageService::new(
        &config.minio_url,
        &config.minio_bucket,
        &config.minio_access_key,
        &config.minio_secret_key,
    )
    .await;
    let workspaces = WorkspaceManager::new(&config.workspace_root);

    let state = AppState::new(
        config.clone(),
        Arc::new(PgJobStore::new(db)),
        Arc::new(storage),
        workspaces,
    );

    let app = app::create_app(state).await;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    info!("Transcoder service running on http://0.0.0.0:{}", config.server_port);

    axum::serve(listener, app).await?;
    Ok(())
}

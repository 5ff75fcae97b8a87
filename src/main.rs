mod agent;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod service;
mod storage;

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use crate::agent::WidgetAgentService;
use crate::config::AppConfig;
use crate::db::message_repository::MessageRepository;
use crate::db::session_repository::SessionRepository;
use crate::db::widget_repository::WidgetRepository;
use crate::routes::AppState;
use crate::service::chat_service::ChatService;
use crate::service::widget_service::WidgetService;
use crate::storage::UploadStore;

const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toledoia_widget=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database connection established and migrations applied");

    // ── Dependency wiring ─────────────────────────────────────────────────────
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    let uploads = UploadStore::new(&config.upload_dir, &config.public_base_url);

    let widgets = WidgetService::new(
        WidgetRepository::new(pool.clone()),
        SessionRepository::new(pool.clone()),
        config.session_idle_timeout,
    );
    let agent = WidgetAgentService::new(&config.ollama_base_url, &config.ollama_model)?;
    let chat = ChatService::new(
        widgets.clone(),
        MessageRepository::new(pool.clone()),
        agent,
        uploads.clone(),
        config.max_upload_bytes,
    );

    spawn_idle_reaper(widgets.clone());

    let app = routes::router(
        AppState { widgets, chat, max_upload_bytes: config.max_upload_bytes },
        &uploads,
    );

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Ends idle sessions in the background so the next widget request sees `Sessão encerrada`.
fn spawn_idle_reaper(widgets: WidgetService) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(IDLE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = widgets.expire_idle_sessions().await {
                error!("Idle session sweep failed: {e}");
            }
        }
    });
}

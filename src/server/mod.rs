//! HTTP surface: upload-and-stream, download, health and language listing.

mod handlers;

use crate::config::Config;
use crate::counter::TranslationCounter;
use crate::error::Result;
use crate::notify::MilestoneNotifier;
use crate::pipeline::TranslationPipeline;
use crate::store::{MemoryStore, ResultStore};
use crate::sweeper::spawn_sweeper;
use crate::translate::Translator;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Room for multipart boundaries and the language field on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranslationPipeline>,
    pub store: Arc<dyn ResultStore>,
    pub counter: Arc<TranslationCounter>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire up store, counter, notifier and pipeline from configuration.
    pub fn from_config(config: &Config, translator: Arc<dyn Translator>) -> Self {
        let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());
        let counter = Arc::new(match config.counter_file {
            Some(ref path) => TranslationCounter::load(path),
            None => TranslationCounter::in_memory(),
        });

        let mut pipeline =
            TranslationPipeline::new(translator, store.clone(), counter.clone(), config.pipeline());
        if let Some(ref webhook) = config.discord_webhook {
            pipeline = pipeline.with_notifier(MilestoneNotifier::new(webhook.clone()));
        }

        Self {
            pipeline: Arc::new(pipeline),
            store,
            counter,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/translate", post(handlers::translate_upload))
        .route("/download/{file_id}", get(handlers::download))
        .route("/health", get(handlers::health))
        .route("/languages", get(handlers::list_languages))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server (and its expiry sweeper) until Ctrl+C.
pub async fn serve(config: &Config, translator: Arc<dyn Translator>) -> Result<()> {
    let state = AppState::from_config(config, translator);
    let sweeper = spawn_sweeper(
        state.store.clone(),
        config.sweep_interval(),
        config.retention(),
    );

    info!(
        "Starting JSON translator (total translations: {})",
        state.counter.get().await
    );

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

pub mod error;
pub mod handlers;

use crate::adapters::extractors::ExtractorRegistry;
use crate::adapters::storage::LocalStorage;
use crate::core::catalog::JsonCatalog;
use crate::core::ingest::IngestService;
use crate::domain::ports::{ConfigProvider, KeywordTagger};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of each file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body: a full batch of files at the per-file limit.
pub fn request_body_limit<C: ConfigProvider>(config: &C) -> usize {
    config
        .max_upload_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES)
        .saturating_mul(config.max_files_per_request().max(1))
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IngestService<LocalStorage>>,
    pub started: Instant,
}

impl AppState {
    /// Opens the catalog under the output directory and wires the ingest service.
    pub async fn build<C: ConfigProvider>(
        config: &C,
        tagger: Option<Arc<dyn KeywordTagger>>,
        monitor: SystemMonitor,
    ) -> Result<Self> {
        let storage = LocalStorage::new(config.output_path());
        tokio::fs::create_dir_all(storage.base_path()).await?;
        let catalog = JsonCatalog::open(storage.base_path()).await?;

        let service = IngestService::new(storage, Arc::new(catalog))
            .with_extractors(ExtractorRegistry::with_kinds(&config.accepted_kinds()))
            .with_max_upload_bytes(config.max_upload_bytes())
            .with_max_files_per_request(config.max_files_per_request())
            .with_tagger(tagger)
            .with_monitor(monitor);

        Ok(Self {
            service: Arc::new(service),
            started: Instant::now(),
        })
    }
}

pub fn router<C: ConfigProvider>(state: AppState, config: &C) -> Router {
    let body_limit = request_body_limit(config);

    let api = Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/api/files", get(handlers::list_files))
        .route("/api/files/{id}", get(handlers::get_file))
        .route("/api/keywords", post(handlers::extract_keywords))
        .route("/health", get(handlers::health));

    let app = match config.static_dir() {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.route("/", get(handlers::banner)),
    };

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("⚠️ Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("🛑 Shutdown signal received");
        })
        .await?;
    Ok(())
}

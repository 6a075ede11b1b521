//! HTTP surface of the service.
//!
//! Routes:
//! - `POST /upload`, `GET|POST /process`, `POST /api`: the pipeline
//! - `GET|POST /checkupdate`, `POST /purge`, `GET /models`, `GET /health`
//! - `GET /static/files/<job>/<file>`: published stems
//! - `GET /static/...`: optional asset directory

pub mod error;
pub mod handlers;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;
use crate::update::UpdateNotice;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The ingestion and separation pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Notice filled in by the startup update check.
    pub update_notice: UpdateNotice,
    /// Optional asset directory served under `/static`.
    pub static_dir: Option<PathBuf>,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
    /// Service startup time for uptime tracking.
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(pipeline: Pipeline, config: &ServiceConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            update_notice: UpdateNotice::new(),
            static_dir: config.static_dir.clone(),
            max_upload_bytes: config.max_upload_bytes(),
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let files_dir = state.pipeline.store().files_dir().to_path_buf();
    let mut static_routes = Router::new().nest_service("/files", ServeDir::new(files_dir));
    if let Some(ref dir) = state.static_dir {
        static_routes = static_routes.fallback_service(ServeDir::new(dir));
    }

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/process", get(handlers::process).post(handlers::process))
        .route("/api", post(handlers::api))
        .route(
            "/checkupdate",
            get(handlers::check_update).post(handlers::check_update),
        )
        .route("/purge", post(handlers::purge))
        .route("/models", get(handlers::models))
        .route("/health", get(handlers::health))
        .nest("/static", static_routes)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP handlers.
//!
//! Handlers parse the request, run the pipeline on tokio's blocking pool
//! and shape the result into an envelope. They hold no pipeline logic.

use std::fmt::Display;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, State};
use axum::{Form, Json};
use tracing::{debug, info};

use super::error::ApiResult;
use super::types::{
    ApiBody, Envelope, HealthResponse, ModelsBody, NoData, ProcessBody, ProcessForm, PurgeForm,
    UploadBody,
};
use super::AppState;
use crate::error::PipelineError;
use crate::pipeline::Upload;
use crate::types::JobId;

const UPLOAD_OK: &str = "File uploaded successfully";
const CONVERTED_NOTE: &str = ", converted to WAV";
const SEPARATION_OK: &str = "Separation completed";

/// Fields of a multipart upload the pipeline cares about.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Upload>,
    model: Option<String>,
}

fn malformed(err: impl Display) -> PipelineError {
    PipelineError::invalid_upload(format!("malformed request body: {}", err))
}

/// Reads the file in `file_field` and the optional `model` text field.
///
/// Unknown fields are skipped.
async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> Result<UploadForm, PipelineError> {
    let mut multipart = multipart.map_err(malformed)?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(name) if name == file_field => {
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let bytes = field.bytes().await.map_err(malformed)?;
                debug!(filename = %filename, bytes = bytes.len(), "received upload");
                form.file = Some(Upload::new(filename, bytes.to_vec()));
            }
            Some("model") => {
                let model = field.text().await.map_err(malformed)?;
                form.model = Some(model.trim().to_string());
            }
            _ => {}
        }
    }

    Ok(form)
}

fn require_file(form: &mut UploadForm, file_field: &str) -> Result<Upload, PipelineError> {
    form.file
        .take()
        .ok_or_else(|| PipelineError::invalid_upload(format!("missing form field {}", file_field)))
}

/// POST /upload
///
/// Stores the `audio` field as canonical audio and returns its file name.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Envelope<UploadBody>>> {
    let mut form = read_upload_form(multipart, "audio").await?;
    let upload = require_file(&mut form, "audio")?;

    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.ingest(upload)).await??;

    let msg = if outcome.job.was_converted() {
        format!("{}{}", UPLOAD_OK, CONVERTED_NOTE)
    } else {
        UPLOAD_OK.to_string()
    };
    Ok(Json(Envelope::ok(
        msg,
        UploadBody {
            data: outcome.canonical_file_name(),
        },
    )))
}

/// GET|POST /process
///
/// Separates a previously uploaded file (`wav_name`) with `model`.
pub async fn process(
    State(state): State<AppState>,
    form: Result<Form<ProcessForm>, FormRejection>,
) -> ApiResult<Json<Envelope<ProcessBody>>> {
    let Form(form) = form.map_err(malformed)?;
    let job_id = JobId::from_wav_name(&form.wav_name)?;
    let model = form.model.trim().to_string();
    info!(job_id = %job_id, model = %model, "separation requested");

    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.separate(&job_id, &model)).await??;

    let tracks = outcome.tracks;
    Ok(Json(Envelope::ok(
        SEPARATION_OK,
        ProcessBody {
            data: tracks.display_names(),
            urllist: tracks.urls(),
            dirname: tracks.output_dir.display().to_string(),
        },
    )))
}

/// POST /api
///
/// Uploads the `file` field and separates it with `model` in one request.
pub async fn api(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Envelope<ApiBody>>> {
    let mut form = read_upload_form(multipart, "file").await?;
    let upload = require_file(&mut form, "file")?;
    let model = form.model.unwrap_or_default();

    let pipeline = state.pipeline.clone();
    let outcome =
        tokio::task::spawn_blocking(move || pipeline.ingest_and_separate(upload, &model)).await??;

    Ok(Json(Envelope::ok(
        SEPARATION_OK,
        ApiBody {
            data: outcome.tracks.urls(),
            status_text: state.pipeline.display_names().status_text(),
        },
    )))
}

/// GET|POST /checkupdate
///
/// Returns the update notice found at startup, or an empty message.
pub async fn check_update(State(state): State<AppState>) -> Json<Envelope<NoData>> {
    let notice = state.update_notice.get().await.unwrap_or_default();
    Json(Envelope::ok(notice, NoData {}))
}

/// POST /purge
///
/// Removes every artifact of `wav_name` so the next upload converts again.
pub async fn purge(
    State(state): State<AppState>,
    form: Result<Form<PurgeForm>, FormRejection>,
) -> ApiResult<Json<Envelope<NoData>>> {
    let Form(form) = form.map_err(malformed)?;
    let job_id = JobId::from_wav_name(&form.wav_name)?;

    let pipeline = state.pipeline.clone();
    let id = job_id.clone();
    let removed = tokio::task::spawn_blocking(move || pipeline.purge(&id)).await??;

    let msg = if removed {
        format!("Purged {}", job_id)
    } else {
        format!("Nothing to purge for {}", job_id)
    };
    Ok(Json(Envelope::ok(msg, NoData {})))
}

/// GET /models
///
/// Lists installed separation models.
pub async fn models(State(state): State<AppState>) -> ApiResult<Json<Envelope<ModelsBody>>> {
    let registry = state.pipeline.registry().clone();
    let models = tokio::task::spawn_blocking(move || registry.installed_models()).await??;
    Ok(Json(Envelope::ok("", ModelsBody { data: models })))
}

/// GET /health
///
/// Health check endpoint for monitoring.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let summary = state.pipeline.ledger().summary();
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "vocal-split".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.startup_time.elapsed().as_secs(),
        jobs_tracked: summary.total,
        jobs_failed: summary.failed,
    })
}

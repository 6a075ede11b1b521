//! Job orchestration.
//!
//! [`Pipeline`] runs one job through its stages in a fixed order:
//!
//! ```text
//! Received -> [Converting ->] Converted -> Probing -> Separating -> Published
//!      \            \              \           \            \
//!       +------------+--------------+-----------+------------+--> Failed
//! ```
//!
//! The cache check happens once, at entry: a job whose canonical WAV already
//! exists goes straight to `Converted` without touching the transcoder.
//! Every call blocks until the job reaches a terminal state or hands back
//! its canonical file; callers on an async runtime run it on the blocking
//! pool.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::assembler::{AssembledTracks, ResultAssembler};
use super::ledger::JobLedger;
use crate::cache::ArtifactStore;
use crate::config::{JobIdentity, ServiceConfig};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::media::{DurationProber, FfmpegTranscoder, FfprobeProber, Transcoder};
use crate::separation::{ModelRegistry, SeparationRequest, Separator, SpleeterSeparator};
use crate::types::{split_filename, DisplayNames, Job, JobId, JobState, SourceKind};

/// A submitted media file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name, including the extension.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Result of [`Pipeline::ingest`].
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The job, in state `Converted`.
    pub job: Job,
    /// True if an existing canonical file was reused.
    pub cached: bool,
}

impl IngestOutcome {
    /// Returns the canonical file name clients use to request separation.
    pub fn canonical_file_name(&self) -> String {
        self.job.job_id.canonical_file_name()
    }
}

/// Result of a completed separation.
#[derive(Debug, Clone)]
pub struct SeparationOutcome {
    /// The job, in state `Published`.
    pub job: Job,
    /// Tracks found in the job's output directory.
    pub tracks: AssembledTracks,
}

/// The ingestion and separation pipeline.
///
/// Components are shared behind `Arc` so a single pipeline can serve
/// concurrent requests; each call owns its own [`Job`].
pub struct Pipeline {
    store: ArtifactStore,
    registry: ModelRegistry,
    assembler: ResultAssembler,
    transcoder: Arc<dyn Transcoder>,
    prober: Arc<dyn DurationProber>,
    separator: Arc<dyn Separator>,
    identity: JobIdentity,
    ledger: JobLedger,
}

impl Pipeline {
    /// Builds a pipeline with the ffmpeg, ffprobe and spleeter adapters
    /// named in `config`.
    ///
    /// Fails if the configured public URL cannot be parsed.
    pub fn from_config(config: &ServiceConfig, names: DisplayNames) -> Result<Self> {
        let store = ArtifactStore::from_config(config);
        let model_dir = config.effective_model_dir();
        let public_url = config.public_base_url().map_err(|e| {
            PipelineError::unexpected(format!(
                "invalid public URL {:?}: {}",
                config.effective_public_url(),
                e
            ))
        })?;
        let assembler = ResultAssembler::new(store.clone(), public_url, names)?;
        Ok(Self {
            registry: ModelRegistry::new(&model_dir),
            transcoder: Arc::new(FfmpegTranscoder::new(&config.tools.ffmpeg)),
            prober: Arc::new(FfprobeProber::new(&config.tools.ffprobe)),
            separator: Arc::new(SpleeterSeparator::new(&config.tools.separator, &model_dir)),
            identity: config.job_identity,
            ledger: JobLedger::new(),
            store,
            assembler,
        })
    }

    /// Replaces the transcoder.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Replaces the duration prober.
    pub fn with_prober(mut self, prober: Arc<dyn DurationProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Replaces the separation engine.
    pub fn with_separator(mut self, separator: Arc<dyn Separator>) -> Self {
        self.separator = separator;
        self
    }

    /// Returns the artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Returns the display-name table.
    pub fn display_names(&self) -> &DisplayNames {
        self.assembler.names()
    }

    /// Returns the record of finished and failed jobs.
    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    /// Accepts an upload and produces its canonical audio.
    ///
    /// Resubmitting an identifier whose canonical file exists never runs
    /// the transcoder again.
    pub fn ingest(&self, upload: Upload) -> Result<IngestOutcome> {
        let (mut job, kind) = self.admit(&upload)?;
        let result = self.convert_stage(&mut job, kind, &upload.bytes);
        let (job, cached) = self.settle(job, result)?;
        Ok(IngestOutcome { job, cached })
    }

    /// Separates the canonical audio of an earlier upload with `model`.
    ///
    /// Checks run in order: canonical WAV present, model installed, then
    /// probing and separation. Nothing is probed or separated for a missing
    /// model.
    pub fn separate(&self, job_id: &JobId, model: &str) -> Result<SeparationOutcome> {
        let canonical = self.store.canonical_path(job_id);
        let mut job = Job::new(job_id.clone(), None, canonical.clone());

        let result = if self.store.has_canonical(job_id) {
            job.advance(JobState::Converted)
                .and_then(|()| self.separation_stages(&mut job, model))
        } else {
            Err(PipelineError::wav_not_found(&canonical))
        };

        let (job, tracks) = self.settle(job, result)?;
        Ok(SeparationOutcome { job, tracks })
    }

    /// Ingests an upload and separates it in one call.
    pub fn ingest_and_separate(&self, upload: Upload, model: &str) -> Result<SeparationOutcome> {
        let (mut job, kind) = self.admit(&upload)?;
        let result = self
            .convert_stage(&mut job, kind, &upload.bytes)
            .and_then(|_| self.separation_stages(&mut job, model));
        let (job, tracks) = self.settle(job, result)?;
        Ok(SeparationOutcome { job, tracks })
    }

    /// Removes every artifact of `job_id`.
    ///
    /// Returns true if anything existed.
    pub fn purge(&self, job_id: &JobId) -> Result<bool> {
        let removed = self.store.purge(job_id)?;
        self.ledger.forget(job_id);
        info!(job_id = %job_id, removed, "purged job artifacts");
        Ok(removed)
    }

    /// Validates an upload and creates its job.
    ///
    /// The cache is consulted as soon as the identifier is known: when the
    /// canonical WAV already exists the returned kind is None and neither
    /// the format nor the payload is inspected. Failures here happen before
    /// a job exists, so they are not recorded.
    fn admit(&self, upload: &Upload) -> Result<(Job, Option<SourceKind>)> {
        if upload.filename.trim().is_empty() {
            return Err(PipelineError::invalid_upload("file name is empty"));
        }
        let (stem, extension) = split_filename(&upload.filename);
        let job_id = JobId::for_upload(stem, &upload.bytes, self.identity)?;
        let canonical = self.store.canonical_path(&job_id);
        let original_extension = (!extension.is_empty()).then(|| extension.clone());

        if self.store.has_canonical(&job_id) {
            let job = Job::new(job_id, original_extension, canonical);
            debug!(job_id = %job.job_id, "job received, canonical audio present");
            return Ok((job, None));
        }

        let kind = SourceKind::from_extension(&extension).ok_or_else(|| {
            let shown = if extension.is_empty() {
                upload.filename.clone()
            } else {
                extension.clone()
            };
            warn!(filename = %upload.filename, "rejected unsupported format");
            PipelineError::unsupported_format(shown)
        })?;
        if upload.bytes.is_empty() {
            return Err(PipelineError::invalid_upload(format!(
                "{} is empty",
                upload.filename
            )));
        }

        let job = Job::new(job_id, original_extension, canonical);
        debug!(job_id = %job.job_id, kind = ?kind, bytes = upload.bytes.len(), "job received");
        Ok((job, Some(kind)))
    }

    /// Brings `job` from `Received` to `Converted`.
    ///
    /// A `None` kind is a cache hit decided at admission. Returns true if an
    /// existing canonical file was reused.
    fn convert_stage(&self, job: &mut Job, kind: Option<SourceKind>, bytes: &[u8]) -> Result<bool> {
        let kind = match kind {
            Some(kind) => kind,
            None => {
                info!(job_id = %job.job_id, "canonical audio cached, skipping conversion");
                job.advance(JobState::Converted)?;
                return Ok(true);
            }
        };
        self.store.ensure_roots()?;

        let staging = self.store.staging_path(&job.job_id);
        if kind.needs_transcode() {
            job.advance(JobState::Converting)?;
            let extension = job.original_extension.as_deref().unwrap_or_default();
            let raw = self.store.upload_path(&job.job_id, extension);
            self.store.write(&raw, bytes)?;
            self.store.discard(&staging);

            debug!(job_id = %job.job_id, transcoder = self.transcoder.name(), "converting");
            let converted = self
                .transcoder
                .convert(&raw, &staging, kind.is_audio_only())
                .and_then(|()| self.verify_output(&staging));
            self.store.discard(&raw);
            if let Err(err) = converted {
                self.store.discard(&staging);
                return Err(err);
            }
        } else {
            self.store.write(&staging, bytes)?;
        }

        self.store.promote(&staging, &job.canonical_audio_path)?;
        job.advance(JobState::Converted)?;
        info!(
            job_id = %job.job_id,
            path = %job.canonical_audio_path.display(),
            converted = job.was_converted(),
            "canonical audio ready"
        );
        Ok(false)
    }

    /// Guards against transcoders that report success without output.
    fn verify_output(&self, staging: &Path) -> Result<()> {
        if self.store.size_of(staging) == 0 {
            return Err(PipelineError::transcode_failed(format!(
                "{} produced no output",
                self.transcoder.name()
            )));
        }
        Ok(())
    }

    /// Brings a `Converted` job through probing and separation to `Published`.
    fn separation_stages(&self, job: &mut Job, model: &str) -> Result<AssembledTracks> {
        job.model = Some(model.to_string());
        self.registry.ensure_installed(model)?;

        job.advance(JobState::Probing)?;
        let duration = self.prober.probe_duration(&job.canonical_audio_path);
        job.duration_seconds = Some(duration);

        job.advance(JobState::Separating)?;
        let output_dir = self.store.output_dir(&job.job_id)?;
        let stale = self.store.clear_stems(&job.job_id)?;
        if stale > 0 {
            debug!(job_id = %job.job_id, stale, "cleared stems from earlier run");
        }

        let request = SeparationRequest {
            input: job.canonical_audio_path.clone(),
            model: model.to_string(),
            output_dir,
            duration_secs: duration,
        };
        info!(
            job_id = %job.job_id,
            model,
            duration,
            separator = self.separator.name(),
            "separating"
        );
        self.separator.separate(&request)?;

        let tracks = self.assembler.assemble(&job.job_id)?;
        job.advance(JobState::Published)?;
        info!(job_id = %job.job_id, tracks = tracks.len(), "tracks published");
        Ok(tracks)
    }

    /// Records the job's final state and logs failures.
    fn settle<T>(&self, mut job: Job, result: Result<T>) -> Result<(Job, T)> {
        match result {
            Ok(value) => {
                self.ledger.record(job.clone());
                Ok((job, value))
            }
            Err(err) => {
                let stage = job.state;
                job.fail(&err);
                if err.code() == ErrorCode::Unexpected {
                    error!(job_id = %job.job_id, %stage, error = %err, "job failed unexpectedly");
                } else {
                    warn!(job_id = %job.job_id, %stage, code = %err.code(), error = %err, "job failed");
                }
                self.ledger.record(job);
                Err(err)
            }
        }
    }
}

//! Job types for tracking a submission through the pipeline.
//!
//! A [`Job`] follows one uploaded media file from receipt through
//! conversion, probing and separation, recording every state it passes
//! through and the typed cause if it fails.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::config::JobIdentity;
use crate::error::{PipelineError, Result};

/// Extension of canonical audio files, including the dot.
pub const CANONICAL_EXTENSION: &str = ".wav";

/// Containers that carry a video stream which must be dropped.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".mpeg"];

/// Containers that only carry audio.
pub const AUDIO_ONLY_EXTENSIONS: &[&str] = &[".mp3", ".flac"];

/// Maximum job identifier length in bytes.
pub const MAX_JOB_ID_LEN: usize = 200;

/// Number of hash bytes appended to content-derived identifiers.
const CONTENT_HASH_BYTES: usize = 6;

/// A sanitized job identifier.
///
/// Safe to use as a single path component: it never contains separators,
/// never equals `.` or `..`, and has no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Validates a raw identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(PipelineError::invalid_upload("file name is empty"));
        }
        if raw == "." || raw == ".." {
            return Err(PipelineError::invalid_upload(format!(
                "file name {:?} is not allowed",
                raw
            )));
        }
        if raw.len() > MAX_JOB_ID_LEN {
            return Err(PipelineError::invalid_upload(format!(
                "file name too long: {} bytes (max {})",
                raw.len(),
                MAX_JOB_ID_LEN
            )));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
        {
            return Err(PipelineError::invalid_upload(format!(
                "file name contains forbidden character {:?}",
                c
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derives the identifier for an uploaded file.
    ///
    /// With [`JobIdentity::ContentHash`] the first bytes of the payload's
    /// SHA-256 are appended, so distinct files never collide.
    pub fn for_upload(stem: &str, content: &[u8], identity: JobIdentity) -> Result<Self> {
        match identity {
            JobIdentity::Filename => Self::parse(stem),
            JobIdentity::ContentHash => {
                // Validate the stem first so the hash never masks a bad name.
                let base = Self::parse(stem)?;
                let digest = Sha256::digest(content);
                Self::parse(&format!(
                    "{}-{}",
                    base.0,
                    hex::encode(&digest[..CONTENT_HASH_BYTES])
                ))
            }
        }
    }

    /// Resolves the identifier from a canonical file name (`song.wav`).
    ///
    /// The `.wav` suffix is optional and matched case-insensitively.
    pub fn from_wav_name(name: &str) -> Result<Self> {
        let name = name.trim();
        let split = name.len().saturating_sub(CANONICAL_EXTENSION.len());
        let stem = match name.get(split..) {
            Some(suffix) if suffix.eq_ignore_ascii_case(CANONICAL_EXTENSION) => &name[..split],
            _ => name,
        };
        Self::parse(stem)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the canonical audio file name for this job (`<id>.wav`).
    pub fn canonical_file_name(&self) -> String {
        format!("{}{}", self.0, CANONICAL_EXTENSION)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Splits an uploaded file name into base name and lower-cased extension.
///
/// The extension keeps its leading dot. A leading dot alone does not start
/// an extension (`.hidden` has none), matching common shell conventions.
pub fn split_filename(filename: &str) -> (&str, String) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], filename[idx..].to_lowercase()),
        _ => (filename, String::new()),
    }
}

/// Format class of a submission, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Video-bearing container; the video stream is stripped.
    VideoContainer,
    /// Audio-only container; converted without stream stripping.
    AudioOnly,
    /// Already canonical WAV; stored without conversion.
    Canonical,
}

impl SourceKind {
    /// Classifies a lower-cased extension (with leading dot).
    ///
    /// Returns None for unsupported formats.
    pub fn from_extension(extension: &str) -> Option<Self> {
        if extension == CANONICAL_EXTENSION {
            Some(SourceKind::Canonical)
        } else if AUDIO_ONLY_EXTENSIONS.contains(&extension) {
            Some(SourceKind::AudioOnly)
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            Some(SourceKind::VideoContainer)
        } else {
            None
        }
    }

    /// Returns true if the transcoder must run for this kind.
    pub fn needs_transcode(&self) -> bool {
        !matches!(self, SourceKind::Canonical)
    }

    /// Returns true if the source carries no video stream.
    pub fn is_audio_only(&self) -> bool {
        !matches!(self, SourceKind::VideoContainer)
    }
}

/// State of a job in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submission accepted, nothing done yet.
    #[default]
    Received,
    /// Transcoder running.
    Converting,
    /// Canonical audio available (converted or cached).
    Converted,
    /// Duration prober running.
    Probing,
    /// Separation engine running.
    Separating,
    /// Tracks assembled and addressable.
    Published,
    /// A stage failed; see the job's error fields.
    Failed,
}

impl JobState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Received => "received",
            JobState::Converting => "converting",
            JobState::Converted => "converted",
            JobState::Probing => "probing",
            JobState::Separating => "separating",
            JobState::Published => "published",
            JobState::Failed => "failed",
        }
    }

    /// Returns true if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Published | JobState::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// `Received -> Converted` is the cache-hit short-circuit.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Published, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Received, Converting) | (Received, Converted) => true,
            (Converting, Converted) => true,
            (Converted, Probing) => true,
            (Probing, Separating) => true,
            (Separating, Published) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unit of work for one submitted media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Sanitized identifier namespacing all artifacts.
    pub job_id: JobId,

    /// Lower-cased extension of the submission, None when the job was
    /// resumed from an existing canonical file.
    pub original_extension: Option<String>,

    /// Location of the canonical WAV for this job.
    pub canonical_audio_path: PathBuf,

    /// Probed or defaulted duration in seconds.
    pub duration_seconds: Option<f64>,

    /// Requested separation model.
    pub model: Option<String>,

    /// Current state.
    pub state: JobState,

    /// Every state the job has been in, oldest first.
    pub history: Vec<JobState>,

    /// Error code if the job failed.
    pub error_code: Option<String>,

    /// Human-readable error message if the job failed.
    pub error_message: Option<String>,

    /// When the job was created.
    #[serde(with = "system_time_serde")]
    pub created_at: SystemTime,

    /// When the job last changed state.
    #[serde(with = "system_time_serde")]
    pub updated_at: SystemTime,
}

impl Job {
    /// Creates a job in the `Received` state.
    pub fn new(
        job_id: JobId,
        original_extension: Option<String>,
        canonical_audio_path: PathBuf,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            job_id,
            original_extension,
            canonical_audio_path,
            duration_seconds: None,
            model: None,
            state: JobState::Received,
            history: vec![JobState::Received],
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the job to `next`.
    ///
    /// Returns an UNEXPECTED error for illegal transitions; those indicate a
    /// bug in the orchestrator, not bad input.
    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::unexpected(format!(
                "illegal job transition {} -> {} for {}",
                self.state, next, self.job_id
            )));
        }
        self.state = next;
        self.history.push(next);
        self.updated_at = SystemTime::now();
        Ok(())
    }

    /// Marks the job as failed with the given error.
    ///
    /// A job that is already terminal keeps its state.
    pub fn fail(&mut self, error: &PipelineError) {
        if self.state.is_terminal() {
            return;
        }
        self.state = JobState::Failed;
        self.history.push(JobState::Failed);
        self.error_code = Some(error.code().as_str().to_string());
        self.error_message = Some(error.to_string());
        self.updated_at = SystemTime::now();
    }

    /// Returns true if the job went through the transcoder.
    pub fn was_converted(&self) -> bool {
        self.history.contains(&JobState::Converting)
    }
}

/// Custom serde implementation for SystemTime as Unix seconds.
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

//! Error types for the separation service.
//!
//! Every pipeline stage returns a typed [`PipelineError`]; the HTTP layer
//! turns it into a `{code, msg}` envelope through [`ErrorCode`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Message returned to clients for failures that are not classified.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred, please try again";

/// Error codes reported by the pipeline.
///
/// These allow clients and logs to distinguish client-input problems from
/// external tool failures without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Upload extension is not one of the recognized containers.
    /// Trigger: e.g. `.txt`, `.ogg`, or no extension at all.
    UnsupportedFormat,

    /// Upload is unusable before any tool runs.
    /// Trigger: unsafe filename, empty payload, missing form field.
    InvalidUpload,

    /// The external transcoder failed or produced no output.
    /// Trigger: corrupt media, missing ffmpeg binary.
    TranscodeFailed,

    /// Requested separation model is not installed.
    /// Trigger: `<model_dir>/<model>/model.meta` is absent.
    ModelNotFound,

    /// A separation was requested for audio that was never uploaded.
    /// Trigger: `wav_name` does not resolve to a canonical file.
    WavNotFound,

    /// The separation engine exited with an error.
    /// Trigger: engine crash, out of memory, corrupt model.
    SeparationFailed,

    /// Anything else (I/O, task join failures, illegal state transitions).
    Unexpected,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCode::InvalidUpload => "INVALID_UPLOAD",
            ErrorCode::TranscodeFailed => "TRANSCODE_FAILED",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::WavNotFound => "WAV_NOT_FOUND",
            ErrorCode::SeparationFailed => "SEPARATION_FAILED",
            ErrorCode::Unexpected => "UNEXPECTED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFormat => "Uploaded file format is not supported",
            ErrorCode::InvalidUpload => "Uploaded file cannot be accepted",
            ErrorCode::TranscodeFailed => "Media transcoder failed to produce canonical audio",
            ErrorCode::ModelNotFound => "Separation model is not installed",
            ErrorCode::WavNotFound => "Canonical audio for this job does not exist",
            ErrorCode::SeparationFailed => "Separation engine failed",
            ErrorCode::Unexpected => "Unexpected internal error",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFormat => {
                "Upload one of .wav, .mp3, .flac, .mp4, .mov, .avi, .mkv or .mpeg"
            }
            ErrorCode::InvalidUpload => {
                "Upload a non-empty file whose name has no path components"
            }
            ErrorCode::TranscodeFailed => {
                "Check that ffmpeg is installed (or set VOCAL_FFMPEG) and that the file plays"
            }
            ErrorCode::ModelNotFound => {
                "Install the model under the model directory (it must contain model.meta)"
            }
            ErrorCode::WavNotFound => "Upload the file again before requesting separation",
            ErrorCode::SeparationFailed => {
                "Check that spleeter is installed (or set VOCAL_SEPARATOR) and review the log"
            }
            ErrorCode::Unexpected => "Review the service log for the full diagnostic",
        }
    }

    /// Returns the `code` field used in JSON envelopes.
    ///
    /// `1` is a classified failure the caller can act on, `2` is unexpected.
    pub fn envelope_code(&self) -> u8 {
        match self {
            ErrorCode::Unexpected => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported format {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Transcoding failed: {diagnostic}")]
    TranscodeFailed { diagnostic: String },

    #[error("{model} model does not exist")]
    ModelNotFound { model: String },

    #[error("{} does not exist", path.display())]
    WavNotFound { path: PathBuf },

    #[error("Separation failed: {diagnostic}")]
    SeparationFailed { diagnostic: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Creates an UNSUPPORTED_FORMAT error.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        PipelineError::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Creates an INVALID_UPLOAD error.
    pub fn invalid_upload(reason: impl Into<String>) -> Self {
        PipelineError::InvalidUpload(reason.into())
    }

    /// Creates a TRANSCODE_FAILED error.
    pub fn transcode_failed(diagnostic: impl Into<String>) -> Self {
        PipelineError::TranscodeFailed {
            diagnostic: diagnostic.into(),
        }
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(model: impl Into<String>) -> Self {
        PipelineError::ModelNotFound {
            model: model.into(),
        }
    }

    /// Creates a WAV_NOT_FOUND error.
    pub fn wav_not_found(path: &Path) -> Self {
        PipelineError::WavNotFound {
            path: path.to_path_buf(),
        }
    }

    /// Creates a SEPARATION_FAILED error.
    pub fn separation_failed(diagnostic: impl Into<String>) -> Self {
        PipelineError::SeparationFailed {
            diagnostic: diagnostic.into(),
        }
    }

    /// Wraps an I/O error with the operation that failed.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates an UNEXPECTED error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        PipelineError::Unexpected(message.into())
    }

    /// Returns the code classifying this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            PipelineError::InvalidUpload(_) => ErrorCode::InvalidUpload,
            PipelineError::TranscodeFailed { .. } => ErrorCode::TranscodeFailed,
            PipelineError::ModelNotFound { .. } => ErrorCode::ModelNotFound,
            PipelineError::WavNotFound { .. } => ErrorCode::WavNotFound,
            PipelineError::SeparationFailed { .. } => ErrorCode::SeparationFailed,
            PipelineError::Io { .. } | PipelineError::Unexpected(_) => ErrorCode::Unexpected,
        }
    }

    /// Returns the message shown to clients.
    ///
    /// Unexpected failures are reduced to a generic message; the full
    /// diagnostic only goes to the log.
    pub fn client_message(&self) -> String {
        match self.code() {
            ErrorCode::Unexpected => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;

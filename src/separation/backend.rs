//! Separation backend abstraction.
//!
//! The pipeline only needs "turn this file into stems in that directory";
//! [`Separator`] is the seam where engines other than spleeter plug in.

use std::path::PathBuf;

use crate::error::Result;

/// One separation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationRequest {
    /// Canonical WAV to separate.
    pub input: PathBuf,

    /// Installed model name, e.g. "2stems".
    pub model: String,

    /// Directory receiving one `<instrument>.wav` per stem.
    pub output_dir: PathBuf,

    /// Audio length hint in seconds; the engine stops reading after it.
    pub duration_secs: f64,
}

/// Stem separation backend.
pub trait Separator: Send + Sync {
    /// Separates the request's input into stems inside its output directory.
    ///
    /// The produced stem set is discovered afterwards by listing the
    /// directory, so implementations report only success or failure.
    fn separate(&self, request: &SeparationRequest) -> Result<()>;

    /// Get the name of this separator (for logging)
    fn name(&self) -> &'static str;
}

//! Spleeter process adapter.
//!
//! Runs `spleeter separate` once per request with the model directory
//! exported as `MODEL_PATH`, so the engine never downloads models on its own.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use tracing::{debug, info};

use super::backend::{SeparationRequest, Separator};
use crate::error::{PipelineError, Result};
use crate::media::diagnostic_tail;

/// Output file pattern; one `<instrument>.wav` per stem.
const FILENAME_FORMAT: &str = "{instrument}.{codec}";

/// Separator backed by the spleeter command-line tool.
#[derive(Debug, Clone)]
pub struct SpleeterSeparator {
    program: PathBuf,
    model_dir: PathBuf,
}

impl SpleeterSeparator {
    /// Creates a separator running `program` against models in `model_dir`.
    pub fn new(program: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            model_dir: model_dir.into(),
        }
    }

    /// Builds the spleeter argument list for `request`.
    pub fn build_args(request: &SeparationRequest) -> Vec<OsString> {
        vec![
            "separate".into(),
            "-p".into(),
            format!("spleeter:{}", request.model).into(),
            "-o".into(),
            request.output_dir.as_os_str().to_owned(),
            "-f".into(),
            FILENAME_FORMAT.into(),
            "-c".into(),
            "wav".into(),
            "-d".into(),
            request.duration_secs.to_string().into(),
            request.input.as_os_str().to_owned(),
        ]
    }
}

impl Separator for SpleeterSeparator {
    fn separate(&self, request: &SeparationRequest) -> Result<()> {
        let args = Self::build_args(request);
        debug!(program = %self.program.display(), ?args, "running separator");

        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&args)
            .env("MODEL_PATH", &self.model_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                PipelineError::separation_failed(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let tail = diagnostic_tail(&output.stderr);
            let diagnostic = if tail.is_empty() {
                format!("{} exited with {}", self.program.display(), output.status)
            } else {
                tail
            };
            return Err(PipelineError::separation_failed(diagnostic));
        }

        info!(
            model = %request.model,
            output_dir = %request.output_dir.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "separation finished"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "spleeter"
    }
}

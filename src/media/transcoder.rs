//! Transcoder adapter.
//!
//! Converts uploaded media into canonical PCM WAV by running ffmpeg. Success
//! means exit status 0 *and* a non-empty output file; anything else is a
//! `TRANSCODE_FAILED` carrying the tail of ffmpeg's stderr.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::diagnostic_tail;
use crate::error::{PipelineError, Result};

/// Media transcoding backend.
pub trait Transcoder: Send + Sync {
    /// Converts `input` into canonical audio at `output`.
    ///
    /// The video stream is dropped unless `audio_only` is set.
    fn convert(&self, input: &Path, output: &Path, audio_only: bool) -> Result<()>;

    /// Get the name of this transcoder (for logging)
    fn name(&self) -> &'static str;
}

/// Transcoder backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Creates a transcoder running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Builds the ffmpeg argument list.
    ///
    /// `-nostdin` keeps ffmpeg from waiting on a terminal and `-y` allows the
    /// staging file left by an interrupted run to be overwritten.
    pub fn build_args(input: &Path, output: &Path, audio_only: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
        ];
        if !audio_only {
            args.push("-vn".into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder for FfmpegTranscoder {
    fn convert(&self, input: &Path, output: &Path, audio_only: bool) -> Result<()> {
        let args = Self::build_args(input, output, audio_only);
        debug!(program = %self.program.display(), ?args, "running transcoder");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                PipelineError::transcode_failed(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let tail = diagnostic_tail(&result.stderr);
            let diagnostic = if tail.is_empty() {
                format!("{} exited with {}", self.program.display(), result.status)
            } else {
                tail
            };
            return Err(PipelineError::transcode_failed(diagnostic));
        }

        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(PipelineError::transcode_failed(format!(
                "{} produced no output at {}",
                self.program.display(),
                output.display()
            )));
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            bytes = size,
            audio_only,
            "transcoded to canonical audio"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

//! Duration prober.
//!
//! Looks up the length of canonical audio with ffprobe. The duration is only
//! a hint for the separation engine, so probing never fails a job: any
//! problem degrades to [`DEFAULT_DURATION_SECS`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::diagnostic_tail;

/// Duration used when probing fails, in seconds.
pub const DEFAULT_DURATION_SECS: f64 = 1800.0;

/// Audio duration lookup.
pub trait DurationProber: Send + Sync {
    /// Returns the duration of `path` in seconds.
    ///
    /// Always returns a finite, positive value.
    fn probe_duration(&self, path: &Path) -> f64;

    /// Get the name of this prober (for logging)
    fn name(&self) -> &'static str;
}

/// Prober backed by the ffprobe command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
}

impl FfprobeProber {
    /// Creates a prober running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn try_probe(&self, path: &Path) -> std::result::Result<f64, String> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to start {}: {}", self.program.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                diagnostic_tail(&output.stderr)
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(&stdout).ok_or_else(|| format!("unusable duration {:?}", stdout.trim()))
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl DurationProber for FfprobeProber {
    fn probe_duration(&self, path: &Path) -> f64 {
        match self.try_probe(path) {
            Ok(duration) => {
                debug!(path = %path.display(), duration, "probed duration");
                duration
            }
            Err(reason) => {
                warn!(
                    path = %path.display(),
                    reason = %reason,
                    fallback = DEFAULT_DURATION_SECS,
                    "probe degraded"
                );
                DEFAULT_DURATION_SECS
            }
        }
    }

    fn name(&self) -> &'static str {
        "ffprobe"
    }
}

/// Parses ffprobe's bare duration output.
///
/// Returns None unless the first non-empty line is a finite number > 0.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let value: f64 = line.parse().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

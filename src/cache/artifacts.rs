//! Filesystem artifact store.
//!
//! Resolves where each job's raw upload, canonical WAV and separated stems
//! live. Every path is built from a [`JobId`], which cannot contain path
//! separators, so all artifacts stay inside the configured roots.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{PipelineError, Result};
use crate::types::{JobId, CANONICAL_EXTENSION};

/// Sub-directory of the tmp root holding in-progress conversion output.
///
/// Canonical files live directly in the tmp root, so a staging file can
/// never share a path with another job's canonical WAV.
const STAGING_DIR: &str = ".staging";

/// Artifact locations for all jobs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Raw uploads and canonical WAVs, plus the staging sub-directory.
    tmp_dir: PathBuf,
    /// One sub-directory of stems per job.
    files_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store over the given roots.
    pub fn new(tmp_dir: impl Into<PathBuf>, files_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            files_dir: files_dir.into(),
        }
    }

    /// Creates a store from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.effective_tmp_dir(), config.effective_files_dir())
    }

    /// Creates both roots and the staging directory if they do not exist.
    pub fn ensure_roots(&self) -> Result<()> {
        let staging = self.staging_dir();
        for dir in [&self.tmp_dir, &staging, &self.files_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                PipelineError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Returns the root holding uploads and canonical files.
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Returns the root holding per-job stem directories.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Returns `TMP_DIR/<job_id>.wav`.
    pub fn canonical_path(&self, job_id: &JobId) -> PathBuf {
        self.tmp_dir.join(job_id.canonical_file_name())
    }

    /// Returns `TMP_DIR/<job_id><extension>` for the raw upload.
    ///
    /// The extension must come from [`crate::types::SourceKind`] dispatch, so
    /// it is one of a fixed set of short suffixes.
    pub fn upload_path(&self, job_id: &JobId, extension: &str) -> PathBuf {
        self.tmp_dir.join(format!("{}{}", job_id, extension))
    }

    /// Returns the directory holding staging files.
    pub fn staging_dir(&self) -> PathBuf {
        self.tmp_dir.join(STAGING_DIR)
    }

    /// Returns `TMP_DIR/.staging/<job_id>.wav`, the conversion output
    /// before it is promoted.
    pub fn staging_path(&self, job_id: &JobId) -> PathBuf {
        self.staging_dir().join(job_id.canonical_file_name())
    }

    /// Returns `FILES_DIR/<job_id>` without creating it.
    pub fn output_dir_path(&self, job_id: &JobId) -> PathBuf {
        self.files_dir.join(job_id.as_str())
    }

    /// Returns `FILES_DIR/<job_id>`, creating it if absent.
    pub fn output_dir(&self, job_id: &JobId) -> Result<PathBuf> {
        let dir = self.output_dir_path(job_id);
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::io(format!("creating output directory {}", dir.display()), e)
        })?;
        Ok(dir)
    }

    /// Returns true if `path` exists.
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Returns the size of `path` in bytes, or 0 if it cannot be read.
    pub fn size_of(&self, path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    /// Returns true if the job's canonical WAV exists and is non-empty.
    ///
    /// This is the idempotency check: a valid canonical file is never
    /// converted again.
    pub fn has_canonical(&self, job_id: &JobId) -> bool {
        let path = self.canonical_path(job_id);
        path.is_file() && self.size_of(&path) > 0
    }

    /// Writes `bytes` to `path`.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes)
            .map_err(|e| PipelineError::io(format!("writing {}", path.display()), e))
    }

    /// Moves a finished staging file into its canonical location.
    pub fn promote(&self, staging: &Path, canonical: &Path) -> Result<()> {
        fs::rename(staging, canonical).map_err(|e| {
            PipelineError::io(
                format!("moving {} to {}", staging.display(), canonical.display()),
                e,
            )
        })
    }

    /// Removes a file, ignoring a missing one.
    ///
    /// Failures are logged and otherwise ignored; leftovers of transient
    /// files never affect job outcomes.
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed transient artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove artifact"),
        }
    }

    /// Removes stem files left in the job's output directory by an earlier run.
    ///
    /// Returns the number of files removed.
    pub fn clear_stems(&self, job_id: &JobId) -> Result<usize> {
        let dir = self.output_dir_path(job_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(PipelineError::io(
                    format!("listing {}", dir.display()),
                    e,
                ))
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry
                .map_err(|e| PipelineError::io(format!("listing {}", dir.display()), e))?;
            let path = entry.path();
            let is_stem = path.is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.ends_with(CANONICAL_EXTENSION))
                    .unwrap_or(false);
            if is_stem {
                fs::remove_file(&path)
                    .map_err(|e| PipelineError::io(format!("removing {}", path.display()), e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes every artifact of a job so the next submission starts fresh.
    ///
    /// Returns true if anything was removed.
    pub fn purge(&self, job_id: &JobId) -> Result<bool> {
        let mut removed = false;

        for path in [self.canonical_path(job_id), self.staging_path(job_id)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(PipelineError::io(format!("removing {}", path.display()), e))
                }
            }
        }

        let dir = self.output_dir_path(job_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PipelineError::io(format!("removing {}", dir.display()), e)),
        }

        Ok(removed)
    }
}

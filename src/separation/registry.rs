//! Installed separation models.
//!
//! A model is installed when `<model_dir>/<model>/model.meta` exists. The
//! registry only checks presence; loading is the engine's business.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Marker file whose presence means a model is installed.
pub const MODEL_MARKER: &str = "model.meta";

/// Lookup of models installed under a single directory.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    model_dir: PathBuf,
}

impl ModelRegistry {
    /// Creates a registry over `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Returns the directory holding the models.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Returns the marker path for `model`, or None if the name could
    /// escape the model directory.
    pub fn marker_path(&self, model: &str) -> Option<PathBuf> {
        if !is_valid_model_name(model) {
            return None;
        }
        Some(self.model_dir.join(model).join(MODEL_MARKER))
    }

    /// Returns true if `model` is installed.
    pub fn is_installed(&self, model: &str) -> bool {
        self.marker_path(model)
            .map(|marker| marker.is_file())
            .unwrap_or(false)
    }

    /// Fails with MODEL_NOT_FOUND unless `model` is installed.
    pub fn ensure_installed(&self, model: &str) -> Result<()> {
        if self.is_installed(model) {
            Ok(())
        } else {
            debug!(model, model_dir = %self.model_dir.display(), "model marker missing");
            Err(PipelineError::model_not_found(model))
        }
    }

    /// Lists installed models, sorted by name.
    ///
    /// A missing model directory means nothing is installed.
    pub fn installed_models(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.model_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PipelineError::io(
                    format!("listing models in {}", self.model_dir.display()),
                    e,
                ))
            }
        };

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PipelineError::io(
                    format!("listing models in {}", self.model_dir.display()),
                    e,
                )
            })?;
            if let Some(name) = entry.file_name().to_str() {
                if self.is_installed(name) {
                    models.push(name.to_string());
                }
            }
        }
        models.sort();
        Ok(models)
    }
}

/// Model names are single path components without control characters.
fn is_valid_model_name(model: &str) -> bool {
    !model.trim().is_empty()
        && model != "."
        && model != ".."
        && !model
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

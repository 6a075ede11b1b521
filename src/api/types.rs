//! Request and response bodies for the HTTP surface.
//!
//! Every pipeline endpoint answers with an envelope `{code, msg, ...}`:
//! `code` is 0 on success, 1 for a classified failure and 2 for an
//! unexpected one. Endpoint-specific fields are flattened next to them and
//! omitted on failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Envelope `code` for success.
pub const CODE_OK: u8 = 0;

/// JSON envelope returned by every pipeline endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u8,
    pub msg: String,
    #[serde(flatten)]
    pub body: Option<T>,
}

impl<T> Envelope<T> {
    /// Creates a success envelope.
    pub fn ok(msg: impl Into<String>, body: T) -> Self {
        Self {
            code: CODE_OK,
            msg: msg.into(),
            body: Some(body),
        }
    }

    /// Creates a failure envelope for `error`.
    pub fn failure(error: &PipelineError) -> Self {
        Self::from_parts(error.code().envelope_code(), error.client_message())
    }

    /// Creates a body-less envelope.
    pub fn from_parts(code: u8, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            body: None,
        }
    }
}

/// Body for responses that carry only `code` and `msg`.
#[derive(Debug, Default, Serialize)]
pub struct NoData {}

/// `/upload` success body.
#[derive(Debug, Serialize)]
pub struct UploadBody {
    /// Canonical file name to pass as `wav_name` to `/process`.
    pub data: String,
}

/// `/process` success body.
#[derive(Debug, Serialize)]
pub struct ProcessBody {
    /// Display labels, index-aligned with `urllist`.
    pub data: Vec<String>,
    /// Track URLs.
    pub urllist: Vec<String>,
    /// Output directory of the job.
    pub dirname: String,
}

/// `/api` success body.
#[derive(Debug, Serialize)]
pub struct ApiBody {
    /// Track URLs.
    pub data: Vec<String>,
    /// `<instrument>.wav` to label map for the standard stems.
    pub status_text: BTreeMap<String, String>,
}

/// `/models` success body.
#[derive(Debug, Serialize)]
pub struct ModelsBody {
    pub data: Vec<String>,
}

/// `/process` form fields.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessForm {
    #[serde(default)]
    pub wav_name: String,
    #[serde(default)]
    pub model: String,
}

/// `/purge` form fields.
#[derive(Debug, Default, Deserialize)]
pub struct PurgeForm {
    #[serde(default)]
    pub wav_name: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("vocal-split")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Jobs recorded since startup
    pub jobs_tracked: usize,
    /// Recorded jobs whose last run failed
    pub jobs_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_flattens_body() {
        let envelope = Envelope::ok(
            "File uploaded successfully",
            UploadBody {
                data: "song.wav".to_string(),
            },
        );
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"code": 0, "msg": "File uploaded successfully", "data": "song.wav"})
        );
    }

    #[test]
    fn failure_envelope_has_no_body() {
        let envelope: Envelope<ProcessBody> =
            Envelope::failure(&PipelineError::model_not_found("nonexistent_model"));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"code": 1, "msg": "nonexistent_model model does not exist"})
        );
    }

    #[test]
    fn unexpected_failure_is_generic() {
        let envelope: Envelope<NoData> =
            Envelope::failure(&PipelineError::unexpected("join error: panicked"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["code"], 2);
        assert_eq!(value["msg"], crate::error::GENERIC_FAILURE_MESSAGE);
    }
}

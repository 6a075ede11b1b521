//! Error type for HTTP handlers.
//!
//! Handlers fail with [`ApiError`]; it always renders as a 200 response
//! carrying a `{code, msg}` envelope, which is what clients branch on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

use super::types::{Envelope, NoData};
use crate::error::{ErrorCode, PipelineError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// A pipeline stage or request validation failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The blocking worker running the pipeline panicked or was cancelled.
    #[error("pipeline worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// Returns the code classifying this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Pipeline(err) => err.code(),
            ApiError::Worker(_) => ErrorCode::Unexpected,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        if code == ErrorCode::Unexpected {
            error!(error = %self, "request failed unexpectedly");
        } else {
            debug!(%code, error = %self, "request rejected");
        }

        let envelope: Envelope<NoData> = match self {
            ApiError::Pipeline(ref err) => Envelope::failure(err),
            ApiError::Worker(ref err) => {
                Envelope::failure(&PipelineError::unexpected(err.to_string()))
            }
        };

        (StatusCode::OK, Json(envelope)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GENERIC_FAILURE_MESSAGE;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn code_follows_pipeline_error() {
        let err = ApiError::from(PipelineError::model_not_found("5stems"));
        assert_eq!(err.code(), ErrorCode::ModelNotFound);
    }

    #[tokio::test]
    async fn classified_failure_keeps_message() {
        let json = render(PipelineError::model_not_found("5stems").into()).await;
        assert_eq!(json["code"], 1);
        assert_eq!(json["msg"], "5stems model does not exist");
    }

    #[tokio::test]
    async fn worker_failure_is_unexpected() {
        let join_err = tokio::spawn(async { panic!("worker exploded") })
            .await
            .unwrap_err();
        let err = ApiError::from(join_err);
        assert_eq!(err.code(), ErrorCode::Unexpected);

        let json = render(err).await;
        assert_eq!(json["code"], 2);
        assert_eq!(json["msg"], GENERIC_FAILURE_MESSAGE);
    }
}

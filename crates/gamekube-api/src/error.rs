//! HTTP mapping of provisioning failures

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gamekube_provisioner::{FailureReport, ProvisionError, Stage};

/// Error returned by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be decoded into attributes
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The pipeline failed in `stage`
    #[error("{stage}: {error}")]
    Provision {
        /// Stage that was running
        stage: Stage,
        /// Why it failed
        error: ProvisionError,
    },
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Provision { error, .. } => status_for(error),
        }
    }

    fn report(&self) -> FailureReport {
        match self {
            ApiError::InvalidBody(_) => FailureReport {
                stage: Stage::Validating,
                kind: "ValidationError",
                error: self.to_string(),
            },
            ApiError::Provision { stage, error } => FailureReport::new(*stage, error),
        }
    }
}

/// Status code for a provisioning error
///
/// Caller mistakes are 400, an abandoned request is 504, everything else is 500.
pub fn status_for(error: &ProvisionError) -> StatusCode {
    match error {
        ProvisionError::Cancelled | ProvisionError::DeadlineExceeded { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.report())).into_response()
    }
}

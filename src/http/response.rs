//! Mapping of pipeline results to HTTP responses.
//!
//! # Status Codes
//! - `validation` → 400
//! - `identity` → 500
//! - `connection` → 502
//! - `simulation_rejected` → 422
//! - `submission_rejected` → 409 when definitively rejected, otherwise 502
//! - `confirmation_timeout` → 504
//! - `node_internal` → 502
//!
//! Error bodies are `{ "error": kind, "message": text, "retry_safe": bool }`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chain::messages::ValidationError;
use crate::chain::types::ChainError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retry_safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// A [`ChainError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ChainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }

    fn body(&self) -> ErrorBody {
        let transaction_id = match &self.0 {
            ChainError::ConfirmationTimeout { hash, .. } => Some(hash.clone()),
            _ => None,
        };
        ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
            retry_safe: self.0.is_retry_safe(),
            transaction_id,
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ValidationError::MalformedRequest(rejection.body_text()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

pub fn status_for(error: &ChainError) -> StatusCode {
    match error {
        ChainError::Validation(_) => StatusCode::BAD_REQUEST,
        ChainError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ChainError::Connection(_) => StatusCode::BAD_GATEWAY,
        ChainError::SimulationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ChainError::SubmissionRejected {
            outcome_unknown: false,
            ..
        } => StatusCode::CONFLICT,
        ChainError::SubmissionRejected { .. } => StatusCode::BAD_GATEWAY,
        ChainError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ChainError::NodeInternal(_) => StatusCode::BAD_GATEWAY,
    }
}

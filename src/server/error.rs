//! API error responses.
//!
//! API endpoints always fail with a structured `{ok:false, message}` body;
//! page routes fail with a plain status code. Store failures map to a
//! generic unavailable response — backend detail stays in the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::{SequencerError, StoreError};

/// Failure outcomes of the JSON API endpoints.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    Validation(String),
    StoreUnavailable,
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
        };

        (status, Json(ErrorResponse { ok: false, message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store failure");
        ApiError::StoreUnavailable
    }
}

impl From<SequencerError> for ApiError {
    fn from(err: SequencerError) -> Self {
        match err {
            SequencerError::Unauthorized => {
                ApiError::Unauthorized("Sign in to continue".to_string())
            }
            SequencerError::UnknownStep(slug) => {
                ApiError::NotFound(format!("Unknown step: {slug}"))
            }
            SequencerError::Store(e) => e.into(),
        }
    }
}

/// Failure outcome of the HTML page routes: a bare status code.
#[derive(Debug)]
pub struct PageError(pub StatusCode);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<StoreError> for PageError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store failure");
        PageError(StatusCode::SERVICE_UNAVAILABLE)
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use quill_types::api::ValidationResult;

/// Per-request error taxonomy. Nothing here is fatal to the process: every
/// variant renders as a response and the next request starts clean.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Form input failed validation; the client re-renders the form with
    /// the field-scoped messages, so this is a 200 like any other render.
    #[error("validation failed")]
    Validation(ValidationResult),

    /// Login failed. One generic message, whichever credential was wrong.
    #[error("invalid credentials")]
    BadCredentials,

    /// Missing entity and ownership mismatch are deliberately
    /// indistinguishable: both are a bare 404.
    #[error("not found")]
    AccessDenied,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(result) => (
                StatusCode::OK,
                Json(json!({ "errors": result.errors_by_field })),
            )
                .into_response(),
            ApiError::BadCredentials => (
                StatusCode::OK,
                Json(json!({
                    "errors": { "login": "The password and/or username do not match." }
                })),
            )
                .into_response(),
            ApiError::AccessDenied => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

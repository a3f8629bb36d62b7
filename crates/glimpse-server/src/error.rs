use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use glimpse_core::error::ValidationError;

/// Application-level errors that map directly to HTTP responses.
///
/// Both variants render the `{ "success": false, "error": "<message>" }`
/// envelope so clients only have to handle one shape.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller-correctable input problem; the message is safe to surface.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage or other infrastructure failure. Details are logged, never
    /// returned to the client.
    #[error("internal error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Storage(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}

//! Error types for the scenario API server.
//!
//! [`ApiError`] wraps the core [`ScenarioError`] taxonomy and converts it
//! into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portcon_core::ScenarioError;

/// Errors that can occur in the scenario API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A scenario operation failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Scenario(err) => match err {
                ScenarioError::AlreadyExists(_) => StatusCode::CONFLICT,
                ScenarioError::NotFound(_) => StatusCode::NOT_FOUND,
                ScenarioError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                ScenarioError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ScenarioError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
                ScenarioError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Scenario(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Scenario request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

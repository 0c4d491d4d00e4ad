//! HTTP error mapping for the relay
//!
//! Configuration and upstream detail is logged server-side only; response
//! bodies for 5xx failures carry fixed generic text so internal failures
//! and credentials never leak to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use muse_core::wire::ErrorBody;
use muse_core::MuseError;

/// Wrapper giving `MuseError` an HTTP rendering
#[derive(Debug)]
pub struct ApiError(pub MuseError);

impl From<MuseError> for ApiError {
    fn from(error: MuseError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MuseError::Validation(_) => StatusCode::BAD_REQUEST,
            MuseError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            MuseError::Validation(details) => {
                warn!("rejected chat request: {}", details);
                ErrorBody::validation(details.clone())
            }
            MuseError::Config(detail) => {
                error!("configuration error: {}", detail);
                ErrorBody::server(
                    "configuration_error",
                    "The assistant is not configured correctly. Please contact the operator.",
                )
            }
            MuseError::Upstream(detail) => {
                error!("upstream failure: {}", detail);
                ErrorBody::server(
                    "upstream_error",
                    "The assistant service is currently unavailable. Please try again later.",
                )
            }
            other => {
                error!("internal error: {}", other);
                ErrorBody::server("internal_error", "An unexpected error occurred.")
            }
        };
        (status, Json(body)).into_response()
    }
}

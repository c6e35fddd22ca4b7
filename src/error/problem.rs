//! RFC 7807 problem responses.
//!
//! Every failure that crosses the HTTP boundary is rendered as a problem
//! object carrying a machine-readable `code` and the request's trace id.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::PortalError;

const ERROR_TYPE_BASE: &str = "https://api.portal.example.com/errors";

/// An RFC 7807 problem details body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Problem type URI, derived from `code`.
    #[serde(rename = "type")]
    pub type_uri: String,
    /// Human-readable status title.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Stable machine-readable code, e.g. `invalid_token`.
    pub code: String,
    /// Safe-to-expose detail message.
    pub detail: String,
    /// Trace id of the request that produced this problem.
    #[serde(rename = "traceId")]
    pub trace_id: String,
}

impl Problem {
    pub fn new(status: StatusCode, code: &str, detail: &str, trace_id: &str) -> Self {
        Self {
            type_uri: format!("{ERROR_TYPE_BASE}/{}", code.to_lowercase()),
            title: status_title(status).to_string(),
            status: status.as_u16(),
            code: code.to_string(),
            detail: detail.to_string(),
            trace_id: trace_id.to_string(),
        }
    }

    /// Render a `PortalError` for the HTTP layer.
    ///
    /// Only the generic status-derived code and message cross the boundary;
    /// internal detail stays in the logs.
    pub fn from_error(error: &PortalError, trace_id: &str) -> Self {
        let status = error.status_code();
        let (code, detail) = match error {
            PortalError::SecretUnavailable { .. } => {
                ("service_unavailable", "Token service unavailable")
            }
            PortalError::InvalidObjectPath { .. } => ("invalid_object_path", "Invalid object path"),
            PortalError::Config { .. } => ("invalid_request", "Invalid request"),
            _ => ("internal_error", "Internal server error"),
        };
        Self::new(status, code, detail, trace_id)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn status_title(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::UNPROCESSABLE_ENTITY => "Validation Error",
        StatusCode::TOO_MANY_REQUESTS => "Too Many Requests",
        StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Unknown Error",
    }
}

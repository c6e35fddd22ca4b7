//! Authentication types shared across the bearer protocol.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::token::TokenEnv;

/// Tenant identity attached to a request after successful authentication.
///
/// Request-scoped: created by the bearer protocol, dropped at end of
/// request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub client_id: String,
    pub api_key_id: Uuid,
    pub token_env: TokenEnv,
    pub public_id: String,
}

/// Terminal failure states of the bearer authentication state machine.
///
/// Key-not-found and hash-mismatch share a single generic variant so the
/// response never becomes an existence oracle; format and environment
/// failures carry no key information and may be distinct.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("bearer token required")]
    MissingToken,

    #[error("malformed authorization header or token")]
    InvalidTokenFormat,

    #[error("token was issued for a different environment")]
    WrongEnvironmentToken,

    /// Covers both "no such key" and "secret does not verify".
    #[error("invalid or revoked API key")]
    InvalidToken,

    /// A dependency (key store, secret store) failed. Fails closed.
    #[error("authentication service error")]
    ServiceError,
}

impl AuthFailure {
    /// Stable machine-readable problem code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidTokenFormat => "invalid_token_format",
            Self::WrongEnvironmentToken => "wrong_environment_token",
            Self::InvalidToken => "invalid_token",
            Self::ServiceError => "internal_error",
        }
    }

    /// Safe-to-expose detail string.
    pub fn detail(&self) -> &'static str {
        match self {
            Self::MissingToken => "Bearer token required",
            Self::InvalidTokenFormat => "Invalid token format",
            Self::WrongEnvironmentToken => "Wrong token environment",
            Self::InvalidToken => "Invalid or revoked API key",
            Self::ServiceError => "Authentication service error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ServiceError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

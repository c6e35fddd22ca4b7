//! Application error type definitions.

use axum::http::StatusCode;
use thiserror::Error;

use super::ErrorCategory;

/// The primary error type for the portal service.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Configuration loading or validation failed.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The API-key store failed or returned an unusable response.
    #[error("key store error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A named secret could not be resolved from the secret store.
    ///
    /// There is deliberately no fallback value: serving traffic with a wrong
    /// or absent pepper is worse than refusing service.
    #[error("secret '{name}' unavailable: {message}")]
    SecretUnavailable { name: String, message: String },

    /// Token generation or hashing failed.
    #[error("token material error: {message}")]
    TokenMaterial {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// An object path failed validation before signing.
    #[error("invalid object path: {message}")]
    InvalidObjectPath { message: String },

    /// The store violated one of its own contracts (e.g. two active keys for
    /// one public id, or a half-applied rotation). Fatal, alert-worthy.
    #[error("store invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Internal error that does not fit any other category.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO failure.
    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// An error wrapped with additional context.
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<PortalError>,
    },
}

impl PortalError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn secret_unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SecretUnavailable {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn token_material(message: impl Into<String>) -> Self {
        Self::TokenMaterial {
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_object_path(message: impl Into<String>) -> Self {
        Self::InvalidObjectPath {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// The HTTP status this error maps to when it crosses the HTTP boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. } | Self::InvalidObjectPath { .. } => StatusCode::BAD_REQUEST,
            Self::SecretUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database { .. }
            | Self::TokenMaterial { .. }
            | Self::InvariantViolation { .. }
            | Self::Internal { .. }
            | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Context { source, .. } => source.status_code(),
        }
    }

    /// Coarse client/server split for monitoring.
    pub fn category(&self) -> ErrorCategory {
        if self.status_code().is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }
}

impl From<std::io::Error> for PortalError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source,
        }
    }
}

impl From<toml::de::Error> for PortalError {
    fn from(source: toml::de::Error) -> Self {
        Self::config_with_source("failed to parse configuration file", source)
    }
}

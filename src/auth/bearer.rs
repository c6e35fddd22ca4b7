//! The bearer authentication protocol.
//!
//! Per-request state machine over the token codec, the hashing engine, the
//! secret provider and the key store. Check ordering is deliberate: cheap
//! syntactic checks (header shape, token format, environment) run before
//! any store I/O or hashing, so malformed requests cost nothing and the
//! format/environment paths return before a database round trip could leak
//! whether a public id exists.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::auth::hashing::TokenHasher;
use crate::auth::token::{Token, TokenEnv};
use crate::auth::types::{AuthFailure, RequestContext};
use crate::secrets::SecretProvider;
use crate::store::{ApiKeyStore, LastUsedTracker};

static BEARER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Bearer\s+(.+)$").expect("bearer regex is valid"));

/// The request gate: authenticates an `Authorization` header value into a
/// [`RequestContext`] or a terminal [`AuthFailure`].
pub struct BearerAuthenticator {
    store: Arc<dyn ApiKeyStore>,
    secrets: Arc<dyn SecretProvider>,
    hasher: TokenHasher,
    required_env: TokenEnv,
    last_used: LastUsedTracker,
}

impl BearerAuthenticator {
    pub fn new(
        store: Arc<dyn ApiKeyStore>,
        secrets: Arc<dyn SecretProvider>,
        required_env: TokenEnv,
    ) -> Self {
        let last_used = LastUsedTracker::new(Arc::clone(&store));
        Self {
            store,
            secrets,
            hasher: TokenHasher::new(),
            required_env,
            last_used,
        }
    }

    /// Run the full authentication state machine for one request.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        trace_id: &str,
    ) -> Result<RequestContext, AuthFailure> {
        let Some(header) = authorization else {
            tracing::warn!(trace_id, "missing authorization header");
            return Err(AuthFailure::MissingToken);
        };

        let Some(captures) = BEARER_HEADER.captures(header) else {
            tracing::warn!(trace_id, "malformed authorization header");
            return Err(AuthFailure::InvalidTokenFormat);
        };
        let plaintext = &captures[1];

        let parsed = Token::parse(plaintext).map_err(|_| {
            tracing::warn!(trace_id, "token failed format validation");
            AuthFailure::InvalidTokenFormat
        })?;

        if parsed.env != self.required_env {
            tracing::warn!(
                trace_id,
                required = %self.required_env,
                provided = %parsed.env,
                "wrong token environment"
            );
            return Err(AuthFailure::WrongEnvironmentToken);
        }

        // First I/O: the store-backed lookup is the authoritative check —
        // a forged but well-formed token dies here.
        let record = self
            .store
            .find_active_by_public_id(&parsed.public_id, parsed.env)
            .await
            .map_err(|error| {
                tracing::error!(trace_id, %error, "key store error during lookup");
                AuthFailure::ServiceError
            })?;

        let Some(record) = record else {
            tracing::warn!(trace_id, public_id = %parsed.public_id, "api key not found or inactive");
            return Err(AuthFailure::InvalidToken);
        };

        // Pepper failure fails closed: refusing service beats verifying
        // against the wrong pepper.
        let pepper = self
            .secrets
            .get_secret(&record.hash_salt_id)
            .await
            .map_err(|error| {
                tracing::error!(trace_id, %error, "pepper unavailable during verification");
                AuthFailure::ServiceError
            })?;

        if !self.hasher.verify(plaintext, &record.hash, &pepper) {
            tracing::warn!(trace_id, public_id = %parsed.public_id, "token hash mismatch");
            return Err(AuthFailure::InvalidToken);
        }

        self.last_used.schedule(record.id);

        tracing::info!(
            trace_id,
            public_id = %parsed.public_id,
            client_id = %record.client_id,
            env = %record.token_env,
            "bearer authentication successful"
        );

        Ok(RequestContext {
            client_id: record.client_id,
            api_key_id: record.id,
            token_env: record.token_env,
            public_id: parsed.public_id,
        })
    }

    /// Expose the required environment, e.g. for health/diagnostics output.
    pub fn required_env(&self) -> TokenEnv {
        self.required_env
    }
}

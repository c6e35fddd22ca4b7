//! Secret resolution.
//!
//! The hashing engine and the URL signer need server-held secrets (the
//! token pepper, the storage signing key). Providers are constructed
//! explicitly and injected, so tests can substitute a fake without
//! process-wide side effects. Fetch failures fail the call: there is no
//! fallback to a default value.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::{PortalError, Result};

/// Name of the pepper secret used for API-token hashing. The `kv:` scheme
/// marks a managed-store secret; it is also persisted per key record as
/// `hash_salt_id` so future pepper rotations can coexist.
pub const PEPPER_SECRET_NAME: &str = "kv:API_TOKEN_PEPPER_v1";

/// Name of the HMAC key used for signed file URLs.
pub const STORAGE_SIGNING_SECRET_NAME: &str = "kv:STORAGE_SIGNING_KEY_v1";

/// How long resolved secrets may be served from cache.
pub const SECRET_CACHE_TTL: Duration = Duration::from_secs(300);

/// A named-secret resolver over a managed secret store.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Resolve a secret by name, e.g. `kv:API_TOKEN_PEPPER_v1`.
    ///
    /// Returns `SecretUnavailable` when the secret cannot be fetched.
    async fn get_secret(&self, name: &str) -> Result<String>;
}

/// Environment-variable-backed resolver for non-production configurations.
///
/// `kv:<NAME>` resolves to the `<NAME>` environment variable; an unset or
/// empty variable is `SecretUnavailable`, never a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<String> {
        let var = name.strip_prefix("kv:").unwrap_or(name);
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) => Err(PortalError::secret_unavailable(
                name,
                "environment variable is empty",
            )),
            Err(_) => Err(PortalError::secret_unavailable(
                name,
                format!("environment variable {var} is not set"),
            )),
        }
    }
}

/// TTL cache in front of any provider.
///
/// Entries are immutable once cached and replaced wholesale on refresh;
/// fetch errors are propagated and never cached, so a recovering backend
/// is retried on the next call.
pub struct CachedSecretProvider {
    inner: Arc<dyn SecretProvider>,
    cache: Cache<String, String>,
}

impl CachedSecretProvider {
    pub fn new(inner: Arc<dyn SecretProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
        }
    }

    pub fn with_default_ttl(inner: Arc<dyn SecretProvider>) -> Self {
        Self::new(inner, SECRET_CACHE_TTL)
    }
}

#[async_trait]
impl SecretProvider for CachedSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let key = name.to_string();

        self.cache
            .try_get_with(key.clone(), async move { inner.get_secret(&key).await })
            .await
            .map_err(|e: Arc<PortalError>| {
                PortalError::secret_unavailable(name, e.to_string())
            })
    }
}

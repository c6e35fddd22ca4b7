//! API-key store boundary.
//!
//! The persistent key relation is an external collaborator: this module
//! owns the record types and the store contract, not a schema. A SQL- or
//! RPC-backed implementation plugs in behind [`ApiKeyStore`]; the crate
//! ships [`memory::InMemoryApiKeyStore`] for the binary and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::token::TokenEnv;
use crate::error::Result;

pub mod last_used;
pub mod memory;

pub use last_used::LastUsedTracker;
pub use memory::InMemoryApiKeyStore;

/// Lifecycle status of a stored key. Records are never deleted: revocation
/// flips the status, preserving the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Revoked,
}

/// A persisted API key. The plaintext secret never appears here; only the
/// Argon2id digest and the metadata needed to verify and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    /// Tenant identity the key belongs to.
    pub client_id: String,
    pub label: String,
    /// Non-secret lookup key; unique among active keys per `token_env`.
    pub prefix_public_id: String,
    pub token_env: TokenEnv,
    pub hash: String,
    pub hash_version: i32,
    /// Which pepper secret the hash was computed with.
    pub hash_salt_id: String,
    pub status: KeyStatus,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Whether the record can authenticate requests right now.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == KeyStatus::Active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Material for a new key record, produced by the lifecycle service.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub client_id: String,
    pub label: String,
    pub prefix_public_id: String,
    pub token_env: TokenEnv,
    pub hash: String,
    pub hash_version: i32,
    pub hash_salt_id: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The store contract the portal depends on.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up the single active, unexpired record for `(public_id, env)`.
    ///
    /// More than one match is a store-level invariant violation (the
    /// relation carries a unique index) and surfaces as an error, never as
    /// an arbitrary pick.
    async fn find_active_by_public_id(
        &self,
        public_id: &str,
        env: TokenEnv,
    ) -> Result<Option<ApiKeyRecord>>;

    /// Insert a new active record.
    async fn create(&self, new_key: NewApiKey) -> Result<ApiKeyRecord>;

    /// Atomically revoke `old_key_id` and insert `replacement`.
    ///
    /// Either both halves apply or neither does: a window with zero or two
    /// active keys for the same lineage is an invariant violation the store
    /// must prevent. Returns `None` when the old key does not exist, is not
    /// owned by `client_id`, or is not active.
    async fn rotate(
        &self,
        old_key_id: Uuid,
        client_id: &str,
        replacement: NewApiKey,
    ) -> Result<Option<ApiKeyRecord>>;

    /// Mark a key revoked. Returns `None` when no matching key exists.
    async fn revoke(&self, key_id: Uuid, client_id: &str) -> Result<Option<ApiKeyRecord>>;

    /// Best-effort bump of `last_used_at`. Callers throttle; failures must
    /// never affect an authentication result.
    async fn touch_last_used(&self, key_id: Uuid) -> Result<()>;

    /// Tenant-scoped page of keys, newest first.
    async fn list(&self, client_id: &str, limit: usize, offset: usize)
    -> Result<Vec<ApiKeyRecord>>;
}

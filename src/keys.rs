//! Tenant-scoped API key lifecycle: create, rotate, revoke, list.
//!
//! The plaintext token exists only in the response of the create and rotate
//! operations; everything persisted is the peppered Argon2id digest plus
//! lookup metadata.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::hashing::{HASH_VERSION, TokenHasher};
use crate::auth::token::{Token, TokenEnv};
use crate::error::Result;
use crate::secrets::{PEPPER_SECRET_NAME, SecretProvider};
use crate::store::{ApiKeyRecord, ApiKeyStore, NewApiKey};

const DEFAULT_SCOPES: &[&str] = &["read"];

/// A freshly minted key. `plaintext` is shown to the caller exactly once
/// and is not recoverable afterwards.
#[derive(Debug)]
pub struct IssuedApiKey {
    pub record: ApiKeyRecord,
    pub plaintext: String,
}

pub struct KeyLifecycle {
    store: Arc<dyn ApiKeyStore>,
    secrets: Arc<dyn SecretProvider>,
    hasher: TokenHasher,
    env: TokenEnv,
}

impl KeyLifecycle {
    pub fn new(
        store: Arc<dyn ApiKeyStore>,
        secrets: Arc<dyn SecretProvider>,
        env: TokenEnv,
    ) -> Self {
        Self {
            store,
            secrets,
            hasher: TokenHasher::new(),
            env,
        }
    }

    /// Mint a token and the store-ready record material for it.
    ///
    /// The pepper fetch is the only dependency: if the secret store is down
    /// the operation fails before any state is written.
    async fn mint(
        &self,
        client_id: &str,
        label: &str,
        scopes: Option<Vec<String>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(Token, NewApiKey)> {
        let pepper = self.secrets.get_secret(PEPPER_SECRET_NAME).await?;
        let token = Token::generate(self.env);
        let hash = self.hasher.hash(&token.plaintext, &pepper)?;

        let new_key = NewApiKey {
            client_id: client_id.to_string(),
            label: label.to_string(),
            prefix_public_id: token.public_id.clone(),
            token_env: token.env,
            hash,
            hash_version: HASH_VERSION,
            hash_salt_id: PEPPER_SECRET_NAME.to_string(),
            scopes: scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            expires_at,
        };
        Ok((token, new_key))
    }

    pub async fn create(
        &self,
        client_id: &str,
        label: &str,
        scopes: Option<Vec<String>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IssuedApiKey> {
        let (token, new_key) = self.mint(client_id, label, scopes, expires_at).await?;
        let record = self.store.create(new_key).await?;

        tracing::info!(
            client_id,
            key_id = %record.id,
            public_id = %record.prefix_public_id,
            env = %record.token_env,
            "api key created"
        );
        Ok(IssuedApiKey {
            record,
            plaintext: token.plaintext,
        })
    }

    /// Replace a key: revoke the old record and issue a new one in a single
    /// store transaction. Returns `None` when the key does not exist for
    /// this tenant or is already revoked.
    pub async fn rotate(
        &self,
        client_id: &str,
        key_id: uuid::Uuid,
    ) -> Result<Option<IssuedApiKey>> {
        let Some(old) = self.find_owned(client_id, key_id).await? else {
            return Ok(None);
        };

        let (token, new_key) = self
            .mint(client_id, &old.label, Some(old.scopes.clone()), old.expires_at)
            .await?;

        let Some(record) = self.store.rotate(key_id, client_id, new_key).await? else {
            return Ok(None);
        };

        tracing::info!(
            client_id,
            old_key_id = %key_id,
            new_key_id = %record.id,
            "api key rotated"
        );
        Ok(Some(IssuedApiKey {
            record,
            plaintext: token.plaintext,
        }))
    }

    /// Revoke a key. Idempotent: revoking a revoked key succeeds. Returns
    /// `None` when no key with this id belongs to the tenant.
    pub async fn revoke(
        &self,
        client_id: &str,
        key_id: uuid::Uuid,
    ) -> Result<Option<ApiKeyRecord>> {
        let revoked = self.store.revoke(key_id, client_id).await?;
        if let Some(record) = &revoked {
            tracing::info!(client_id, key_id = %record.id, "api key revoked");
        }
        Ok(revoked)
    }

    pub async fn list(
        &self,
        client_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApiKeyRecord>> {
        self.store.list(client_id, limit, offset).await
    }

    async fn find_owned(
        &self,
        client_id: &str,
        key_id: uuid::Uuid,
    ) -> Result<Option<ApiKeyRecord>> {
        // The store rotate call re-checks ownership and status under its own
        // guard; this pre-read only recovers the label and scopes to carry
        // over to the replacement.
        let keys = self.store.list(client_id, usize::MAX, 0).await?;
        Ok(keys.into_iter().find(|k| k.id == key_id))
    }
}

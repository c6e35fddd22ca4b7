//! In-memory reference implementation of the key store.
//!
//! Used by the binary in non-production configurations and by the test
//! suite. All mutations take the single write guard, which is what makes
//! rotation atomic: no authentication running concurrently can observe a
//! state with zero or two active keys for the same lineage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::token::TokenEnv;
use crate::error::{PortalError, Result};

use super::{ApiKeyRecord, ApiKeyStore, KeyStatus, NewApiKey};

#[derive(Default)]
pub struct InMemoryApiKeyStore {
    records: RwLock<HashMap<Uuid, ApiKeyRecord>>,
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(new_key: NewApiKey) -> ApiKeyRecord {
        ApiKeyRecord {
            id: Uuid::new_v4(),
            client_id: new_key.client_id,
            label: new_key.label,
            prefix_public_id: new_key.prefix_public_id,
            token_env: new_key.token_env,
            hash: new_key.hash,
            hash_version: new_key.hash_version,
            hash_salt_id: new_key.hash_salt_id,
            status: KeyStatus::Active,
            scopes: new_key.scopes,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: new_key.expires_at,
        }
    }

    /// Enforce the unique `(prefix_public_id, token_env)` active-key index.
    fn check_unique_active(
        records: &HashMap<Uuid, ApiKeyRecord>,
        public_id: &str,
        env: TokenEnv,
    ) -> Result<()> {
        let collision = records.values().any(|r| {
            r.status == KeyStatus::Active
                && r.prefix_public_id == public_id
                && r.token_env == env
        });
        if collision {
            return Err(PortalError::invariant(format!(
                "active key already exists for public id '{public_id}' in {env}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryApiKeyStore {
    async fn find_active_by_public_id(
        &self,
        public_id: &str,
        env: TokenEnv,
    ) -> Result<Option<ApiKeyRecord>> {
        let now = Utc::now();
        let records = self.records.read().await;

        let mut matches = records.values().filter(|r| {
            r.prefix_public_id == public_id && r.token_env == env && r.is_active(now)
        });

        let first = matches.next().cloned();
        if first.is_some() && matches.next().is_some() {
            return Err(PortalError::invariant(format!(
                "multiple active keys for public id '{public_id}' in {env}"
            )));
        }
        Ok(first)
    }

    async fn create(&self, new_key: NewApiKey) -> Result<ApiKeyRecord> {
        let mut records = self.records.write().await;
        Self::check_unique_active(&records, &new_key.prefix_public_id, new_key.token_env)?;

        let record = Self::materialize(new_key);
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn rotate(
        &self,
        old_key_id: Uuid,
        client_id: &str,
        replacement: NewApiKey,
    ) -> Result<Option<ApiKeyRecord>> {
        // Single write guard covers both halves.
        let mut records = self.records.write().await;

        let eligible = records.get(&old_key_id).is_some_and(|old| {
            old.client_id == client_id && old.status == KeyStatus::Active
        });
        if !eligible {
            return Ok(None);
        }

        Self::check_unique_active(&records, &replacement.prefix_public_id, replacement.token_env)?;

        let record = Self::materialize(replacement);
        records.insert(record.id, record.clone());
        if let Some(old) = records.get_mut(&old_key_id) {
            old.status = KeyStatus::Revoked;
        }
        Ok(Some(record))
    }

    async fn revoke(&self, key_id: Uuid, client_id: &str) -> Result<Option<ApiKeyRecord>> {
        let mut records = self.records.write().await;
        match records.get_mut(&key_id) {
            Some(record) if record.client_id == client_id => {
                record.status = KeyStatus::Revoked;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn touch_last_used(&self, key_id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&key_id)
            .ok_or_else(|| PortalError::database(format!("no key with id {key_id}")))?;
        record.last_used_at = Some(Utc::now());
        Ok(())
    }

    async fn list(
        &self,
        client_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApiKeyRecord>> {
        let records = self.records.read().await;
        let mut keys: Vec<ApiKeyRecord> = records
            .values()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_key(client_id: &str, public_id: &str, env: TokenEnv) -> NewApiKey {
        NewApiKey {
            client_id: client_id.to_string(),
            label: "test key".to_string(),
            prefix_public_id: public_id.to_string(),
            token_env: env,
            hash: "$argon2id$fake".to_string(),
            hash_version: 1,
            hash_salt_id: "kv:API_TOKEN_PEPPER_v1".to_string(),
            scopes: vec!["read".to_string()],
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_find_active() {
        let store = InMemoryApiKeyStore::new();
        let created = store
            .create(new_key("tenant-a", "ABCDEFGH", TokenEnv::Stg))
            .await
            .unwrap();

        let found = store
            .find_active_by_public_id("ABCDEFGH", TokenEnv::Stg)
            .await
            .unwrap()
            .expect("created key must be findable");
        assert_eq!(found.id, created.id);
        assert_eq!(found.status, KeyStatus::Active);

        // Wrong env does not match.
        assert!(
            store
                .find_active_by_public_id("ABCDEFGH", TokenEnv::Live)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn expired_keys_are_not_found() {
        let store = InMemoryApiKeyStore::new();
        let mut key = new_key("tenant-a", "ABCDEFGH", TokenEnv::Stg);
        key.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        store.create(key).await.unwrap();

        assert!(
            store
                .find_active_by_public_id("ABCDEFGH", TokenEnv::Stg)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_active_public_id_is_rejected() {
        let store = InMemoryApiKeyStore::new();
        store
            .create(new_key("tenant-a", "ABCDEFGH", TokenEnv::Stg))
            .await
            .unwrap();

        let err = store
            .create(new_key("tenant-b", "ABCDEFGH", TokenEnv::Stg))
            .await;
        assert!(matches!(err, Err(PortalError::InvariantViolation { .. })));

        // Same public id in the other env is a different partition.
        assert!(
            store
                .create(new_key("tenant-b", "ABCDEFGH", TokenEnv::Live))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn rotate_revokes_old_and_creates_new() {
        let store = InMemoryApiKeyStore::new();
        let old = store
            .create(new_key("tenant-a", "OLDPUBID1", TokenEnv::Stg))
            .await
            .unwrap();

        let rotated = store
            .rotate(old.id, "tenant-a", new_key("tenant-a", "NEWPUBID1", TokenEnv::Stg))
            .await
            .unwrap()
            .expect("rotation of an active key succeeds");

        assert_ne!(rotated.id, old.id);
        assert_eq!(rotated.status, KeyStatus::Active);

        // Old public id no longer authenticates; new one does.
        assert!(
            store
                .find_active_by_public_id("OLDPUBID1", TokenEnv::Stg)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_active_by_public_id("NEWPUBID1", TokenEnv::Stg)
                .await
                .unwrap()
                .is_some()
        );

        // Exactly one revoked and one active record for the tenant.
        let keys = store.list("tenant-a", 10, 0).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys.iter().filter(|k| k.status == KeyStatus::Active).count(),
            1
        );
        assert_eq!(
            keys.iter().filter(|k| k.status == KeyStatus::Revoked).count(),
            1
        );
    }

    #[tokio::test]
    async fn rotate_rejects_wrong_tenant_and_revoked_keys() {
        let store = InMemoryApiKeyStore::new();
        let key = store
            .create(new_key("tenant-a", "PUBLICID1", TokenEnv::Stg))
            .await
            .unwrap();

        // Wrong tenant.
        let res = store
            .rotate(key.id, "tenant-b", new_key("tenant-b", "PUBLICID2", TokenEnv::Stg))
            .await
            .unwrap();
        assert!(res.is_none());

        // Already revoked.
        store.revoke(key.id, "tenant-a").await.unwrap();
        let res = store
            .rotate(key.id, "tenant-a", new_key("tenant-a", "PUBLICID3", TokenEnv::Stg))
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn revoked_keys_stay_listed() {
        let store = InMemoryApiKeyStore::new();
        let key = store
            .create(new_key("tenant-a", "PUBLICID1", TokenEnv::Stg))
            .await
            .unwrap();

        store.revoke(key.id, "tenant-a").await.unwrap();

        let keys = store.list("tenant-a", 10, 0).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].status, KeyStatus::Revoked);
    }

    #[tokio::test]
    async fn touch_last_used_sets_timestamp() {
        let store = InMemoryApiKeyStore::new();
        let key = store
            .create(new_key("tenant-a", "PUBLICID1", TokenEnv::Stg))
            .await
            .unwrap();
        assert!(key.last_used_at.is_none());

        store.touch_last_used(key.id).await.unwrap();

        let found = store
            .find_active_by_public_id("PUBLICID1", TokenEnv::Stg)
            .await
            .unwrap()
            .unwrap();
        assert!(found.last_used_at.is_some());
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let store = InMemoryApiKeyStore::new();
        for i in 0..5 {
            store
                .create(new_key("tenant-a", &format!("PUBLICID{i}"), TokenEnv::Stg))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let page = store.list("tenant-a", 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at >= page[1].created_at);

        assert!(store.list("tenant-b", 10, 0).await.unwrap().is_empty());
    }
}

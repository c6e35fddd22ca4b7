//! Signed URL minting for job artifact downloads.
//!
//! URLs carry an HMAC-SHA256 signature over the bucket-qualified object
//! path, the expiry and the requesting tenant, so the storage edge can
//! verify them without a database round trip. Object paths are validated
//! before signing; logs carry only a short digest of the path, never the
//! path itself.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use regex::Regex;
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{PortalError, Result};
use crate::secrets::{STORAGE_SIGNING_SECRET_NAME, SecretProvider};

/// Default lifetime of a minted URL.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(15 * 60);

static OBJECT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^jobs/[a-z0-9_]+/files/[a-z0-9_.\-]+$").expect("object path regex is valid")
});

type HmacSha256 = Hmac<Sha256>;

/// A minted download URL and its expiry.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

pub struct SignedUrlService {
    secrets: Arc<dyn SecretProvider>,
    base_url: String,
    bucket: String,
    ttl: Duration,
}

impl SignedUrlService {
    pub fn new(secrets: Arc<dyn SecretProvider>, base_url: &str, bucket: &str) -> Self {
        Self::with_ttl(secrets, base_url, bucket, DEFAULT_URL_TTL)
    }

    pub fn with_ttl(
        secrets: Arc<dyn SecretProvider>,
        base_url: &str,
        bucket: &str,
        ttl: Duration,
    ) -> Self {
        Self {
            secrets,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            ttl,
        }
    }

    /// Mint a signed download URL for one file of one job.
    pub async fn mint(&self, client_id: &str, job_id: &str, file_name: &str) -> Result<SignedUrl> {
        let object_path = format!("jobs/{job_id}/files/{file_name}");
        validate_object_path(job_id, &object_path)?;

        let key = self.secrets.get_secret(STORAGE_SIGNING_SECRET_NAME).await?;
        let expires_at = Utc::now() + self.ttl;
        let expires = expires_at.timestamp();
        let signature = self.sign(&key, &object_path, expires, client_id)?;

        tracing::info!(
            client_id,
            job_id,
            path_digest = %path_digest(&object_path),
            expires,
            "signed url minted"
        );

        Ok(SignedUrl {
            url: format!(
                "{}/files/{}/{object_path}?expires={expires}&client={client_id}&signature={signature}",
                self.base_url, self.bucket
            ),
            expires_at,
        })
    }

    /// Verify a signature this service produced. Constant-time comparison,
    /// then the expiry check.
    pub async fn verify(
        &self,
        client_id: &str,
        object_path: &str,
        expires: i64,
        signature: &str,
    ) -> Result<bool> {
        let key = self.secrets.get_secret(STORAGE_SIGNING_SECRET_NAME).await?;
        let expected = self.sign(&key, object_path, expires, client_id)?;

        let matches: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        Ok(matches && expires > Utc::now().timestamp())
    }

    fn sign(&self, key: &str, object_path: &str, expires: i64, client_id: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| PortalError::internal(format!("signing key rejected: {e}")))?;
        mac.update(format!("{}/{object_path}\n{expires}\n{client_id}", self.bucket).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Reject traversal and shape violations before anything is signed.
fn validate_object_path(job_id: &str, path: &str) -> Result<()> {
    if path.contains("..") || path.contains("//") {
        return Err(PortalError::invalid_object_path(format!(
            "path digest {} contains traversal sequences",
            path_digest(path)
        )));
    }
    if !path.starts_with(&format!("jobs/{job_id}/")) {
        return Err(PortalError::invalid_object_path(format!(
            "path digest {} escapes the job prefix",
            path_digest(path)
        )));
    }
    if !OBJECT_PATH.is_match(path) {
        return Err(PortalError::invalid_object_path(format!(
            "path digest {} does not match the object layout",
            path_digest(path)
        )));
    }
    Ok(())
}

/// Short, log-safe digest of an object path.
fn path_digest(path: &str) -> String {
    let digest = md5::compute(path.as_bytes());
    format!("{digest:x}")[..8].to_string()
}

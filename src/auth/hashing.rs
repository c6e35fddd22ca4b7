//! Memory-hard token hashing.
//!
//! Turns `(plaintext, pepper)` into a one-way Argon2id digest and verifies
//! candidates against stored digests. The pepper is an application-wide
//! secret held outside the database, so a full database leak alone cannot
//! be brute-forced offline; the digest itself embeds its salt and
//! parameters, so verification is self-describing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{PortalError, Result};

/// Version tag stored alongside each digest so parameters can be migrated.
pub const HASH_VERSION: i32 = 1;

/// Argon2id memory cost in KiB (64 MiB).
const MEMORY_KIB: u32 = 64 * 1024;
/// Number of passes.
const ITERATIONS: u32 = 3;
/// Single-lane: token verification is already concurrent across requests.
const LANES: u32 = 1;
/// Digest length in bytes.
const OUTPUT_LEN: usize = 32;

/// Argon2id hash/verify engine for API-token secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenHasher;

impl TokenHasher {
    pub fn new() -> Self {
        Self
    }

    fn context(&self) -> Result<Argon2<'static>> {
        let params = Params::new(MEMORY_KIB, ITERATIONS, LANES, Some(OUTPUT_LEN))
            .map_err(|e| PortalError::token_material(format!("invalid argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `plaintext + pepper` into a PHC-format digest with a fresh salt.
    pub fn hash(&self, plaintext: &str, pepper: &str) -> Result<String> {
        let input = format!("{plaintext}{pepper}");
        let salt = SaltString::generate(&mut OsRng);

        let digest = self
            .context()?
            .hash_password(input.as_bytes(), &salt)
            .map_err(|e| PortalError::token_material(format!("argon2id hashing failed: {e}")))?;

        Ok(digest.to_string())
    }

    /// Verify a candidate against a stored digest.
    ///
    /// Any malformed digest or internal verifier error maps to `false`: a
    /// library error is indistinguishable from a crafted digest and must
    /// not become an oracle for the caller.
    pub fn verify(&self, plaintext: &str, digest: &str, pepper: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("token digest did not parse as a PHC string");
            return false;
        };

        let input = format!("{plaintext}{pepper}");
        // Parameters come from the digest itself; comparison is
        // constant-time inside the verifier.
        Argon2::default()
            .verify_password(input.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &str = "test-pepper-value";

    #[test]
    fn hash_then_verify_succeeds() {
        let hasher = TokenHasher::new();
        let digest = hasher.hash("dhp_stg_ABCDEFGH_secret", PEPPER).unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("dhp_stg_ABCDEFGH_secret", &digest, PEPPER));
    }

    #[test]
    fn verify_fails_for_wrong_pepper() {
        let hasher = TokenHasher::new();
        let digest = hasher.hash("plaintext", PEPPER).unwrap();
        assert!(!hasher.verify("plaintext", &digest, "other-pepper"));
    }

    #[test]
    fn verify_fails_for_wrong_plaintext() {
        let hasher = TokenHasher::new();
        let digest = hasher.hash("plaintext", PEPPER).unwrap();
        assert!(!hasher.verify("other-plaintext", &digest, PEPPER));
    }

    #[test]
    fn malformed_digest_is_false_not_error() {
        let hasher = TokenHasher::new();
        assert!(!hasher.verify("plaintext", "not-a-phc-string", PEPPER));
        assert!(!hasher.verify("plaintext", "", PEPPER));
        assert!(!hasher.verify("plaintext", "$argon2id$v=19$garbage", PEPPER));
    }

    #[test]
    fn digests_are_salted() {
        let hasher = TokenHasher::new();
        let a = hasher.hash("plaintext", PEPPER).unwrap();
        let b = hasher.hash("plaintext", PEPPER).unwrap();
        assert_ne!(a, b);
    }
}

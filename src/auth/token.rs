//! Plaintext API-token format: generation and parsing.
//!
//! The canonical serialization is `dhp_<env>_<publicId>_<secret>` where
//! `publicId` is 8-10 base62 characters and `secret` is exactly 32. This
//! module is pure: no I/O, no secrets, no store access. Whether a
//! syntactically valid token actually exists is decided by the store lookup
//! in the bearer protocol, never here.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::RngCore;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Literal prefix of every portal token.
pub const TOKEN_PREFIX: &str = "dhp";

/// Random bytes drawn for the public id slot (48 bits of entropy).
const PUBLIC_ID_BYTES: usize = 6;
/// Random bytes drawn for the secret slot (192 bits, >128 after truncation).
const SECRET_BYTES: usize = 24;

const PUBLIC_ID_MIN_LEN: usize = 8;
const PUBLIC_ID_MAX_LEN: usize = 10;
const SECRET_LEN: usize = 32;

static TOKEN_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^dhp_(live|stg)_[A-Za-z0-9]{8,10}_[A-Za-z0-9]{32}$")
        .expect("token format regex is valid")
});

/// Token codec error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error(
        "invalid token format: must match ^dhp_(live|stg)_[A-Za-z0-9]{{8,10}}_[A-Za-z0-9]{{32}}$"
    )]
    InvalidFormat,
    #[error("invalid environment: expected 'live' or 'stg', got '{0}'")]
    InvalidEnvironment(String),
}

/// Logical token partition. A staging-issued token never authenticates
/// against a server configured for `live` and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEnv {
    Live,
    Stg,
}

impl TokenEnv {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Stg => "stg",
        }
    }

    /// Coerce a deployment environment string the way the portal does:
    /// exactly `live` selects live, anything else is staging.
    pub fn from_deployment(value: &str) -> Self {
        if value == "live" { Self::Live } else { Self::Stg }
    }
}

impl fmt::Display for TokenEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenEnv {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "stg" => Ok(Self::Stg),
            other => Err(TokenError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// A freshly generated token. Ephemeral: the plaintext exists only until it
/// has been handed to the tenant once, and is never persisted.
#[derive(Clone)]
pub struct Token {
    pub env: TokenEnv,
    pub public_id: String,
    pub secret: String,
    pub plaintext: String,
}

impl Token {
    /// Generate a new token from the process CSPRNG.
    pub fn generate(env: TokenEnv) -> Self {
        let public_id = generate_public_id();
        let secret = generate_secret();
        let plaintext = format!("{TOKEN_PREFIX}_{env}_{public_id}_{secret}");
        Self {
            env,
            public_id,
            secret,
            plaintext,
        }
    }

    /// Parse a plaintext token into its components.
    ///
    /// Length-exact syntactic check only; does not consult any store.
    pub fn parse(plaintext: &str) -> Result<ParsedToken, TokenError> {
        if !TOKEN_FORMAT.is_match(plaintext) {
            return Err(TokenError::InvalidFormat);
        }

        let mut parts = plaintext.splitn(4, '_');
        let _prefix = parts.next();
        let env = parts
            .next()
            .and_then(|e| e.parse().ok())
            .ok_or(TokenError::InvalidFormat)?;
        let public_id = parts.next().ok_or(TokenError::InvalidFormat)?;
        let secret = parts.next().ok_or(TokenError::InvalidFormat)?;

        Ok(ParsedToken {
            env,
            public_id: public_id.to_string(),
            secret: secret.to_string(),
        })
    }
}

// Secrets must never end up in logs via {:?}.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("env", &self.env)
            .field("public_id", &self.public_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The components of a syntactically valid plaintext token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub env: TokenEnv,
    pub public_id: String,
    pub secret: String,
}

/// Convert a byte string to base62, treating it as a big-endian unsigned
/// integer and repeatedly dividing by 62. The zero value yields `"0"`.
fn bytes_to_base62(bytes: &[u8]) -> String {
    let mut num = bytes.to_vec();
    let mut digits: Vec<u8> = Vec::new();

    while num.iter().any(|&b| b != 0) {
        let mut remainder: u32 = 0;
        for byte in &mut num {
            let acc = (remainder << 8) | u32::from(*byte);
            *byte = (acc / 62) as u8;
            remainder = acc % 62;
        }
        digits.push(BASE62_ALPHABET[remainder as usize]);
    }

    if digits.is_empty() {
        return "0".to_string();
    }
    digits.reverse();
    digits.iter().map(|&b| b as char).collect()
}

/// Pad or truncate variable-length base62 output to a fixed slot width.
/// The random draw is larger than the slot, so remaining entropy after
/// truncation stays above the slot's security floor.
fn fit_width(value: String, min: usize, max: usize) -> String {
    if value.len() < min {
        let mut padded = "0".repeat(min - value.len());
        padded.push_str(&value);
        padded
    } else if value.len() > max {
        value[..max].to_string()
    } else {
        value
    }
}

fn generate_public_id() -> String {
    let mut bytes = [0u8; PUBLIC_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    fit_width(
        bytes_to_base62(&bytes),
        PUBLIC_ID_MIN_LEN,
        PUBLIC_ID_MAX_LEN,
    )
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    fit_width(bytes_to_base62(&bytes), SECRET_LEN, SECRET_LEN)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(TokenEnv::Live)]
    #[case(TokenEnv::Stg)]
    fn generate_parse_round_trip(#[case] env: TokenEnv) {
        let token = Token::generate(env);
        let parsed = Token::parse(&token.plaintext).expect("generated token must parse");

        assert_eq!(parsed.env, env);
        assert_eq!(parsed.public_id, token.public_id);
        assert_eq!(parsed.secret, token.secret);
        assert!(TOKEN_FORMAT.is_match(&token.plaintext));
    }

    #[test]
    fn generated_slots_have_exact_widths() {
        for _ in 0..64 {
            let token = Token::generate(TokenEnv::Stg);
            assert!((8..=10).contains(&token.public_id.len()));
            assert_eq!(token.secret.len(), 32);
        }
    }

    #[test]
    fn generated_tokens_do_not_collide() {
        let a = Token::generate(TokenEnv::Live);
        let b = Token::generate(TokenEnv::Live);
        assert_ne!(a.public_id, b.public_id);
        assert_ne!(a.secret, b.secret);
    }

    #[rstest]
    #[case::missing_prefix("abc_live_ABCDEFGH_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::wrong_env("dhp_prod_ABCDEFGH_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::public_id_too_short("dhp_live_ABCDEFG_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::public_id_too_long("dhp_live_ABCDEFGHIJK_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::secret_too_short("dhp_live_ABCDEFGH_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::secret_too_long("dhp_live_ABCDEFGH_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::non_base62("dhp_live_ABCDEFG!_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")]
    #[case::trailing_garbage("dhp_live_ABCDEFGH_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA extra")]
    #[case::empty("")]
    #[case::not_a_token("not-a-real-token")]
    fn parse_rejects_malformed(#[case] input: &str) {
        assert_eq!(Token::parse(input), Err(TokenError::InvalidFormat));
    }

    #[test]
    fn parse_extracts_components() {
        let parsed = Token::parse("dhp_stg_Ab3Xy9Qr_0123456789abcdefABCDEF0123456789").unwrap();
        assert_eq!(parsed.env, TokenEnv::Stg);
        assert_eq!(parsed.public_id, "Ab3Xy9Qr");
        assert_eq!(parsed.secret, "0123456789abcdefABCDEF0123456789");
    }

    #[test]
    fn base62_conversion_matches_big_endian_integer() {
        assert_eq!(bytes_to_base62(&[]), "0");
        assert_eq!(bytes_to_base62(&[0, 0]), "0");
        assert_eq!(bytes_to_base62(&[61]), "z");
        // 62 = "10" in base62
        assert_eq!(bytes_to_base62(&[62]), "10");
        // 0x0100 = 256 = 4*62 + 8 -> "48"
        assert_eq!(bytes_to_base62(&[1, 0]), "48");
    }

    #[test]
    fn fit_width_pads_and_truncates() {
        assert_eq!(fit_width("abc".to_string(), 8, 10), "00000abc");
        assert_eq!(fit_width("abcdefghij".to_string(), 8, 10), "abcdefghij");
        assert_eq!(fit_width("abcdefghijk".to_string(), 8, 10), "abcdefghij");
    }

    #[test]
    fn debug_redacts_secret() {
        let token = Token::generate(TokenEnv::Live);
        let debug = format!("{token:?}");
        assert!(debug.contains(&token.public_id));
        assert!(!debug.contains(&token.secret));
    }

    #[test]
    fn deployment_env_coercion() {
        assert_eq!(TokenEnv::from_deployment("live"), TokenEnv::Live);
        assert_eq!(TokenEnv::from_deployment("stg"), TokenEnv::Stg);
        assert_eq!(TokenEnv::from_deployment("production"), TokenEnv::Stg);
    }
}

//! Portal API: bearer-token authentication and key lifecycle for the
//! tenant-facing REST facade.
//!
//! The crate owns the token codec, the peppered Argon2id hashing engine,
//! the bearer authentication protocol, the key lifecycle service and the
//! signed URL minter. The persistent key relation and the secret store are
//! external collaborators behind the [`store::ApiKeyStore`] and
//! [`secrets::SecretProvider`] traits.

pub mod auth;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod management;
pub mod secrets;
pub mod signing;
pub mod store;

pub use config::AppConfig;
pub use error::{PortalError, Result};

//! File-based configuration with environment overrides.
//!
//! Configuration is read from `config/config.{RUST_ENV}.toml`. Secrets are
//! never configured here; they come from the secret provider.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::auth::token::TokenEnv;
use crate::error::{Context, PortalError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Which token environment this deployment accepts.
    pub token_env: TokenEnv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Public base URL of the storage edge, no trailing slash required.
    pub base_url: String,
    pub bucket: String,
    /// Signed URL lifetime.
    #[serde(default = "default_url_ttl_minutes")]
    pub url_ttl_minutes: u64,
}

fn default_url_ttl_minutes() -> u64 {
    15
}

impl AppConfig {
    /// Load configuration for the current `RUST_ENV` (default `dev`).
    ///
    /// `TOKEN_ENV` overrides the configured token environment, so one
    /// config file can serve both a staging and a production rollout.
    pub fn load() -> Result<Self> {
        let run_env = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let path = format!("config/config.{run_env}.toml");
        let mut config = Self::from_file(&path)?;

        if let Ok(deployment) = std::env::var("TOKEN_ENV") {
            config.auth.token_env = TokenEnv::from_deployment(&deployment);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.base_url.is_empty() {
            return Err(PortalError::config("storage.base_url must not be empty"));
        }
        if !self.storage.base_url.starts_with("https://")
            && !self.storage.base_url.starts_with("http://")
        {
            return Err(PortalError::config("storage.base_url must be an http(s) URL"));
        }
        if self.storage.bucket.is_empty() {
            return Err(PortalError::config("storage.bucket must not be empty"));
        }
        if self.storage.url_ttl_minutes == 0 {
            return Err(PortalError::config("storage.url_ttl_minutes must be positive"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

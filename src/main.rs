use std::sync::Arc;
use std::time::Duration;

use portal_api::auth::BearerAuthenticator;
use portal_api::keys::KeyLifecycle;
use portal_api::management::{AppState, server};
use portal_api::secrets::{CachedSecretProvider, EnvSecretProvider, SecretProvider};
use portal_api::signing::SignedUrlService;
use portal_api::store::{ApiKeyStore, InMemoryApiKeyStore};
use portal_api::{AppConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    portal_api::logging::init();

    let config = AppConfig::load()?;
    tracing::info!(
        env = %config.auth.token_env,
        addr = %config.socket_addr(),
        "starting portal api"
    );

    let secrets: Arc<dyn SecretProvider> = Arc::new(CachedSecretProvider::with_default_ttl(
        Arc::new(EnvSecretProvider::new()),
    ));
    // TODO: swap for the SQL-backed store once the portal schema migration
    // lands; the in-memory store only serves single-node deployments.
    let store: Arc<dyn ApiKeyStore> = Arc::new(InMemoryApiKeyStore::new());

    let state = AppState {
        authenticator: Arc::new(BearerAuthenticator::new(
            Arc::clone(&store),
            Arc::clone(&secrets),
            config.auth.token_env,
        )),
        keys: Arc::new(KeyLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&secrets),
            config.auth.token_env,
        )),
        signer: Arc::new(SignedUrlService::with_ttl(
            Arc::clone(&secrets),
            &config.storage.base_url,
            &config.storage.bucket,
            Duration::from_secs(config.storage.url_ttl_minutes * 60),
        )),
    };

    server::serve(config.socket_addr(), state).await
}

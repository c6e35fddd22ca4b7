//! HTTP surface: router, shared state, session middleware and handlers.

pub mod handlers;
pub mod middleware;
pub mod server;

use std::sync::Arc;

use crate::auth::BearerAuthenticator;
use crate::keys::KeyLifecycle;
use crate::signing::SignedUrlService;

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<BearerAuthenticator>,
    pub keys: Arc<KeyLifecycle>,
    pub signer: Arc<SignedUrlService>,
}

pub use server::build_router;

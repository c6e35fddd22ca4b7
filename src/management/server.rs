//! Router assembly and the serve loop.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::require_bearer_auth;
use crate::error::Result;

use super::AppState;
use super::handlers::{api_keys, files, health};
use super::middleware::require_portal_session;

pub fn build_router(state: AppState) -> Router {
    // Key lifecycle routes ride the portal session, not bearer tokens.
    let tenant_admin = Router::new()
        .route(
            "/tenant/v1/api-keys",
            post(api_keys::create_key).get(api_keys::list_keys),
        )
        .route("/tenant/v1/api-keys/{key_id}/rotate", post(api_keys::rotate_key))
        .route("/tenant/v1/api-keys/{key_id}/revoke", post(api_keys::revoke_key))
        .layer(axum::middleware::from_fn(require_portal_session));

    let bearer_protected = Router::new()
        .route(
            "/v1/jobs/{job_id}/files/{file_name}/signed-url",
            get(files::signed_url),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(tenant_admin)
        .merge(bearer_protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "portal api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

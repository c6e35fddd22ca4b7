//! Portal session middleware for the tenant admin routes.
//!
//! Key lifecycle endpoints are not bearer-authenticated (a tenant needs
//! them precisely when it has no working key). They are reachable only
//! from the portal backend, which forwards the session identity in
//! `x-client-id` and `x-user-id` headers after its own login check.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::middleware::trace_id_from;
use crate::error::Problem;

/// Identity of the portal user acting on behalf of a tenant.
#[derive(Debug, Clone)]
pub struct PortalSession {
    pub client_id: String,
    pub user_id: Option<String>,
}

pub async fn require_portal_session(mut request: Request, next: Next) -> Response {
    let trace_id = trace_id_from(&request);

    let client_id = request
        .headers()
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let Some(client_id) = client_id else {
        tracing::warn!(trace_id, "tenant admin request without session identity");
        return Problem::new(
            StatusCode::UNAUTHORIZED,
            "missing_session",
            "Portal session required",
            &trace_id,
        )
        .into_response();
    };

    let user_id = request
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    request
        .extensions_mut()
        .insert(PortalSession { client_id, user_id });
    next.run(request).await
}

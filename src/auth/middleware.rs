//! Axum middleware wiring for bearer authentication.
//!
//! On success the [`RequestContext`] is inserted as a request extension for
//! downstream handlers; on failure the request short-circuits into an
//! RFC 7807 problem response.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::Problem;

use super::bearer::BearerAuthenticator;

/// Correlation id for the request: `x-request-id` when the edge proxy set
/// one, otherwise a fresh UUID so problem responses stay correlatable.
pub fn trace_id_from(request: &Request) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn require_bearer_auth(
    State(authenticator): State<Arc<BearerAuthenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let trace_id = trace_id_from(&request);
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match authenticator
        .authenticate(authorization.as_deref(), &trace_id)
        .await
    {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(failure) => Problem::new(
            failure.status(),
            failure.code(),
            failure.detail(),
            &trace_id,
        )
        .into_response(),
    }
}

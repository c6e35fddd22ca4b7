//! Liveness endpoint. Unauthenticated; reports no dependency state.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::auth::token::TokenEnv;
use crate::management::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub env: TokenEnv,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        env: state.authenticator.required_env(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

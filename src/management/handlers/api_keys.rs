//! Tenant admin handlers for the API key lifecycle.
//!
//! Responses project records through an allow-list DTO: the digest, the
//! pepper reference and other internals never cross the HTTP boundary.
//! The plaintext token appears exactly once, in the create and rotate
//! responses.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::token::TokenEnv;
use crate::error::Problem;
use crate::management::AppState;
use crate::management::middleware::PortalSession;
use crate::store::{ApiKeyRecord, KeyStatus};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;
const MAX_LABEL_LEN: usize = 100;

pub(crate) fn trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Public projection of a stored key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub id: Uuid,
    pub label: String,
    pub public_id: String,
    pub env: TokenEnv,
    pub status: KeyStatus,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyRecord> for ApiKeySummary {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            label: record.label.clone(),
            public_id: record.prefix_public_id.clone(),
            env: record.token_env,
            status: record.status,
            scopes: record.scopes.clone(),
            created_at: record.created_at,
            last_used_at: record.last_used_at,
            expires_at: record.expires_at,
        }
    }
}

/// Create/rotate response: the summary plus the one-time plaintext token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedKeyResponse {
    pub api_key: ApiKeySummary,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyRequest {
    pub label: String,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyListResponse {
    pub data: Vec<ApiKeySummary>,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

pub async fn create_key(
    State(state): State<AppState>,
    Extension(session): Extension<PortalSession>,
    headers: HeaderMap,
    Json(body): Json<CreateKeyRequest>,
) -> Response {
    let trace_id = trace_id(&headers);

    let label = body.label.trim();
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return Problem::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Label must be between 1 and 100 characters",
            &trace_id,
        )
        .into_response();
    }

    match state
        .keys
        .create(&session.client_id, label, body.scopes, body.expires_at)
        .await
    {
        Ok(issued) => (
            StatusCode::CREATED,
            Json(IssuedKeyResponse {
                api_key: ApiKeySummary::from(&issued.record),
                token: issued.plaintext,
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(trace_id, %error, "key creation failed");
            Problem::from_error(&error, &trace_id).into_response()
        }
    }
}

pub async fn rotate_key(
    State(state): State<AppState>,
    Extension(session): Extension<PortalSession>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Response {
    let trace_id = trace_id(&headers);

    match state.keys.rotate(&session.client_id, key_id).await {
        Ok(Some(issued)) => Json(IssuedKeyResponse {
            api_key: ApiKeySummary::from(&issued.record),
            token: issued.plaintext,
        })
        .into_response(),
        Ok(None) => not_found(&trace_id),
        Err(error) => {
            tracing::error!(trace_id, %key_id, %error, "key rotation failed");
            Problem::from_error(&error, &trace_id).into_response()
        }
    }
}

pub async fn revoke_key(
    State(state): State<AppState>,
    Extension(session): Extension<PortalSession>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Response {
    let trace_id = trace_id(&headers);

    match state.keys.revoke(&session.client_id, key_id).await {
        Ok(Some(record)) => Json(ApiKeySummary::from(&record)).into_response(),
        Ok(None) => not_found(&trace_id),
        Err(error) => {
            tracing::error!(trace_id, %key_id, %error, "key revocation failed");
            Problem::from_error(&error, &trace_id).into_response()
        }
    }
}

pub async fn list_keys(
    State(state): State<AppState>,
    Extension(session): Extension<PortalSession>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> Response {
    let trace_id = trace_id(&headers);
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = page.offset.unwrap_or(0);

    // Fetch one extra row to decide has_more without a count query.
    match state.keys.list(&session.client_id, limit + 1, offset).await {
        Ok(mut records) => {
            let has_more = records.len() > limit;
            records.truncate(limit);
            Json(KeyListResponse {
                data: records.iter().map(ApiKeySummary::from).collect(),
                limit,
                offset,
                has_more,
            })
            .into_response()
        }
        Err(error) => {
            tracing::error!(trace_id, %error, "key listing failed");
            Problem::from_error(&error, &trace_id).into_response()
        }
    }
}

fn not_found(trace_id: &str) -> Response {
    Problem::new(
        StatusCode::NOT_FOUND,
        "not_found",
        "No such API key for this tenant",
        trace_id,
    )
    .into_response()
}

//! Tenant admin flow through the HTTP stack: create, rotate, revoke and
//! list keys, and the effect each step has on bearer authentication.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use portal_api::auth::{BearerAuthenticator, TokenEnv};
use portal_api::error::Result;
use portal_api::keys::KeyLifecycle;
use portal_api::management::{AppState, build_router};
use portal_api::secrets::SecretProvider;
use portal_api::signing::SignedUrlService;
use portal_api::store::{ApiKeyStore, InMemoryApiKeyStore};
use serde_json::{Value, json};
use tower::ServiceExt;

struct StaticSecrets;

#[async_trait]
impl SecretProvider for StaticSecrets {
    async fn get_secret(&self, name: &str) -> Result<String> {
        Ok(format!("integration-secret-for-{name}"))
    }
}

struct DownSecrets;

#[async_trait]
impl SecretProvider for DownSecrets {
    async fn get_secret(&self, name: &str) -> Result<String> {
        Err(portal_api::PortalError::secret_unavailable(
            name,
            "vault unreachable",
        ))
    }
}

fn app_with_secrets(secrets: Arc<dyn SecretProvider>) -> Router {
    let store: Arc<dyn ApiKeyStore> = Arc::new(InMemoryApiKeyStore::new());
    let state = AppState {
        authenticator: Arc::new(BearerAuthenticator::new(
            Arc::clone(&store),
            Arc::clone(&secrets),
            TokenEnv::Stg,
        )),
        keys: Arc::new(KeyLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&secrets),
            TokenEnv::Stg,
        )),
        signer: Arc::new(SignedUrlService::new(
            secrets,
            "https://storage.example.com",
            "portal-artifacts",
        )),
    };
    build_router(state)
}

fn app() -> Router {
    app_with_secrets(Arc::new(StaticSecrets))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    client_id: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(client_id) = client_id {
        builder = builder.header("x-client-id", client_id);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_key(app: &Router, client_id: &str, label: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/tenant/v1/api-keys",
        Some(client_id),
        Some(json!({ "label": label })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

async fn bearer_status(app: &Router, token: &str) -> StatusCode {
    let request = Request::builder()
        .uri("/v1/jobs/job_1/files/report.pdf/signed-url")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn created_key_authenticates_and_hides_internals() {
    let app = app();
    let body = create_key(&app, "tenant-a", "ci pipeline").await;

    let token = body["token"].as_str().unwrap();
    assert!(token.starts_with("dhp_stg_"));

    let key = &body["apiKey"];
    assert_eq!(key["label"], "ci pipeline");
    assert_eq!(key["status"], "active");
    assert_eq!(key["scopes"], json!(["read"]));
    // The digest and pepper reference never leave the service.
    assert!(key.get("hash").is_none());
    assert!(key.get("hashSaltId").is_none());

    assert_eq!(bearer_status(&app, token).await, StatusCode::OK);
}

#[tokio::test]
async fn session_identity_is_required() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/tenant/v1/api-keys",
        None,
        Some(json!({ "label": "k" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_session");
}

#[tokio::test]
async fn blank_labels_are_rejected() {
    let app = app();
    for label in ["", "   "] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/tenant/v1/api-keys",
            Some("tenant-a"),
            Some(json!({ "label": label })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }
}

#[tokio::test]
async fn rotation_swaps_credentials_atomically() {
    let app = app();
    let created = create_key(&app, "tenant-a", "deploy bot").await;
    let old_token = created["token"].as_str().unwrap();
    let key_id = created["apiKey"]["id"].as_str().unwrap();

    let (status, rotated) = send(
        &app,
        Method::POST,
        &format!("/tenant/v1/api-keys/{key_id}/rotate"),
        Some("tenant-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_token = rotated["token"].as_str().unwrap();
    assert_ne!(new_token, old_token);
    assert_eq!(rotated["apiKey"]["label"], "deploy bot");

    assert_eq!(bearer_status(&app, old_token).await, StatusCode::UNAUTHORIZED);
    assert_eq!(bearer_status(&app, new_token).await, StatusCode::OK);
}

#[tokio::test]
async fn rotation_is_tenant_scoped() {
    let app = app();
    let created = create_key(&app, "tenant-a", "k").await;
    let key_id = created["apiKey"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/tenant/v1/api-keys/{key_id}/rotate"),
        Some("tenant-b"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    // The original credential still works.
    let token = created["token"].as_str().unwrap();
    assert_eq!(bearer_status(&app, token).await, StatusCode::OK);
}

#[tokio::test]
async fn revocation_takes_effect_immediately() {
    let app = app();
    let created = create_key(&app, "tenant-a", "k").await;
    let token = created["token"].as_str().unwrap();
    let key_id = created["apiKey"]["id"].as_str().unwrap();

    assert_eq!(bearer_status(&app, token).await, StatusCode::OK);

    let (status, revoked) = send(
        &app,
        Method::POST,
        &format!("/tenant/v1/api-keys/{key_id}/revoke"),
        Some("tenant-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["status"], "revoked");

    assert_eq!(bearer_status(&app, token).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_pages_newest_first_per_tenant() {
    let app = app();
    for i in 0..3 {
        create_key(&app, "tenant-a", &format!("key {i}")).await;
    }
    create_key(&app, "tenant-b", "other tenant").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/tenant/v1/api-keys?limit=2&offset=0",
        Some("tenant-a"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["hasMore"], true);

    // Listing never exposes digests or tokens.
    for key in data {
        assert!(key.get("hash").is_none());
        assert!(key.get("token").is_none());
    }

    let (_, page2) = send(
        &app,
        Method::GET,
        "/tenant/v1/api-keys?limit=2&offset=2",
        Some("tenant-a"),
        None,
    )
    .await;
    assert_eq!(page2["data"].as_array().unwrap().len(), 1);
    assert_eq!(page2["hasMore"], false);
}

#[tokio::test]
async fn secret_outage_returns_service_unavailable() {
    let app = app_with_secrets(Arc::new(DownSecrets));
    let (status, body) = send(
        &app,
        Method::POST,
        "/tenant/v1/api-keys",
        Some("tenant-a"),
        Some(json!({ "label": "k" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "service_unavailable");
    // The secret name must not leak.
    assert!(!body["detail"].as_str().unwrap().contains("PEPPER"));
}

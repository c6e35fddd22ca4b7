//! Bearer-authenticated signed URL minting for job artifacts.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::auth::RequestContext;
use crate::error::Problem;
use crate::management::AppState;

use super::api_keys::trace_id;

pub async fn signed_url(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
    Path((job_id, file_name)): Path<(String, String)>,
) -> Response {
    let trace_id = trace_id(&headers);

    match state
        .signer
        .mint(&context.client_id, &job_id, &file_name)
        .await
    {
        Ok(signed) => Json(signed).into_response(),
        Err(error) => {
            tracing::warn!(trace_id, client_id = %context.client_id, %error, "signed url refused");
            Problem::from_error(&error, &trace_id).into_response()
        }
    }
}

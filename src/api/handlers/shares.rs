// Share request handlers - JWT authenticated

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::domain;
use crate::models::{ShareRequest, ShareRequestRecord};

/// POST /shares
/// Creates a share for the authenticated user; the initial status is `pending`
#[tracing::instrument(skip(state, headers, payload), fields(endpoint = "create_share"))]
pub async fn create_share_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShareRequestRecord>)> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Json(request) = payload?;

    let (share, status) =
        domain::create_share(state.store.as_ref(), &state.settings, &principal, request).await?;

    info!(share_id = share.id, status = %status.status, "Share created");
    Ok((StatusCode::CREATED, Json(share)))
}

/// PUT /shares
#[tracing::instrument(skip(state, headers, payload), fields(endpoint = "update_share"))]
pub async fn update_share_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> ApiResult<Json<ShareRequestRecord>> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Json(request) = payload?;

    let share = domain::update_share(state.store.as_ref(), &principal, request).await?;
    Ok(Json(share))
}

/// GET /shares/{id}
#[tracing::instrument(skip(state, headers, share_id), fields(endpoint = "get_share"))]
pub async fn get_share_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    share_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ShareRequestRecord>> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Path(share_id) = share_id?;

    let share = domain::get_share(state.store.as_ref(), &principal, share_id).await?;
    Ok(Json(share))
}

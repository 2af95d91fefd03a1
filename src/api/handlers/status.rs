// Share status handlers - JWT authenticated

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    Json,
};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::domain;
use crate::models::{ShareStatusRecord, StatusCriteria, StatusUpdateRequest};

/// GET /shares/status/{id}
#[tracing::instrument(skip(state, headers, share_id), fields(endpoint = "get_status"))]
pub async fn get_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    share_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ShareStatusRecord>> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Path(share_id) = share_id?;

    let status = domain::get_status(state.store.as_ref(), &principal, share_id).await?;
    Ok(Json(status))
}

/// GET /shares/status?institution_id=&status=&from=&to=&limit=
/// Results are scoped to what the caller may see.
/// `from`/`to` are RFC 3339 timestamps. A numeric offset must be sent as
/// `%2B00:00`: a bare `+` in a query string decodes to a space and is rejected.
/// `Z` needs no escaping.
#[tracing::instrument(skip(state, headers, criteria), fields(endpoint = "query_status"))]
pub async fn query_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    criteria: Result<Query<StatusCriteria>, QueryRejection>,
) -> ApiResult<Json<Vec<ShareStatusRecord>>> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Query(criteria) = criteria?;

    let records = domain::query_by_criteria(state.store.as_ref(), &principal, criteria).await?;
    Ok(Json(records))
}

/// PUT /shares/status/{id}
/// Delivery confirmations and failures reported by the owner or support
#[tracing::instrument(skip(state, headers, share_id, payload), fields(endpoint = "record_status"))]
pub async fn record_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    share_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<ShareStatusRecord>> {
    let principal = state.jwt.principal_from_headers(&headers)?;
    let Path(share_id) = share_id?;
    let Json(update) = payload?;

    let status = domain::record_status(state.store.as_ref(), &principal, share_id, update).await?;
    Ok(Json(status))
}

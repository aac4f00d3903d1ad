//! Return request endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::return_request::{ReturnRequest, ReturnRequestQuery, SettleReturn},
    services::returns::SettlementOutcome,
    AppState,
};

use super::AuthenticatedUser;

/// List return requests
#[utoipa::path(
    get,
    path = "/return-requests",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(ReturnRequestQuery),
    responses(
        (status = 200, description = "Return requests", body = Vec<ReturnRequest>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_return_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReturnRequestQuery>,
) -> AppResult<Json<Vec<ReturnRequest>>> {
    let requests = state
        .services
        .returns
        .list_return_requests(&claims.actor(), query)
        .await?;
    Ok(Json(requests))
}

/// Get a return request
#[utoipa::path(
    get,
    path = "/return-requests/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return request ID")),
    responses(
        (status = 200, description = "Return request", body = ReturnRequest),
        (status = 404, description = "Return request not found")
    )
)]
pub async fn get_return_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnRequest>> {
    let request = state.services.returns.get_return_request(&claims.actor(), id).await?;
    Ok(Json(request))
}

/// Record the inspection of a returned book and close its borrowing
#[utoipa::path(
    post,
    path = "/return-requests/{id}/settle",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return request ID")),
    request_body = SettleReturn,
    responses(
        (status = 200, description = "Return settled", body = SettlementOutcome),
        (status = 400, description = "Missing fine level or note"),
        (status = 404, description = "Return request or fine level not found"),
        (status = 409, description = "Return request already confirmed")
    )
)]
pub async fn settle_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SettleReturn>,
) -> AppResult<Json<SettlementOutcome>> {
    let outcome = state.services.returns.settle(&claims.actor(), id, request).await?;
    Ok(Json(outcome))
}

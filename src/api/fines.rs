//! Fine payment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::fine::{Fine, FineQuery, PayFine, RejectFine},
    AppState,
};

use super::AuthenticatedUser;

/// List all fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Fines", body = Vec<Fine>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_fines(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.fines.list(&claims.actor(), query).await?;
    Ok(Json(fines))
}

/// List the caller's fines
#[utoipa::path(
    get,
    path = "/fines/mine",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Caller's fines", body = Vec<Fine>)
    )
)]
pub async fn list_my_fines(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.fines.list_mine(&claims.actor(), query).await?;
    Ok(Json(fines))
}

/// Get a fine
#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine", body = Fine),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.get(&claims.actor(), id).await?;
    Ok(Json(fine))
}

/// Submit a payment proof
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine ID")),
    request_body = PayFine,
    responses(
        (status = 200, description = "Payment submitted", body = Fine),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Fine is pending or paid")
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<PayFine>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.pay(&claims.actor(), id, request).await?;
    Ok(Json(fine))
}

/// Accept a submitted payment
#[utoipa::path(
    post,
    path = "/fines/{id}/confirm",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 409, description = "No payment awaiting confirmation")
    )
)]
pub async fn confirm_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.confirm(&claims.actor(), id).await?;
    Ok(Json(fine))
}

/// Refuse a submitted payment
#[utoipa::path(
    post,
    path = "/fines/{id}/reject",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine ID")),
    request_body = RejectFine,
    responses(
        (status = 200, description = "Payment rejected", body = Fine),
        (status = 409, description = "No payment awaiting confirmation")
    )
)]
pub async fn reject_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RejectFine>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.reject(&claims.actor(), id, request).await?;
    Ok(Json(fine))
}

//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrowing::{BorrowingQuery, BorrowingView, CreateBorrowing, RejectBorrowing},
        return_request::ReturnRequest,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Request to borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrow request filed", body = BorrowingView),
        (status = 400, description = "Invalid duration"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Reader not eligible")
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<BorrowingView>)> {
    let borrowing = state.services.borrowings.create(&claims.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// List all borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings", body = Vec<BorrowingView>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingView>>> {
    let borrowings = state.services.borrowings.list(&claims.actor(), query).await?;
    Ok(Json(borrowings))
}

/// List the caller's borrowings
#[utoipa::path(
    get,
    path = "/borrowings/mine",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Caller's borrowings", body = Vec<BorrowingView>)
    )
)]
pub async fn list_my_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingView>>> {
    let borrowings = state.services.borrowings.list_mine(&claims.actor(), query).await?;
    Ok(Json(borrowings))
}

/// Get a borrowing
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing", body = BorrowingView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingView>> {
    let borrowing = state.services.borrowings.get(&claims.actor(), id).await?;
    Ok(Json(borrowing))
}

/// Withdraw a pending borrow request
#[utoipa::path(
    delete,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 204, description = "Request withdrawn"),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Borrowing is no longer pending")
    )
)]
pub async fn cancel_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.borrowings.cancel(&claims.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a closed borrowing from history
#[utoipa::path(
    delete,
    path = "/borrowings/{id}/history",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 204, description = "Borrowing removed"),
        (status = 409, description = "Borrowing still open or referenced by fines")
    )
)]
pub async fn remove_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.borrowings.remove_history(&claims.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand the book over to the reader
#[utoipa::path(
    post,
    path = "/borrowings/{id}/confirm",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing confirmed", body = BorrowingView),
        (status = 409, description = "Not pending, or no copy left")
    )
)]
pub async fn confirm_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingView>> {
    let borrowing = state.services.borrowings.confirm(&claims.actor(), id).await?;
    Ok(Json(borrowing))
}

/// Refuse a borrow request
#[utoipa::path(
    post,
    path = "/borrowings/{id}/reject",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    request_body = RejectBorrowing,
    responses(
        (status = 200, description = "Borrowing rejected", body = BorrowingView),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Borrowing is not pending")
    )
)]
pub async fn reject_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RejectBorrowing>,
) -> AppResult<Json<BorrowingView>> {
    let borrowing = state
        .services
        .borrowings
        .reject(&claims.actor(), id, request)
        .await?;
    Ok(Json(borrowing))
}

/// Extend the due date once
#[utoipa::path(
    post,
    path = "/borrowings/{id}/extend",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing extended", body = BorrowingView),
        (status = 409, description = "Borrowing is not on loan"),
        (status = 422, description = "Already extended, overdue or unpaid fines")
    )
)]
pub async fn extend_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingView>> {
    let borrowing = state.services.borrowings.extend(&claims.actor(), id).await?;
    Ok(Json(borrowing))
}

/// Announce a return
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return-request",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 201, description = "Return requested", body = ReturnRequest),
        (status = 409, description = "Borrowing is not on loan"),
        (status = 422, description = "A return request is already pending")
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<ReturnRequest>)> {
    let request = state
        .services
        .borrowings
        .request_return(&claims.actor(), id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

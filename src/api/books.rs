//! Book inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, NewBook, UpdateQuantity},
    services::eligibility::EligibilityReport,
    AppState,
};

use super::AuthenticatedUser;

/// Register a book with its number of copies
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book registered", body = Book),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn register_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<NewBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.inventory.register_book(&claims.actor(), book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a book with its quantities
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.inventory.get_book(id).await?;
    Ok(Json(book))
}

/// Change the number of owned copies
#[utoipa::path(
    put,
    path = "/books/{id}/quantity",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateQuantity,
    responses(
        (status = 200, description = "Quantities updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Total below the borrowed copies")
    )
)]
pub async fn set_total_quantity(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateQuantity>,
) -> AppResult<Json<Book>> {
    validator::Validate::validate(&request)?;
    let book = state
        .services
        .inventory
        .set_total_quantity(&claims.actor(), id, request.total_quantity)
        .await?;
    Ok(Json(book))
}

/// Tell the caller whether a borrow request for this book would be accepted
#[utoipa::path(
    get,
    path = "/books/{id}/eligibility",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Eligibility of the caller", body = EligibilityReport),
        (status = 404, description = "Book not found")
    )
)]
pub async fn check_eligibility(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<EligibilityReport>> {
    let report = state
        .services
        .borrowings
        .check_eligibility(&claims.actor(), id)
        .await?;
    Ok(Json(report))
}

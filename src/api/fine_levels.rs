//! Fine level endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::fine_level::{CreateFineLevel, FineLevel, UpdateFineLevel},
    AppState,
};

use super::AuthenticatedUser;

/// List fine levels
#[utoipa::path(
    get,
    path = "/fine-levels",
    tag = "fine-levels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fine levels", body = Vec<FineLevel>)
    )
)]
pub async fn list_fine_levels(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<FineLevel>>> {
    let levels = state.services.fine_levels.list().await?;
    Ok(Json(levels))
}

/// Get a fine level
#[utoipa::path(
    get,
    path = "/fine-levels/{id}",
    tag = "fine-levels",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine level ID")),
    responses(
        (status = 200, description = "Fine level", body = FineLevel),
        (status = 404, description = "Fine level not found")
    )
)]
pub async fn get_fine_level(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<FineLevel>> {
    let level = state.services.fine_levels.get(id).await?;
    Ok(Json(level))
}

/// Create a fine level
#[utoipa::path(
    post,
    path = "/fine-levels",
    tag = "fine-levels",
    security(("bearer_auth" = [])),
    request_body = CreateFineLevel,
    responses(
        (status = 201, description = "Fine level created", body = FineLevel),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_fine_level(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateFineLevel>,
) -> AppResult<(StatusCode, Json<FineLevel>)> {
    let level = state.services.fine_levels.create(&claims.actor(), data).await?;
    Ok((StatusCode::CREATED, Json(level)))
}

/// Update a fine level; existing fines keep their amount
#[utoipa::path(
    put,
    path = "/fine-levels/{id}",
    tag = "fine-levels",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine level ID")),
    request_body = UpdateFineLevel,
    responses(
        (status = 200, description = "Fine level updated", body = FineLevel),
        (status = 404, description = "Fine level not found"),
        (status = 409, description = "Name already used")
    )
)]
pub async fn update_fine_level(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateFineLevel>,
) -> AppResult<Json<FineLevel>> {
    let level = state.services.fine_levels.update(&claims.actor(), id, data).await?;
    Ok(Json(level))
}

/// Delete an unused fine level
#[utoipa::path(
    delete,
    path = "/fine-levels/{id}",
    tag = "fine-levels",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Fine level ID")),
    responses(
        (status = 204, description = "Fine level deleted"),
        (status = 404, description = "Fine level not found"),
        (status = 422, description = "Fine level still referenced by fines")
    )
)]
pub async fn delete_fine_level(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.fine_levels.delete(&claims.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Statistics endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::stats::{ConditionEntry, ConditionQuery, DailyActivity, DailyActivityQuery, FineTotal},
    AppState,
};

use super::AuthenticatedUser;

/// Borrowed, returned and overdue counts per day
#[utoipa::path(
    get,
    path = "/stats/daily",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(DailyActivityQuery),
    responses(
        (status = 200, description = "Daily activity", body = Vec<DailyActivity>),
        (status = 400, description = "Invalid range")
    )
)]
pub async fn get_daily_activity(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DailyActivityQuery>,
) -> AppResult<Json<Vec<DailyActivity>>> {
    let activity = state
        .services
        .stats
        .daily_activity(&claims.actor(), query.from, query.to)
        .await?;
    Ok(Json(activity))
}

/// Fine counts and amounts per reason
#[utoipa::path(
    get,
    path = "/stats/fines",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fine totals", body = Vec<FineTotal>)
    )
)]
pub async fn get_fine_totals(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<FineTotal>>> {
    let totals = state.services.stats.fine_totals(&claims.actor()).await?;
    Ok(Json(totals))
}

/// Books returned in the given condition
#[utoipa::path(
    get,
    path = "/stats/conditions",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(ConditionQuery),
    responses(
        (status = 200, description = "Returned borrowings", body = Vec<ConditionEntry>)
    )
)]
pub async fn get_condition_report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ConditionQuery>,
) -> AppResult<Json<Vec<ConditionEntry>>> {
    let entries = state
        .services
        .stats
        .condition_report(&claims.actor(), query.condition)
        .await?;
    Ok(Json(entries))
}

//! API handlers for Lectern REST endpoints

pub mod books;
pub mod borrowings;
pub mod fine_levels;
pub mod fines;
pub mod health;
pub mod openapi;
pub mod returns;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Inventory
        .route("/books", post(books::register_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/quantity", put(books::set_total_quantity))
        .route("/books/:id/eligibility", get(books::check_eligibility))
        // Borrowings
        .route("/borrowings", post(borrowings::create_borrowing))
        .route("/borrowings", get(borrowings::list_borrowings))
        .route("/borrowings/mine", get(borrowings::list_my_borrowings))
        .route("/borrowings/:id", get(borrowings::get_borrowing))
        .route("/borrowings/:id", delete(borrowings::cancel_borrowing))
        .route("/borrowings/:id/history", delete(borrowings::remove_history))
        .route("/borrowings/:id/confirm", post(borrowings::confirm_borrowing))
        .route("/borrowings/:id/reject", post(borrowings::reject_borrowing))
        .route("/borrowings/:id/extend", post(borrowings::extend_borrowing))
        .route("/borrowings/:id/return-request", post(borrowings::request_return))
        // Returns
        .route("/return-requests", get(returns::list_return_requests))
        .route("/return-requests/:id", get(returns::get_return_request))
        .route("/return-requests/:id/settle", post(returns::settle_return))
        // Fines
        .route("/fines", get(fines::list_fines))
        .route("/fines/mine", get(fines::list_my_fines))
        .route("/fines/:id", get(fines::get_fine))
        .route("/fines/:id/pay", post(fines::pay_fine))
        .route("/fines/:id/confirm", post(fines::confirm_fine))
        .route("/fines/:id/reject", post(fines::reject_fine))
        // Fine levels
        .route("/fine-levels", get(fine_levels::list_fine_levels))
        .route("/fine-levels", post(fine_levels::create_fine_level))
        .route("/fine-levels/:id", get(fine_levels::get_fine_level))
        .route("/fine-levels/:id", put(fine_levels::update_fine_level))
        .route("/fine-levels/:id", delete(fine_levels::delete_fine_level))
        // Statistics
        .route("/stats/daily", get(stats::get_daily_activity))
        .route("/stats/fines", get(stats::get_fine_totals))
        .route("/stats/conditions", get(stats::get_condition_report))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

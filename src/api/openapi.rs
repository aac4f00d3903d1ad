//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrowings, fine_levels, fines, health, returns, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lectern API",
        version = "1.0.0",
        description = "Library circulation REST API: borrowings, returns and fines"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Books
        books::register_book,
        books::get_book,
        books::set_total_quantity,
        books::check_eligibility,
        // Borrowings
        borrowings::create_borrowing,
        borrowings::list_borrowings,
        borrowings::list_my_borrowings,
        borrowings::get_borrowing,
        borrowings::cancel_borrowing,
        borrowings::remove_history,
        borrowings::confirm_borrowing,
        borrowings::reject_borrowing,
        borrowings::extend_borrowing,
        borrowings::request_return,
        // Returns
        returns::list_return_requests,
        returns::get_return_request,
        returns::settle_return,
        // Fines
        fines::list_fines,
        fines::list_my_fines,
        fines::get_fine,
        fines::pay_fine,
        fines::confirm_fine,
        fines::reject_fine,
        // Fine levels
        fine_levels::list_fine_levels,
        fine_levels::get_fine_level,
        fine_levels::create_fine_level,
        fine_levels::update_fine_level,
        fine_levels::delete_fine_level,
        // Stats
        stats::get_daily_activity,
        stats::get_fine_totals,
        stats::get_condition_report,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::NewBook,
            crate::models::book::UpdateQuantity,
            crate::services::eligibility::EligibilityReport,
            crate::services::eligibility::EligibilitySnapshot,
            crate::services::eligibility::Ineligibility,
            // Borrowings
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::BorrowingView,
            crate::models::borrowing::BorrowingStatus,
            crate::models::borrowing::BorrowingState,
            crate::models::borrowing::BookCondition,
            crate::models::borrowing::CreateBorrowing,
            crate::models::borrowing::RejectBorrowing,
            // Returns
            crate::models::return_request::ReturnRequest,
            crate::models::return_request::ReturnRequestStatus,
            crate::models::return_request::SettleReturn,
            crate::services::returns::SettlementOutcome,
            // Fines
            crate::models::fine::Fine,
            crate::models::fine::FineReason,
            crate::models::fine::FineStatus,
            crate::models::fine::PayFine,
            crate::models::fine::RejectFine,
            crate::models::fine_level::FineLevel,
            crate::models::fine_level::CreateFineLevel,
            crate::models::fine_level::UpdateFineLevel,
            // Stats
            crate::models::stats::DailyActivity,
            crate::models::stats::FineTotal,
            crate::models::stats::ConditionEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book inventory"),
        (name = "borrowings", description = "Borrow requests and loans"),
        (name = "returns", description = "Return inspection and settlement"),
        (name = "fines", description = "Fine payments"),
        (name = "fine-levels", description = "Fine level reference data"),
        (name = "stats", description = "Circulation statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

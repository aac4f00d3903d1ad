//! Return inspection and settlement
//!
//! Settlement closes the borrowing, puts the copy back on the shelf (or writes
//! it off when lost), emits zero to two fines and confirms the return request,
//! all in one unit of work.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use super::require_text;
use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::{BookCondition, Borrowing, BorrowingView},
        fine::{Fine, FineReason, NewFine},
        return_request::{ReturnRequest, ReturnRequestQuery, SettleReturn},
        user::Actor,
    },
    repository::Store,
};

/// A fine settlement will create, before its amount is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFine {
    pub reason: FineReason,
    pub fine_level_id: i32,
    pub note: Option<String>,
}

/// Result of a settled return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettlementOutcome {
    pub return_request: ReturnRequest,
    pub borrowing: BorrowingView,
    pub fines: Vec<Fine>,
}

/// Decide which fines a return produces. Fails before anything is written
/// when the inspection lacks a required level or note.
pub fn plan_fines(
    borrowing: &Borrowing,
    request: &SettleReturn,
    today: NaiveDate,
    max_note_length: usize,
) -> AppResult<Vec<PlannedFine>> {
    let days_overdue = borrowing.days_overdue(today);
    let mut fines = Vec::with_capacity(2);

    match request.book_condition {
        BookCondition::Damaged | BookCondition::Lost => {
            let level = request.fine_level_id.ok_or_else(|| {
                AppError::Validation(format!(
                    "A fine level is required for a {} book",
                    request.book_condition
                ))
            })?;
            let note = require_text("Note", request.note.as_deref(), max_note_length)?;
            let reason = if request.book_condition == BookCondition::Lost {
                FineReason::Lost
            } else {
                FineReason::Damaged
            };
            fines.push(PlannedFine {
                reason,
                fine_level_id: level,
                note: Some(note),
            });

            // Loss supersedes lateness
            if request.book_condition == BookCondition::Damaged && days_overdue > 0 {
                fines.push(late_fine(
                    request.late_fine_level_id.unwrap_or(level),
                    days_overdue,
                    borrowing.due_date,
                ));
            }
        }
        BookCondition::Normal if days_overdue > 0 => {
            let level = request
                .late_fine_level_id
                .or(request.fine_level_id)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "A fine level is required for a return {} days late",
                        days_overdue
                    ))
                })?;
            fines.push(late_fine(level, days_overdue, borrowing.due_date));
        }
        BookCondition::Normal => {}
    }

    Ok(fines)
}

fn late_fine(fine_level_id: i32, days_overdue: i64, due_date: NaiveDate) -> PlannedFine {
    PlannedFine {
        reason: FineReason::LateReturn,
        fine_level_id,
        note: Some(format!("Late by {} days (due {})", days_overdue, due_date)),
    }
}

#[derive(Clone)]
pub struct ReturnsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: CirculationConfig,
}

impl ReturnsService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: CirculationConfig) -> Self {
        Self { store, clock, policy }
    }

    pub async fn list_return_requests(
        &self,
        actor: &Actor,
        query: ReturnRequestQuery,
    ) -> AppResult<Vec<ReturnRequest>> {
        actor.require_staff()?;
        let mut tx = self.store.begin().await?;
        tx.return_requests_list(query.status).await
    }

    pub async fn get_return_request(&self, actor: &Actor, id: i32) -> AppResult<ReturnRequest> {
        let mut tx = self.store.begin().await?;
        let request = tx.return_requests_get_by_id(id).await?;
        let borrowing = tx.borrowings_get_by_id(request.borrowing_id).await?;
        actor.require_owner_or_staff(borrowing.reader_id)?;
        Ok(request)
    }

    /// Inspect a returned book and close its borrowing
    pub async fn settle(
        &self,
        actor: &Actor,
        return_request_id: i32,
        request: SettleReturn,
    ) -> AppResult<SettlementOutcome> {
        actor.require_staff()?;
        request.validate()?;

        let today = self.clock.today();
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut return_request = tx.return_requests_get_for_update(return_request_id).await?;
        return_request.confirm(actor.user_id, now)?;

        let mut borrowing = tx.borrowings_get_for_update(return_request.borrowing_id).await?;
        borrowing.status.ensure_on_loan()?;
        let planned = plan_fines(&borrowing, &request, today, self.policy.max_reason_length)?;

        // Levels are resolved before the first write so a missing one aborts cleanly
        let mut fines = Vec::with_capacity(planned.len());
        for plan in planned {
            let level = tx.fine_levels_get_by_id(plan.fine_level_id).await?;
            fines.push(NewFine {
                reader_id: borrowing.reader_id,
                borrowing_id: borrowing.id,
                fine_level_id: level.id,
                reason: plan.reason,
                amount: level.amount,
                note: plan.note,
            });
        }

        let days_overdue = borrowing.days_overdue(today);
        borrowing.settle(actor.user_id, now, today, request.book_condition)?;

        let book = tx.books_get_for_update(borrowing.book_id).await?;
        let inventory = match request.book_condition {
            BookCondition::Lost => book.inventory().write_off()?,
            _ => book.inventory().check_in()?,
        };
        tx.books_update_inventory(book.id, inventory).await?;
        tx.borrowings_update(&borrowing).await?;

        let mut created = Vec::with_capacity(fines.len());
        for fine in &fines {
            created.push(tx.fines_create(fine).await?);
        }

        tx.return_requests_update(&return_request).await?;
        tx.commit().await?;

        tracing::info!(
            "Return {} settled by {}: borrowing {} {} ({} days overdue, {} fines)",
            return_request_id,
            actor.user_id,
            borrowing.id,
            request.book_condition,
            days_overdue,
            created.len()
        );
        Ok(SettlementOutcome {
            return_request,
            borrowing: borrowing.view(today),
            fines: created,
        })
    }
}

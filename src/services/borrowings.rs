//! Borrowing lifecycle service
//!
//! pending -> borrowed -> returned, pending -> rejected, pending -> (deleted on
//! cancel). Overdue is derived on read. Confirmation moves one copy out of the
//! inventory in the same unit of work as the status change.

use std::sync::Arc;

use chrono::Duration;
use validator::Validate;

use super::{
    eligibility::{self, EligibilityReport},
    require_text,
};
use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::{
            BorrowingQuery, BorrowingState, BorrowingStatus, BorrowingView,
            CreateBorrowing, NewBorrowing, RejectBorrowing,
        },
        return_request::ReturnRequest,
        user::Actor,
    },
    repository::{BorrowingFilter, Store},
};

#[derive(Clone)]
pub struct BorrowingsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: CirculationConfig,
}

impl BorrowingsService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: CirculationConfig) -> Self {
        Self { store, clock, policy }
    }

    /// Would a borrow request for this book be accepted right now
    pub async fn check_eligibility(&self, actor: &Actor, book_id: i32) -> AppResult<EligibilityReport> {
        let mut tx = self.store.begin().await?;
        let snapshot = eligibility::read_snapshot(&mut *tx, actor.user_id, book_id, false).await?;
        Ok(EligibilityReport::new(snapshot, &self.policy))
    }

    /// File a borrow request for the acting reader
    pub async fn create(&self, actor: &Actor, request: CreateBorrowing) -> AppResult<BorrowingView> {
        actor.require_reader()?;
        let days = request.borrow_days.unwrap_or(self.policy.default_borrow_days);
        if days < self.policy.min_borrow_days || days > self.policy.max_borrow_days {
            return Err(AppError::Validation(format!(
                "Borrow duration must be between {} and {} days",
                self.policy.min_borrow_days, self.policy.max_borrow_days
            )));
        }

        let today = self.clock.today();
        let mut tx = self.store.begin().await?;

        // The gate runs again here, with the reader and the book row locked
        let snapshot = eligibility::read_snapshot(&mut *tx, actor.user_id, request.book_id, true).await?;
        eligibility::check(&snapshot, &self.policy)?;

        let borrowing = tx
            .borrowings_create(&NewBorrowing {
                reader_id: actor.user_id,
                book_id: request.book_id,
                borrow_date: today,
                due_date: today + Duration::days(days),
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Borrowing {} requested by reader {} for book {} (due {})",
            borrowing.id,
            actor.user_id,
            borrowing.book_id,
            borrowing.due_date
        );
        Ok(borrowing.view(today))
    }

    /// Hand the book over: pending -> borrowed, one copy leaves the shelf
    pub async fn confirm(&self, actor: &Actor, borrowing_id: i32) -> AppResult<BorrowingView> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        let mut borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        borrowing.confirm(actor.user_id, self.clock.now())?;

        // Availability is re-read under the row lock; a concurrent confirmation of
        // the last copy makes this one fail instead of overdrawing
        let book = tx.books_get_for_update(borrowing.book_id).await?;
        let inventory = book.inventory().check_out().map_err(|e| {
            tracing::warn!("Borrowing {} cannot be confirmed: {}", borrowing_id, e);
            e
        })?;

        tx.books_update_inventory(book.id, inventory).await?;
        tx.borrowings_update(&borrowing).await?;
        tx.commit().await?;

        tracing::info!(
            "Borrowing {} confirmed by {} (book {}: {} available)",
            borrowing_id,
            actor.user_id,
            book.id,
            inventory.available
        );
        Ok(borrowing.view(self.clock.today()))
    }

    /// Refuse a pending request; inventory is untouched
    pub async fn reject(
        &self,
        actor: &Actor,
        borrowing_id: i32,
        request: RejectBorrowing,
    ) -> AppResult<BorrowingView> {
        actor.require_staff()?;
        request.validate()?;
        let reason = require_text("Reason", Some(&request.reason), self.policy.max_reason_length)?;

        let mut tx = self.store.begin().await?;
        let mut borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        borrowing.reject(actor.user_id, self.clock.now(), reason)?;
        tx.borrowings_update(&borrowing).await?;
        tx.commit().await?;

        tracing::info!("Borrowing {} rejected by {}", borrowing_id, actor.user_id);
        Ok(borrowing.view(self.clock.today()))
    }

    /// The reader withdraws a pending request; the record is deleted
    pub async fn cancel(&self, actor: &Actor, borrowing_id: i32) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        actor.require_owner(borrowing.reader_id)?;
        borrowing.status.ensure_cancellable()?;
        tx.borrowings_delete(borrowing_id).await?;
        tx.commit().await?;

        tracing::info!("Borrowing {} cancelled by reader {}", borrowing_id, actor.user_id);
        Ok(())
    }

    /// Push the due date back once, while on time and free of fines
    pub async fn extend(&self, actor: &Actor, borrowing_id: i32) -> AppResult<BorrowingView> {
        let today = self.clock.today();
        let mut tx = self.store.begin().await?;
        let mut borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        actor.require_owner(borrowing.reader_id)?;

        borrowing.extend(today, self.policy.extension_days, self.policy.max_extensions)?;
        if tx.fines_count_outstanding(borrowing.reader_id).await? > 0 {
            return Err(AppError::PolicyViolation(
                "Borrowings cannot be extended while fines are unpaid".to_string(),
            ));
        }

        tx.borrowings_update(&borrowing).await?;
        tx.commit().await?;

        tracing::info!("Borrowing {} extended to {}", borrowing_id, borrowing.due_date);
        Ok(borrowing.view(today))
    }

    /// The reader announces they are bringing the book back
    pub async fn request_return(&self, actor: &Actor, borrowing_id: i32) -> AppResult<ReturnRequest> {
        let today = self.clock.today();
        let mut tx = self.store.begin().await?;
        let borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        actor.require_owner(borrowing.reader_id)?;
        borrowing.status.ensure_on_loan()?;

        if tx.return_requests_find_pending(borrowing_id).await?.is_some() {
            return Err(AppError::PolicyViolation(
                "A return request is already awaiting inspection".to_string(),
            ));
        }

        let request = tx.return_requests_create(borrowing_id, today).await?;
        tx.commit().await?;

        tracing::info!("Return requested for borrowing {} ({})", borrowing_id, request.id);
        Ok(request)
    }

    pub async fn get(&self, actor: &Actor, borrowing_id: i32) -> AppResult<BorrowingView> {
        let mut tx = self.store.begin().await?;
        let borrowing = tx.borrowings_get_by_id(borrowing_id).await?;
        actor.require_owner_or_staff(borrowing.reader_id)?;
        Ok(borrowing.view(self.clock.today()))
    }

    /// Borrowings of the acting reader
    pub async fn list_mine(&self, actor: &Actor, query: BorrowingQuery) -> AppResult<Vec<BorrowingView>> {
        let query = BorrowingQuery {
            reader_id: Some(actor.user_id),
            ..query
        };
        self.list_filtered(query).await
    }

    /// All borrowings, for the back office
    pub async fn list(&self, actor: &Actor, query: BorrowingQuery) -> AppResult<Vec<BorrowingView>> {
        actor.require_staff()?;
        self.list_filtered(query).await
    }

    async fn list_filtered(&self, query: BorrowingQuery) -> AppResult<Vec<BorrowingView>> {
        let today = self.clock.today();
        let filter = BorrowingFilter {
            reader_id: query.reader_id,
            book_id: query.book_id,
            status: query.status.map(persisted_status),
        };

        let mut tx = self.store.begin().await?;
        let rows = tx.borrowings_list(&filter).await?;
        Ok(rows
            .into_iter()
            .map(|b| b.view(today))
            .filter(|v| query.status.map_or(true, |s| v.state == s))
            .collect())
    }

    /// Drop a closed borrowing from history once nothing refers to it
    pub async fn remove_history(&self, actor: &Actor, borrowing_id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        let borrowing = tx.borrowings_get_for_update(borrowing_id).await?;
        if !matches!(borrowing.status, BorrowingStatus::Returned | BorrowingStatus::Rejected) {
            return Err(AppError::InvalidState(format!(
                "A {} borrowing is still open",
                borrowing.status
            )));
        }
        tx.borrowings_delete(borrowing_id).await?;
        tx.commit().await?;

        tracing::info!("Borrowing {} removed from history by {}", borrowing_id, actor.user_id);
        Ok(())
    }
}

fn persisted_status(state: BorrowingState) -> BorrowingStatus {
    match state {
        BorrowingState::Pending => BorrowingStatus::Pending,
        BorrowingState::Borrowed | BorrowingState::Overdue => BorrowingStatus::Borrowed,
        BorrowingState::Returned => BorrowingStatus::Returned,
        BorrowingState::Rejected => BorrowingStatus::Rejected,
    }
}

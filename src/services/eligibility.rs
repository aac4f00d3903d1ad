//! Borrow eligibility gate
//!
//! The gate is a pure predicate over a snapshot of the reader's situation.
//! When called outside a unit of work its answer is advisory: the borrow
//! request itself re-reads the snapshot inside its own transaction.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    repository::LibraryTx,
};

/// Everything the gate looks at, read from one consistent view of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct EligibilitySnapshot {
    pub book_available: i32,
    /// Borrowings in pending or borrowed (overdue included)
    pub active_borrowings: i64,
    /// Fines not yet paid
    pub outstanding_fines: i64,
    /// Reader already has a pending request for this book
    pub has_pending_request: bool,
}

/// Why a borrow request would be refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    BookUnavailable,
    BorrowLimitReached,
    OutstandingFines,
    DuplicateRequest,
}

impl Ineligibility {
    pub fn message(&self, policy: &CirculationConfig) -> String {
        match self {
            Ineligibility::BookUnavailable => "Book has no available copy".to_string(),
            Ineligibility::BorrowLimitReached => format!(
                "Reader already has {} active borrowings",
                policy.max_active_borrowings
            ),
            Ineligibility::OutstandingFines => "Reader has unpaid fines".to_string(),
            Ineligibility::DuplicateRequest => {
                "Reader already has a pending request for this book".to_string()
            }
        }
    }
}

/// Advisory answer returned to a reader before they file a request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub reason: Option<Ineligibility>,
    pub message: Option<String>,
    pub snapshot: EligibilitySnapshot,
}

impl EligibilityReport {
    pub fn new(snapshot: EligibilitySnapshot, policy: &CirculationConfig) -> Self {
        let reason = evaluate(&snapshot, policy).err();
        Self {
            eligible: reason.is_none(),
            reason,
            message: reason.map(|r| r.message(policy)),
            snapshot,
        }
    }
}

/// Checks in a fixed order and reports the first refusal
pub fn evaluate(snapshot: &EligibilitySnapshot, policy: &CirculationConfig) -> Result<(), Ineligibility> {
    if snapshot.book_available <= 0 {
        return Err(Ineligibility::BookUnavailable);
    }
    if snapshot.active_borrowings >= i64::from(policy.max_active_borrowings) {
        return Err(Ineligibility::BorrowLimitReached);
    }
    if snapshot.outstanding_fines > 0 {
        return Err(Ineligibility::OutstandingFines);
    }
    if snapshot.has_pending_request {
        return Err(Ineligibility::DuplicateRequest);
    }
    Ok(())
}

/// Read the snapshot through a unit of work. With `for_update` the reader and
/// the book row are both held until the unit of work ends, so two requests of
/// the same reader are counted one after the other.
pub async fn read_snapshot(
    tx: &mut dyn LibraryTx,
    reader_id: i32,
    book_id: i32,
    for_update: bool,
) -> AppResult<EligibilitySnapshot> {
    let book = if for_update {
        tx.borrowings_lock_reader(reader_id).await?;
        tx.books_get_for_update(book_id).await?
    } else {
        tx.books_get_by_id(book_id).await?
    };
    Ok(EligibilitySnapshot {
        book_available: book.available_quantity,
        active_borrowings: tx.borrowings_count_active(reader_id).await?,
        outstanding_fines: tx.fines_count_outstanding(reader_id).await?,
        has_pending_request: tx.borrowings_has_pending(reader_id, book_id).await?,
    })
}

/// Gate result as an application error
pub fn check(snapshot: &EligibilitySnapshot, policy: &CirculationConfig) -> AppResult<()> {
    evaluate(snapshot, policy).map_err(|reason| {
        tracing::warn!("Borrow request refused: {:?}", reason);
        AppError::PolicyViolation(reason.message(policy))
    })
}

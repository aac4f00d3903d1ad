//! Borrowing model and its status machine

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Persisted borrowing status.
///
/// `overdue` is never stored; see [`BorrowingState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Pending,
    Borrowed,
    Returned,
    Rejected,
}

text_enum!(BorrowingStatus {
    Pending => "pending",
    Borrowed => "borrowed",
    Returned => "returned",
    Rejected => "rejected",
});

impl BorrowingStatus {
    /// pending -> borrowed
    pub fn confirm(self) -> AppResult<Self> {
        match self {
            BorrowingStatus::Pending => Ok(BorrowingStatus::Borrowed),
            other => Err(invalid(other, "confirmed")),
        }
    }

    /// pending -> rejected
    pub fn reject(self) -> AppResult<Self> {
        match self {
            BorrowingStatus::Pending => Ok(BorrowingStatus::Rejected),
            other => Err(invalid(other, "rejected")),
        }
    }

    /// borrowed -> returned
    pub fn settle(self) -> AppResult<Self> {
        match self {
            BorrowingStatus::Borrowed => Ok(BorrowingStatus::Returned),
            other => Err(invalid(other, "returned")),
        }
    }

    /// Only a request that never consumed inventory can be withdrawn
    pub fn ensure_cancellable(self) -> AppResult<()> {
        match self {
            BorrowingStatus::Pending => Ok(()),
            other => Err(invalid(other, "cancelled")),
        }
    }

    /// The book is in the reader's hands
    pub fn ensure_on_loan(self) -> AppResult<()> {
        match self {
            BorrowingStatus::Borrowed => Ok(()),
            other => Err(AppError::InvalidState(format!(
                "Borrowing is {}, the book is not on loan",
                other
            ))),
        }
    }

    /// Counts against the per-reader limit
    pub fn is_active(self) -> bool {
        matches!(self, BorrowingStatus::Pending | BorrowingStatus::Borrowed)
    }
}

fn invalid(from: BorrowingStatus, to: &str) -> AppError {
    AppError::InvalidState(format!("A {} borrowing cannot be {}", from, to))
}

/// Status as shown to users, with overdue derived from the due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingState {
    Pending,
    Borrowed,
    Overdue,
    Returned,
    Rejected,
}

text_enum!(BorrowingState {
    Pending => "pending",
    Borrowed => "borrowed",
    Overdue => "overdue",
    Returned => "returned",
    Rejected => "rejected",
});

/// Condition of a book when it comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookCondition {
    Normal,
    Damaged,
    Lost,
}

text_enum!(BookCondition {
    Normal => "normal",
    Damaged => "damaged",
    Lost => "lost",
});

/// Borrowing model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub reader_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub extended_count: i16,
    pub book_condition: Option<BookCondition>,
    pub status: BorrowingStatus,
    pub confirmed_by: Option<i32>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<i32>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub returned_by: Option<i32>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Borrowing {
    /// Due date has passed while the book is still out
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == BorrowingStatus::Borrowed && today > self.due_date
    }

    /// Whole days past the due date, zero when not overdue
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }

    pub fn state(&self, today: NaiveDate) -> BorrowingState {
        match self.status {
            BorrowingStatus::Pending => BorrowingState::Pending,
            BorrowingStatus::Borrowed if self.is_overdue(today) => BorrowingState::Overdue,
            BorrowingStatus::Borrowed => BorrowingState::Borrowed,
            BorrowingStatus::Returned => BorrowingState::Returned,
            BorrowingStatus::Rejected => BorrowingState::Rejected,
        }
    }

    pub fn confirm(&mut self, librarian_id: i32, at: DateTime<Utc>) -> AppResult<()> {
        self.status = self.status.confirm()?;
        self.confirmed_by = Some(librarian_id);
        self.confirmed_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, librarian_id: i32, at: DateTime<Utc>, reason: String) -> AppResult<()> {
        self.status = self.status.reject()?;
        self.rejected_by = Some(librarian_id);
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Push the due date back once. Fine checks live in the service.
    pub fn extend(&mut self, today: NaiveDate, days: i64, max_extensions: i16) -> AppResult<()> {
        self.status.ensure_on_loan()?;
        if self.extended_count >= max_extensions {
            return Err(AppError::PolicyViolation(
                "Borrowing has already been extended".to_string(),
            ));
        }
        if self.is_overdue(today) {
            return Err(AppError::PolicyViolation(
                "An overdue borrowing cannot be extended".to_string(),
            ));
        }
        self.due_date += Duration::days(days);
        self.extended_count += 1;
        Ok(())
    }

    pub fn settle(
        &mut self,
        librarian_id: i32,
        at: DateTime<Utc>,
        today: NaiveDate,
        condition: BookCondition,
    ) -> AppResult<()> {
        self.status = self.status.settle()?;
        self.return_date = Some(today);
        self.book_condition = Some(condition);
        self.returned_by = Some(librarian_id);
        self.returned_at = Some(at);
        Ok(())
    }

    pub fn view(self, today: NaiveDate) -> BorrowingView {
        BorrowingView {
            state: self.state(today),
            days_overdue: self.days_overdue(today),
            borrowing: self,
        }
    }
}

/// Row to insert for a new borrow request
#[derive(Debug, Clone)]
pub struct NewBorrowing {
    pub reader_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Borrowing with its derived display state
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingView {
    #[serde(flatten)]
    pub borrowing: Borrowing,
    pub state: BorrowingState,
    pub days_overdue: i64,
}

/// Create borrowing request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    pub book_id: i32,
    /// Loan duration in days (7 to 30, default 14)
    pub borrow_days: Option<i64>,
}

/// Reject borrowing request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectBorrowing {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1 to 500 characters"))]
    pub reason: String,
}

/// Borrowing list filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    /// Display state, `overdue` included
    pub status: Option<BorrowingState>,
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
}

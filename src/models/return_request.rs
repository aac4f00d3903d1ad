//! Return request model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::borrowing::BookCondition;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReturnRequestStatus {
    Pending,
    Confirmed,
}

text_enum!(ReturnRequestStatus {
    Pending => "pending",
    Confirmed => "confirmed",
});

/// A reader's request to hand a borrowed book back
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnRequest {
    pub id: i32,
    pub borrowing_id: i32,
    pub request_date: NaiveDate,
    pub status: ReturnRequestStatus,
    pub confirmed_by: Option<i32>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl ReturnRequest {
    /// pending -> confirmed
    pub fn confirm(&mut self, librarian_id: i32, at: DateTime<Utc>) -> AppResult<()> {
        if self.status != ReturnRequestStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Return request {} is already {}",
                self.id, self.status
            )));
        }
        self.status = ReturnRequestStatus::Confirmed;
        self.confirmed_by = Some(librarian_id);
        self.confirmed_at = Some(at);
        Ok(())
    }
}

/// Librarian's inspection result for a returned book
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SettleReturn {
    pub book_condition: BookCondition,
    /// Level for the damage/loss fine, or the late fee of a normal overdue return
    pub fine_level_id: Option<i32>,
    /// Late fee level; a damaged overdue return falls back to `fine_level_id`
    pub late_fine_level_id: Option<i32>,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Return request list filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReturnRequestQuery {
    pub status: Option<ReturnRequestStatus>,
}

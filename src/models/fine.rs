//! Fine model and payment status machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FineReason {
    LateReturn,
    Damaged,
    Lost,
}

text_enum!(FineReason {
    LateReturn => "late_return",
    Damaged => "damaged",
    Lost => "lost",
});

/// Payment status.
///
/// unpaid -> pending -> paid, or pending -> rejected -> pending again on resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FineStatus {
    Unpaid,
    Pending,
    Paid,
    Rejected,
}

text_enum!(FineStatus {
    Unpaid => "unpaid",
    Pending => "pending",
    Paid => "paid",
    Rejected => "rejected",
});

impl FineStatus {
    /// A reader submits a payment proof
    pub fn pay(self) -> AppResult<Self> {
        match self {
            FineStatus::Unpaid | FineStatus::Rejected => Ok(FineStatus::Pending),
            FineStatus::Pending => Err(AppError::InvalidState(
                "A payment for this fine is already awaiting confirmation".to_string(),
            )),
            FineStatus::Paid => Err(AppError::InvalidState("Fine is already paid".to_string())),
        }
    }

    pub fn confirm(self) -> AppResult<Self> {
        match self {
            FineStatus::Pending => Ok(FineStatus::Paid),
            other => Err(AppError::InvalidState(format!(
                "Only a pending payment can be confirmed, fine is {}",
                other
            ))),
        }
    }

    pub fn reject(self) -> AppResult<Self> {
        match self {
            FineStatus::Pending => Ok(FineStatus::Rejected),
            other => Err(AppError::InvalidState(format!(
                "Only a pending payment can be rejected, fine is {}",
                other
            ))),
        }
    }

    /// Blocks new borrow requests and extensions.
    ///
    /// A rejected payment leaves the fine owed, so it blocks like unpaid.
    pub fn is_outstanding(self) -> bool {
        !matches!(self, FineStatus::Paid)
    }
}

/// Fine record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub reader_id: i32,
    pub borrowing_id: i32,
    pub fine_level_id: i32,
    pub reason: FineReason,
    /// Copied from the fine level at creation, never changed afterwards
    pub amount: Decimal,
    pub note: Option<String>,
    pub status: FineStatus,
    pub payment_proof: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<i32>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<i32>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Fine {
    pub fn pay(&mut self, proof: String, at: DateTime<Utc>) -> AppResult<()> {
        self.status = self.status.pay()?;
        self.payment_proof = Some(proof);
        self.submitted_at = Some(at);
        self.rejected_by = None;
        self.rejected_at = None;
        self.rejection_reason = None;
        Ok(())
    }

    pub fn confirm(&mut self, staff_id: i32, at: DateTime<Utc>) -> AppResult<()> {
        self.status = self.status.confirm()?;
        self.confirmed_by = Some(staff_id);
        self.confirmed_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, staff_id: i32, at: DateTime<Utc>, reason: String) -> AppResult<()> {
        self.status = self.status.reject()?;
        self.rejected_by = Some(staff_id);
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason);
        Ok(())
    }
}

/// Row to insert at return settlement
#[derive(Debug, Clone, PartialEq)]
pub struct NewFine {
    pub reader_id: i32,
    pub borrowing_id: i32,
    pub fine_level_id: i32,
    pub reason: FineReason,
    pub amount: Decimal,
    pub note: Option<String>,
}

/// Payment submission
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PayFine {
    /// Reference to the payment proof (receipt number, upload path, ...)
    #[validate(length(min = 1, max = 500, message = "Payment proof is required"))]
    pub payment_proof: String,
}

/// Payment rejection
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectFine {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1 to 500 characters"))]
    pub reason: String,
}

/// Fine list filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct FineQuery {
    pub status: Option<FineStatus>,
    pub reason: Option<FineReason>,
    pub reader_id: Option<i32>,
}

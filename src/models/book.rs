//! Book model and its inventory ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub borrowed_quantity: i32,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl Book {
    pub fn inventory(&self) -> Inventory {
        Inventory {
            total: self.total_quantity,
            available: self.available_quantity,
            borrowed: self.borrowed_quantity,
        }
    }

    pub fn apply(&mut self, inventory: Inventory) {
        self.total_quantity = inventory.total;
        self.available_quantity = inventory.available;
        self.borrowed_quantity = inventory.borrowed;
    }
}

/// Register book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
}

/// Update total quantity request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateQuantity {
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
}

/// Quantity counters of a book.
///
/// `available + borrowed == total` and both counters stay non-negative; every
/// transition either keeps that or fails without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Inventory {
    pub total: i32,
    pub available: i32,
    pub borrowed: i32,
}

impl Inventory {
    pub fn new(total: i32) -> AppResult<Self> {
        if total < 0 {
            return Err(AppError::Validation("Total quantity cannot be negative".to_string()));
        }
        Ok(Self {
            total,
            available: total,
            borrowed: 0,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.available >= 0 && self.borrowed >= 0 && self.available + self.borrowed == self.total
    }

    /// One copy leaves the shelf for a confirmed borrowing
    pub fn check_out(self) -> AppResult<Self> {
        if self.available <= 0 {
            return Err(AppError::Conflict("No copy of this book is available".to_string()));
        }
        Ok(Self {
            available: self.available - 1,
            borrowed: self.borrowed + 1,
            ..self
        })
    }

    /// A borrowed copy comes back to the shelf
    pub fn check_in(self) -> AppResult<Self> {
        if self.borrowed <= 0 {
            return Err(AppError::Conflict("No borrowed copy to return".to_string()));
        }
        Ok(Self {
            available: self.available + 1,
            borrowed: self.borrowed - 1,
            ..self
        })
    }

    /// A borrowed copy is lost: it leaves circulation, available is untouched
    pub fn write_off(self) -> AppResult<Self> {
        if self.borrowed <= 0 {
            return Err(AppError::Conflict("No borrowed copy to write off".to_string()));
        }
        Ok(Self {
            total: self.total - 1,
            borrowed: self.borrowed - 1,
            ..self
        })
    }

    /// Catalog edit of the total; available is recomputed from what is out
    pub fn retotal(self, total: i32) -> AppResult<Self> {
        if total < self.borrowed {
            return Err(AppError::PolicyViolation(format!(
                "Total quantity {} is below the {} copies currently borrowed",
                total, self.borrowed
            )));
        }
        Ok(Self {
            total,
            available: total - self.borrowed,
            borrowed: self.borrowed,
        })
    }
}

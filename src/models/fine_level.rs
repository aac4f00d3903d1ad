//! Fine level reference data

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Named reference amount used as the basis of a fine
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FineLevel {
    pub id: i32,
    pub name: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Create fine level request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFineLevel {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Update fine level request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFineLevel {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

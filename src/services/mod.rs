//! Business logic services

pub mod borrowings;
pub mod eligibility;
pub mod fine_levels;
pub mod fines;
pub mod inventory;
pub mod returns;
pub mod stats;

use std::sync::Arc;

use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::{AppError, AppResult},
    repository::Store,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub inventory: inventory::InventoryService,
    pub borrowings: borrowings::BorrowingsService,
    pub returns: returns::ReturnsService,
    pub fines: fines::FinesService,
    pub fine_levels: fine_levels::FineLevelsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: CirculationConfig) -> Self {
        Self {
            inventory: inventory::InventoryService::new(store.clone()),
            borrowings: borrowings::BorrowingsService::new(store.clone(), clock.clone(), policy.clone()),
            returns: returns::ReturnsService::new(store.clone(), clock.clone(), policy.clone()),
            fines: fines::FinesService::new(store.clone(), clock.clone(), policy),
            fine_levels: fine_levels::FineLevelsService::new(store.clone()),
            stats: stats::StatsService::new(store, clock),
        }
    }
}

/// Trimmed, non-empty free text bounded in length (reasons, notes, proofs)
pub(crate) fn require_text(field: &str, value: Option<&str>, max_len: usize) -> AppResult<String> {
    let text = value.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if text.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(text.to_string())
}

//! Fine level reference data service

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine_level::{CreateFineLevel, FineLevel, UpdateFineLevel},
        user::Actor,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct FineLevelsService {
    store: Arc<dyn Store>,
}

fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount.is_sign_negative() {
        return Err(AppError::Validation("Amount cannot be negative".to_string()));
    }
    Ok(())
}

impl FineLevelsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<FineLevel>> {
        let mut tx = self.store.begin().await?;
        tx.fine_levels_list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<FineLevel> {
        let mut tx = self.store.begin().await?;
        tx.fine_levels_get_by_id(id).await
    }

    pub async fn create(&self, actor: &Actor, data: CreateFineLevel) -> AppResult<FineLevel> {
        actor.require_staff()?;
        data.validate()?;
        check_amount(data.amount)?;

        let mut tx = self.store.begin().await?;
        let level = tx.fine_levels_create(&data).await?;
        tx.commit().await?;

        tracing::info!("Fine level {} '{}' created ({})", level.id, level.name, level.amount);
        Ok(level)
    }

    /// Existing fines keep the amount they were created with
    pub async fn update(&self, actor: &Actor, id: i32, data: UpdateFineLevel) -> AppResult<FineLevel> {
        actor.require_staff()?;
        data.validate()?;
        if let Some(amount) = data.amount {
            check_amount(amount)?;
        }

        let mut tx = self.store.begin().await?;
        let level = tx.fine_levels_update(id, &data).await?;
        tx.commit().await?;

        tracing::info!("Fine level {} updated", id);
        Ok(level)
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        tx.fine_levels_get_by_id(id).await?;
        let referenced = tx.fines_count_by_level(id).await?;
        if referenced > 0 {
            return Err(AppError::PolicyViolation(format!(
                "Fine level {} is used by {} fines",
                id, referenced
            )));
        }
        tx.fine_levels_delete(id).await?;
        tx.commit().await?;

        tracing::info!("Fine level {} deleted", id);
        Ok(())
    }
}

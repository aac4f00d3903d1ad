//! Fine ledger service
//!
//! Fines are created only by return settlement. Here the reader submits a
//! payment proof and staff confirm or reject it; a rejected payment may be
//! submitted again.

use std::sync::Arc;

use validator::Validate;

use super::require_text;
use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::AppResult,
    models::{
        fine::{Fine, FineQuery, PayFine, RejectFine},
        user::Actor,
    },
    repository::{FineFilter, Store},
};

#[derive(Clone)]
pub struct FinesService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: CirculationConfig,
}

impl FinesService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: CirculationConfig) -> Self {
        Self { store, clock, policy }
    }

    /// Reader submits a payment proof: unpaid or rejected -> pending
    pub async fn pay(&self, actor: &Actor, fine_id: i32, request: PayFine) -> AppResult<Fine> {
        request.validate()?;
        let proof = require_text(
            "Payment proof",
            Some(&request.payment_proof),
            self.policy.max_reason_length,
        )?;

        let mut tx = self.store.begin().await?;
        let mut fine = tx.fines_get_for_update(fine_id).await?;
        actor.require_owner(fine.reader_id)?;
        fine.pay(proof, self.clock.now())?;
        tx.fines_update(&fine).await?;
        tx.commit().await?;

        tracing::info!("Payment submitted for fine {} by reader {}", fine_id, actor.user_id);
        Ok(fine)
    }

    /// Staff accept the payment: pending -> paid
    pub async fn confirm(&self, actor: &Actor, fine_id: i32) -> AppResult<Fine> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        let mut fine = tx.fines_get_for_update(fine_id).await?;
        fine.confirm(actor.user_id, self.clock.now())?;
        tx.fines_update(&fine).await?;
        tx.commit().await?;

        tracing::info!("Fine {} paid ({}), confirmed by {}", fine_id, fine.amount, actor.user_id);
        Ok(fine)
    }

    /// Staff refuse the payment: pending -> rejected, the fine stays owed
    pub async fn reject(&self, actor: &Actor, fine_id: i32, request: RejectFine) -> AppResult<Fine> {
        actor.require_staff()?;
        request.validate()?;
        let reason = require_text("Reason", Some(&request.reason), self.policy.max_reason_length)?;

        let mut tx = self.store.begin().await?;
        let mut fine = tx.fines_get_for_update(fine_id).await?;
        fine.reject(actor.user_id, self.clock.now(), reason)?;
        tx.fines_update(&fine).await?;
        tx.commit().await?;

        tracing::warn!("Payment for fine {} rejected by {}", fine_id, actor.user_id);
        Ok(fine)
    }

    pub async fn get(&self, actor: &Actor, fine_id: i32) -> AppResult<Fine> {
        let mut tx = self.store.begin().await?;
        let fine = tx.fines_get_by_id(fine_id).await?;
        actor.require_owner_or_staff(fine.reader_id)?;
        Ok(fine)
    }

    pub async fn list_mine(&self, actor: &Actor, query: FineQuery) -> AppResult<Vec<Fine>> {
        self.list_filtered(FineQuery {
            reader_id: Some(actor.user_id),
            ..query
        })
        .await
    }

    pub async fn list(&self, actor: &Actor, query: FineQuery) -> AppResult<Vec<Fine>> {
        actor.require_staff()?;
        self.list_filtered(query).await
    }

    async fn list_filtered(&self, query: FineQuery) -> AppResult<Vec<Fine>> {
        let mut tx = self.store.begin().await?;
        tx.fines_list(&FineFilter {
            reader_id: query.reader_id,
            borrowing_id: None,
            status: query.status,
            reason: query.reason,
        })
        .await
    }
}

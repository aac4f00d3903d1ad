//! Fines repository

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::fine::{Fine, FineReason, FineStatus, NewFine},
};

#[derive(Debug, Clone, Default)]
pub struct FineFilter {
    pub reader_id: Option<i32>,
    pub borrowing_id: Option<i32>,
    pub status: Option<FineStatus>,
    pub reason: Option<FineReason>,
}

impl FineFilter {
    pub fn matches(&self, fine: &Fine) -> bool {
        self.reader_id.map_or(true, |id| fine.reader_id == id)
            && self.borrowing_id.map_or(true, |id| fine.borrowing_id == id)
            && self.status.map_or(true, |s| fine.status == s)
            && self.reason.map_or(true, |r| fine.reason == r)
    }
}

#[async_trait]
pub trait FineRepository: Send {
    async fn fines_get_by_id(&mut self, id: i32) -> AppResult<Fine>;

    async fn fines_get_for_update(&mut self, id: i32) -> AppResult<Fine>;

    async fn fines_create(&mut self, fine: &NewFine) -> AppResult<Fine>;

    /// Persist payment status, proof and audit stamps. The amount is never written.
    async fn fines_update(&mut self, fine: &Fine) -> AppResult<()>;

    async fn fines_list(&mut self, filter: &FineFilter) -> AppResult<Vec<Fine>>;

    /// Fines of a reader that still block borrowing (anything not paid)
    async fn fines_count_outstanding(&mut self, reader_id: i32) -> AppResult<i64>;

    async fn fines_count_by_level(&mut self, fine_level_id: i32) -> AppResult<i64>;
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Fine with id {} not found", id))
}

#[async_trait]
impl FineRepository for PgTx {
    async fn fines_get_by_id(&mut self, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn fines_get_for_update(&mut self, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn fines_create(&mut self, fine: &NewFine) -> AppResult<Fine> {
        let row = sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (reader_id, borrowing_id, fine_level_id, reason, amount, note, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(fine.reader_id)
        .bind(fine.borrowing_id)
        .bind(fine.fine_level_id)
        .bind(fine.reason)
        .bind(fine.amount)
        .bind(&fine.note)
        .bind(FineStatus::Unpaid)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn fines_update(&mut self, fine: &Fine) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE fines SET
                status = $2, payment_proof = $3, submitted_at = $4, confirmed_by = $5,
                confirmed_at = $6, rejected_by = $7, rejected_at = $8, rejection_reason = $9
            WHERE id = $1
            "#,
        )
        .bind(fine.id)
        .bind(fine.status)
        .bind(&fine.payment_proof)
        .bind(fine.submitted_at)
        .bind(fine.confirmed_by)
        .bind(fine.confirmed_at)
        .bind(fine.rejected_by)
        .bind(fine.rejected_at)
        .bind(&fine.rejection_reason)
        .execute(self.conn()?)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(fine.id));
        }
        Ok(())
    }

    async fn fines_list(&mut self, filter: &FineFilter) -> AppResult<Vec<Fine>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM fines WHERE TRUE");
        if let Some(reader_id) = filter.reader_id {
            builder.push(" AND reader_id = ").push_bind(reader_id);
        }
        if let Some(borrowing_id) = filter.borrowing_id {
            builder.push(" AND borrowing_id = ").push_bind(borrowing_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(reason) = filter.reason {
            builder.push(" AND reason = ").push_bind(reason);
        }
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<Fine>()
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows)
    }

    async fn fines_count_outstanding(&mut self, reader_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fines WHERE reader_id = $1 AND status <> 'paid'",
        )
        .bind(reader_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(count)
    }

    async fn fines_count_by_level(&mut self, fine_level_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fines WHERE fine_level_id = $1")
            .bind(fine_level_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(count)
    }
}

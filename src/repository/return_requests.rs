//! Return requests repository

use async_trait::async_trait;
use chrono::NaiveDate;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::return_request::{ReturnRequest, ReturnRequestStatus},
};

#[async_trait]
pub trait ReturnRequestRepository: Send {
    async fn return_requests_get_by_id(&mut self, id: i32) -> AppResult<ReturnRequest>;

    async fn return_requests_get_for_update(&mut self, id: i32) -> AppResult<ReturnRequest>;

    async fn return_requests_create(
        &mut self,
        borrowing_id: i32,
        request_date: NaiveDate,
    ) -> AppResult<ReturnRequest>;

    async fn return_requests_update(&mut self, request: &ReturnRequest) -> AppResult<()>;

    async fn return_requests_find_pending(&mut self, borrowing_id: i32) -> AppResult<Option<ReturnRequest>>;

    async fn return_requests_list(
        &mut self,
        status: Option<ReturnRequestStatus>,
    ) -> AppResult<Vec<ReturnRequest>>;
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Return request with id {} not found", id))
}

#[async_trait]
impl ReturnRequestRepository for PgTx {
    async fn return_requests_get_by_id(&mut self, id: i32) -> AppResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn return_requests_get_for_update(&mut self, id: i32) -> AppResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn return_requests_create(
        &mut self,
        borrowing_id: i32,
        request_date: NaiveDate,
    ) -> AppResult<ReturnRequest> {
        let row = sqlx::query_as::<_, ReturnRequest>(
            r#"
            INSERT INTO return_requests (borrowing_id, request_date, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(borrowing_id)
        .bind(request_date)
        .bind(ReturnRequestStatus::Pending)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn return_requests_update(&mut self, request: &ReturnRequest) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE return_requests SET status = $2, confirmed_by = $3, confirmed_at = $4 WHERE id = $1",
        )
        .bind(request.id)
        .bind(request.status)
        .bind(request.confirmed_by)
        .bind(request.confirmed_at)
        .execute(self.conn()?)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(request.id));
        }
        Ok(())
    }

    async fn return_requests_find_pending(&mut self, borrowing_id: i32) -> AppResult<Option<ReturnRequest>> {
        let row = sqlx::query_as::<_, ReturnRequest>(
            "SELECT * FROM return_requests WHERE borrowing_id = $1 AND status = 'pending'",
        )
        .bind(borrowing_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn return_requests_list(
        &mut self,
        status: Option<ReturnRequestStatus>,
    ) -> AppResult<Vec<ReturnRequest>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ReturnRequest>(
                    "SELECT * FROM return_requests WHERE status = $1 ORDER BY request_date, id",
                )
                .bind(status)
                .fetch_all(self.conn()?)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests ORDER BY request_date, id")
                    .fetch_all(self.conn()?)
                    .await?
            }
        };
        Ok(rows)
    }
}

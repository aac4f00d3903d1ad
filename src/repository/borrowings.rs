//! Borrowings repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{Borrowing, BorrowingStatus, NewBorrowing},
        stats::DailyActivity,
    },
};

/// Persisted-status filter for borrowing lists
#[derive(Debug, Clone, Default)]
pub struct BorrowingFilter {
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<BorrowingStatus>,
}

impl BorrowingFilter {
    pub fn matches(&self, borrowing: &Borrowing) -> bool {
        self.reader_id.map_or(true, |id| borrowing.reader_id == id)
            && self.book_id.map_or(true, |id| borrowing.book_id == id)
            && self.status.map_or(true, |s| borrowing.status == s)
    }
}

#[async_trait]
pub trait BorrowingRepository: Send {
    async fn borrowings_get_by_id(&mut self, id: i32) -> AppResult<Borrowing>;

    /// Same as `borrowings_get_by_id`, locking the row until the unit of work ends
    async fn borrowings_get_for_update(&mut self, id: i32) -> AppResult<Borrowing>;

    async fn borrowings_create(&mut self, borrowing: &NewBorrowing) -> AppResult<Borrowing>;

    /// Persist status, dates, condition and audit stamps
    async fn borrowings_update(&mut self, borrowing: &Borrowing) -> AppResult<()>;

    async fn borrowings_delete(&mut self, id: i32) -> AppResult<()>;

    async fn borrowings_list(&mut self, filter: &BorrowingFilter) -> AppResult<Vec<Borrowing>>;

    /// Borrowings of a reader in pending or borrowed (overdue included)
    async fn borrowings_count_active(&mut self, reader_id: i32) -> AppResult<i64>;

    async fn borrowings_has_pending(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool>;

    /// Serialize borrow requests of one reader until the unit of work ends
    async fn borrowings_lock_reader(&mut self, reader_id: i32) -> AppResult<()>;

    /// Per-day confirmations, settlements and overdue loans over `[from, to]`,
    /// one entry per day. No overdue count after `today`.
    async fn borrowings_daily_activity(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Vec<DailyActivity>>;
}

/// First key of the advisory locks taken per reader
const READER_LOCK_SPACE: i32 = 1;

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Borrowing with id {} not found", id))
}

#[async_trait]
impl BorrowingRepository for PgTx {
    async fn borrowings_get_by_id(&mut self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn borrowings_get_for_update(&mut self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn borrowings_create(&mut self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        let row = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (reader_id, book_id, borrow_date, due_date, extended_count, status)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING *
            "#,
        )
        .bind(borrowing.reader_id)
        .bind(borrowing.book_id)
        .bind(borrowing.borrow_date)
        .bind(borrowing.due_date)
        .bind(BorrowingStatus::Pending)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn borrowings_update(&mut self, borrowing: &Borrowing) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE borrowings SET
                due_date = $2, return_date = $3, extended_count = $4, book_condition = $5,
                status = $6, confirmed_by = $7, confirmed_at = $8, rejected_by = $9,
                rejected_at = $10, rejection_reason = $11, returned_by = $12, returned_at = $13
            WHERE id = $1
            "#,
        )
        .bind(borrowing.id)
        .bind(borrowing.due_date)
        .bind(borrowing.return_date)
        .bind(borrowing.extended_count)
        .bind(borrowing.book_condition)
        .bind(borrowing.status)
        .bind(borrowing.confirmed_by)
        .bind(borrowing.confirmed_at)
        .bind(borrowing.rejected_by)
        .bind(borrowing.rejected_at)
        .bind(&borrowing.rejection_reason)
        .bind(borrowing.returned_by)
        .bind(borrowing.returned_at)
        .execute(self.conn()?)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(borrowing.id));
        }
        Ok(())
    }

    async fn borrowings_delete(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn borrowings_list(&mut self, filter: &BorrowingFilter) -> AppResult<Vec<Borrowing>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM borrowings WHERE TRUE");
        if let Some(reader_id) = filter.reader_id {
            builder.push(" AND reader_id = ").push_bind(reader_id);
        }
        if let Some(book_id) = filter.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<Borrowing>()
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows)
    }

    async fn borrowings_count_active(&mut self, reader_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE reader_id = $1 AND status IN ('pending', 'borrowed')",
        )
        .bind(reader_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(count)
    }

    async fn borrowings_has_pending(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE reader_id = $1 AND book_id = $2 AND status = 'pending')",
        )
        .bind(reader_id)
        .bind(book_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(exists)
    }

    async fn borrowings_lock_reader(&mut self, reader_id: i32) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(READER_LOCK_SPACE)
            .bind(reader_id)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn borrowings_daily_activity(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Vec<DailyActivity>> {
        let rows = sqlx::query_as::<_, DailyActivity>(
            r#"
            WITH days AS (
                SELECT d::date AS day FROM generate_series($1::date, $2::date, INTERVAL '1 day') AS d
            ),
            handed AS (
                SELECT (confirmed_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS n
                FROM borrowings
                WHERE confirmed_at IS NOT NULL
                  AND (confirmed_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
                GROUP BY 1
            ),
            settled AS (
                SELECT return_date AS day, COUNT(*) AS n
                FROM borrowings
                WHERE return_date BETWEEN $1 AND $2
                GROUP BY 1
            ),
            late AS (
                SELECT days.day, COUNT(b.id) AS n
                FROM days
                JOIN borrowings b
                  ON b.confirmed_at IS NOT NULL
                 AND (b.confirmed_at AT TIME ZONE 'UTC')::date <= days.day
                 AND b.due_date < days.day
                 AND (b.return_date IS NULL OR b.return_date > days.day)
                WHERE days.day <= $3
                GROUP BY days.day
            )
            SELECT days.day AS date,
                   COALESCE(handed.n, 0) AS borrowed,
                   COALESCE(settled.n, 0) AS returned,
                   COALESCE(late.n, 0) AS overdue
            FROM days
            LEFT JOIN handed ON handed.day = days.day
            LEFT JOIN settled ON settled.day = days.day
            LEFT JOIN late ON late.day = days.day
            ORDER BY days.day
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(today)
        .fetch_all(self.conn()?)
        .await?;
        Ok(rows)
    }
}

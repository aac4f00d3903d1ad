//! Fine levels repository

use async_trait::async_trait;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::fine_level::{CreateFineLevel, FineLevel, UpdateFineLevel},
};

#[async_trait]
pub trait FineLevelRepository: Send {
    async fn fine_levels_get_by_id(&mut self, id: i32) -> AppResult<FineLevel>;

    async fn fine_levels_list(&mut self) -> AppResult<Vec<FineLevel>>;

    async fn fine_levels_create(&mut self, data: &CreateFineLevel) -> AppResult<FineLevel>;

    async fn fine_levels_update(&mut self, id: i32, data: &UpdateFineLevel) -> AppResult<FineLevel>;

    async fn fine_levels_delete(&mut self, id: i32) -> AppResult<()>;
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Fine level {} not found", id))
}

#[async_trait]
impl FineLevelRepository for PgTx {
    async fn fine_levels_get_by_id(&mut self, id: i32) -> AppResult<FineLevel> {
        sqlx::query_as::<_, FineLevel>("SELECT * FROM fine_levels WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn fine_levels_list(&mut self) -> AppResult<Vec<FineLevel>> {
        let rows = sqlx::query_as::<_, FineLevel>("SELECT * FROM fine_levels ORDER BY name")
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows)
    }

    async fn fine_levels_create(&mut self, data: &CreateFineLevel) -> AppResult<FineLevel> {
        let row = sqlx::query_as::<_, FineLevel>(
            r#"
            INSERT INTO fine_levels (name, amount, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.amount)
        .bind(&data.description)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn fine_levels_update(&mut self, id: i32, data: &UpdateFineLevel) -> AppResult<FineLevel> {
        sqlx::query_as::<_, FineLevel>(
            r#"
            UPDATE fine_levels SET
                name = COALESCE($2, name),
                amount = COALESCE($3, amount),
                description = COALESCE($4, description),
                modif_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.amount)
        .bind(&data.description)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn fine_levels_delete(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM fine_levels WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

//! Book repository

use async_trait::async_trait;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, Inventory, NewBook},
};

#[async_trait]
pub trait BookRepository: Send {
    async fn books_get_by_id(&mut self, id: i32) -> AppResult<Book>;

    /// Same as `books_get_by_id`, locking the row until the unit of work ends
    async fn books_get_for_update(&mut self, id: i32) -> AppResult<Book>;

    async fn books_create(&mut self, book: &NewBook) -> AppResult<Book>;

    async fn books_update_inventory(&mut self, id: i32, inventory: Inventory) -> AppResult<()>;
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

#[async_trait]
impl BookRepository for PgTx {
    async fn books_get_by_id(&mut self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn books_get_for_update(&mut self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn books_create(&mut self, book: &NewBook) -> AppResult<Book> {
        let inventory = Inventory::new(book.total_quantity)?;
        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_quantity, available_quantity, borrowed_quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(inventory.total)
        .bind(inventory.available)
        .bind(inventory.borrowed)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn books_update_inventory(&mut self, id: i32, inventory: Inventory) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET total_quantity = $2, available_quantity = $3, borrowed_quantity = $4, modif_date = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(inventory.total)
        .bind(inventory.available)
        .bind(inventory.borrowed)
        .execute(self.conn()?)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

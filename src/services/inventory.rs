//! Inventory ledger service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, NewBook},
        user::Actor,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn Store>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add a book to the collection, every copy on the shelf
    pub async fn register_book(&self, actor: &Actor, book: NewBook) -> AppResult<Book> {
        actor.require_staff()?;
        book.validate()?;

        let mut tx = self.store.begin().await?;
        let created = tx.books_create(&book).await?;
        tx.commit().await?;

        tracing::info!("Book {} registered with {} copies", created.id, created.total_quantity);
        Ok(created)
    }

    pub async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        let mut tx = self.store.begin().await?;
        tx.books_get_by_id(book_id).await
    }

    /// Change the number of owned copies; available is recomputed from what is out
    pub async fn set_total_quantity(&self, actor: &Actor, book_id: i32, total: i32) -> AppResult<Book> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        let mut book = tx.books_get_for_update(book_id).await?;
        let inventory = book.inventory().retotal(total)?;
        tx.books_update_inventory(book_id, inventory).await?;
        tx.commit().await?;

        book.apply(inventory);
        tracing::info!(
            "Book {} total set to {} ({} available, {} borrowed)",
            book_id,
            inventory.total,
            inventory.available,
            inventory.borrowed
        );
        Ok(book)
    }
}

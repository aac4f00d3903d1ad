//! Repository layer for database operations
//!
//! Each entity has its own repository trait. A [`LibraryTx`] implements all of
//! them over one store transaction: workflows that touch several entities open
//! a unit of work with [`Store::begin`], do their reads and writes through it,
//! and call [`LibraryTx::commit`]. Dropping a unit of work without committing
//! rolls every write back.

pub mod books;
pub mod borrowings;
pub mod fine_levels;
pub mod fines;
pub mod memory;
pub mod postgres;
pub mod return_requests;

use async_trait::async_trait;

use crate::error::AppResult;

pub use books::BookRepository;
pub use borrowings::{BorrowingFilter, BorrowingRepository};
pub use fine_levels::FineLevelRepository;
pub use fines::{FineFilter, FineRepository};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use return_requests::ReturnRequestRepository;

/// One atomic unit of work against the store
#[async_trait]
pub trait LibraryTx:
    BookRepository
    + BorrowingRepository
    + ReturnRequestRepository
    + FineRepository
    + FineLevelRepository
    + Send
{
    /// Make every write of this unit of work visible at once
    async fn commit(&mut self) -> AppResult<()>;
}

/// Entry point to the persistent store
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LibraryTx>>;
}

//! Shared fixtures: services over the in-memory store with a pinned clock

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use lectern_server::{
    clock::{Clock, FixedClock},
    config::CirculationConfig,
    models::{
        book::{Book, NewBook},
        borrowing::{BookCondition, BorrowingView, CreateBorrowing},
        fine_level::{CreateFineLevel, FineLevel},
        return_request::SettleReturn,
        user::{Actor, Role},
    },
    repository::{FineRepository, MemoryStore, Store},
    services::{returns::SettlementOutcome, Services},
};

pub const LIBRARIAN: Actor = Actor {
    user_id: 900,
    role: Role::Librarian,
};

pub fn start_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub struct Harness {
    pub store: MemoryStore,
    pub clock: Arc<FixedClock>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(FixedClock::new(start_day()));
        let services = Services::new(
            Arc::new(store.clone()),
            clock.clone() as Arc<dyn Clock>,
            CirculationConfig::default(),
        );
        Self { store, clock, services }
    }

    pub async fn book(&self, total: i32) -> Book {
        self.services
            .inventory
            .register_book(
                &LIBRARIAN,
                NewBook {
                    title: "The Name of the Rose".to_string(),
                    author: Some("Umberto Eco".to_string()),
                    isbn: None,
                    total_quantity: total,
                },
            )
            .await
            .unwrap()
    }

    pub async fn level(&self, name: &str, cents: i64) -> FineLevel {
        self.services
            .fine_levels
            .create(
                &LIBRARIAN,
                CreateFineLevel {
                    name: name.to_string(),
                    amount: Decimal::new(cents, 2),
                    description: None,
                },
            )
            .await
            .unwrap()
    }

    /// (total, available, borrowed) as stored
    pub async fn quantities(&self, book_id: i32) -> (i32, i32, i32) {
        let book = self.services.inventory.get_book(book_id).await.unwrap();
        (book.total_quantity, book.available_quantity, book.borrowed_quantity)
    }

    pub async fn request(&self, reader: &Actor, book_id: i32) -> BorrowingView {
        self.services
            .borrowings
            .create(reader, CreateBorrowing { book_id, borrow_days: None })
            .await
            .unwrap()
    }

    /// Requested and confirmed, due 14 days after the current day
    pub async fn on_loan(&self, reader: &Actor, book_id: i32) -> BorrowingView {
        let pending = self.request(reader, book_id).await;
        self.services
            .borrowings
            .confirm(&LIBRARIAN, pending.borrowing.id)
            .await
            .unwrap()
    }

    pub async fn return_with(
        &self,
        reader: &Actor,
        borrowing_id: i32,
        book_condition: BookCondition,
        fine_level_id: Option<i32>,
        late_fine_level_id: Option<i32>,
        note: Option<&str>,
    ) -> lectern_server::AppResult<SettlementOutcome> {
        let request = self
            .services
            .borrowings
            .request_return(reader, borrowing_id)
            .await?;
        self.services
            .returns
            .settle(
                &LIBRARIAN,
                request.id,
                SettleReturn {
                    book_condition,
                    fine_level_id,
                    late_fine_level_id,
                    note: note.map(str::to_string),
                },
            )
            .await
    }

    pub async fn stored_fine_count(&self) -> usize {
        let mut tx = self.store.begin().await.unwrap();
        tx.fines_list(&Default::default()).await.unwrap().len()
    }
}

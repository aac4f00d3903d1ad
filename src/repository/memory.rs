//! In-process store.
//!
//! A unit of work takes the store lock for its whole lifetime, works on a copy
//! of every table and swaps the copy in on commit, so transactions are fully
//! serialized and an uncommitted unit of work leaves no trace. The schema's
//! unique, foreign-key and check constraints are emulated and reported as
//! [`AppError::Conflict`], like the Postgres store does.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    BookRepository, BorrowingFilter, BorrowingRepository, FineFilter, FineLevelRepository,
    FineRepository, LibraryTx, ReturnRequestRepository, Store,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, Inventory, NewBook},
        borrowing::{Borrowing, BorrowingStatus, NewBorrowing},
        fine::{Fine, FineStatus, NewFine},
        fine_level::{CreateFineLevel, FineLevel, UpdateFineLevel},
        return_request::{ReturnRequest, ReturnRequestStatus},
        stats::DailyActivity,
    },
};

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i32,
    books: BTreeMap<i32, Book>,
    borrowings: BTreeMap<i32, Borrowing>,
    return_requests: BTreeMap<i32, ReturnRequest>,
    fines: BTreeMap<i32, Fine>,
    fine_levels: BTreeMap<i32, FineLevel>,
}

impl Tables {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LibraryTx>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard: Some(guard),
            working,
        }))
    }
}

pub struct MemoryTx {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError::Conflict(message.into())
}

#[async_trait]
impl LibraryTx for MemoryTx {
    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already committed".to_string()))?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[async_trait]
impl BookRepository for MemoryTx {
    async fn books_get_by_id(&mut self, id: i32) -> AppResult<Book> {
        self.working
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn books_get_for_update(&mut self, id: i32) -> AppResult<Book> {
        self.books_get_by_id(id).await
    }

    async fn books_create(&mut self, book: &NewBook) -> AppResult<Book> {
        let inventory = Inventory::new(book.total_quantity)?;
        let id = self.working.allocate_id();
        let row = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            total_quantity: inventory.total,
            available_quantity: inventory.available,
            borrowed_quantity: inventory.borrowed,
            crea_date: Some(Utc::now()),
            modif_date: None,
        };
        self.working.books.insert(id, row.clone());
        Ok(row)
    }

    async fn books_update_inventory(&mut self, id: i32, inventory: Inventory) -> AppResult<()> {
        if !inventory.is_balanced() {
            return Err(conflict(format!("Inventory of book {} would not balance", id)));
        }
        let book = self
            .working
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        book.apply(inventory);
        book.modif_date = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl BorrowingRepository for MemoryTx {
    async fn borrowings_get_by_id(&mut self, id: i32) -> AppResult<Borrowing> {
        self.working
            .borrowings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    async fn borrowings_get_for_update(&mut self, id: i32) -> AppResult<Borrowing> {
        self.borrowings_get_by_id(id).await
    }

    async fn borrowings_create(&mut self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        if !self.working.books.contains_key(&borrowing.book_id) {
            return Err(conflict(format!("Book {} does not exist", borrowing.book_id)));
        }
        let id = self.working.allocate_id();
        let row = Borrowing {
            id,
            reader_id: borrowing.reader_id,
            book_id: borrowing.book_id,
            borrow_date: borrowing.borrow_date,
            due_date: borrowing.due_date,
            return_date: None,
            extended_count: 0,
            book_condition: None,
            status: BorrowingStatus::Pending,
            confirmed_by: None,
            confirmed_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            returned_by: None,
            returned_at: None,
        };
        self.working.borrowings.insert(id, row.clone());
        Ok(row)
    }

    async fn borrowings_update(&mut self, borrowing: &Borrowing) -> AppResult<()> {
        if !(0..=1).contains(&borrowing.extended_count) {
            return Err(conflict("extended_count out of range"));
        }
        let row = self
            .working
            .borrowings
            .get_mut(&borrowing.id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", borrowing.id)))?;
        *row = borrowing.clone();
        Ok(())
    }

    async fn borrowings_delete(&mut self, id: i32) -> AppResult<()> {
        if self.working.fines.values().any(|f| f.borrowing_id == id) {
            return Err(conflict(format!("Borrowing {} is referenced by fines", id)));
        }
        self.working
            .borrowings
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        self.working.return_requests.retain(|_, r| r.borrowing_id != id);
        Ok(())
    }

    async fn borrowings_list(&mut self, filter: &BorrowingFilter) -> AppResult<Vec<Borrowing>> {
        Ok(self
            .working
            .borrowings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn borrowings_count_active(&mut self, reader_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .borrowings
            .values()
            .filter(|b| b.reader_id == reader_id && b.status.is_active())
            .count() as i64)
    }

    async fn borrowings_has_pending(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool> {
        Ok(self.working.borrowings.values().any(|b| {
            b.reader_id == reader_id && b.book_id == book_id && b.status == BorrowingStatus::Pending
        }))
    }

    // The whole store is already held by this unit of work
    async fn borrowings_lock_reader(&mut self, _reader_id: i32) -> AppResult<()> {
        Ok(())
    }

    async fn borrowings_daily_activity(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Vec<DailyActivity>> {
        let borrowings: Vec<Borrowing> = self.working.borrowings.values().cloned().collect();
        let mut activity = Vec::new();
        let mut day = from;
        while day <= to {
            activity.push(DailyActivity::tally(&borrowings, day, today));
            day += Duration::days(1);
        }
        Ok(activity)
    }
}

#[async_trait]
impl ReturnRequestRepository for MemoryTx {
    async fn return_requests_get_by_id(&mut self, id: i32) -> AppResult<ReturnRequest> {
        self.working
            .return_requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Return request with id {} not found", id)))
    }

    async fn return_requests_get_for_update(&mut self, id: i32) -> AppResult<ReturnRequest> {
        self.return_requests_get_by_id(id).await
    }

    async fn return_requests_create(
        &mut self,
        borrowing_id: i32,
        request_date: NaiveDate,
    ) -> AppResult<ReturnRequest> {
        if !self.working.borrowings.contains_key(&borrowing_id) {
            return Err(conflict(format!("Borrowing {} does not exist", borrowing_id)));
        }
        let pending_exists = self
            .working
            .return_requests
            .values()
            .any(|r| r.borrowing_id == borrowing_id && r.status == ReturnRequestStatus::Pending);
        if pending_exists {
            return Err(conflict(format!(
                "Borrowing {} already has a pending return request",
                borrowing_id
            )));
        }
        let id = self.working.allocate_id();
        let row = ReturnRequest {
            id,
            borrowing_id,
            request_date,
            status: ReturnRequestStatus::Pending,
            confirmed_by: None,
            confirmed_at: None,
        };
        self.working.return_requests.insert(id, row.clone());
        Ok(row)
    }

    async fn return_requests_update(&mut self, request: &ReturnRequest) -> AppResult<()> {
        let row = self
            .working
            .return_requests
            .get_mut(&request.id)
            .ok_or_else(|| AppError::NotFound(format!("Return request with id {} not found", request.id)))?;
        *row = request.clone();
        Ok(())
    }

    async fn return_requests_find_pending(&mut self, borrowing_id: i32) -> AppResult<Option<ReturnRequest>> {
        Ok(self
            .working
            .return_requests
            .values()
            .find(|r| r.borrowing_id == borrowing_id && r.status == ReturnRequestStatus::Pending)
            .cloned())
    }

    async fn return_requests_list(
        &mut self,
        status: Option<ReturnRequestStatus>,
    ) -> AppResult<Vec<ReturnRequest>> {
        let mut rows: Vec<ReturnRequest> = self
            .working
            .return_requests
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.request_date, r.id));
        Ok(rows)
    }
}

#[async_trait]
impl FineRepository for MemoryTx {
    async fn fines_get_by_id(&mut self, id: i32) -> AppResult<Fine> {
        self.working
            .fines
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    async fn fines_get_for_update(&mut self, id: i32) -> AppResult<Fine> {
        self.fines_get_by_id(id).await
    }

    async fn fines_create(&mut self, fine: &NewFine) -> AppResult<Fine> {
        if !self.working.borrowings.contains_key(&fine.borrowing_id) {
            return Err(conflict(format!("Borrowing {} does not exist", fine.borrowing_id)));
        }
        if !self.working.fine_levels.contains_key(&fine.fine_level_id) {
            return Err(conflict(format!("Fine level {} does not exist", fine.fine_level_id)));
        }
        let id = self.working.allocate_id();
        let row = Fine {
            id,
            reader_id: fine.reader_id,
            borrowing_id: fine.borrowing_id,
            fine_level_id: fine.fine_level_id,
            reason: fine.reason,
            amount: fine.amount,
            note: fine.note.clone(),
            status: FineStatus::Unpaid,
            payment_proof: None,
            submitted_at: None,
            confirmed_by: None,
            confirmed_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        };
        self.working.fines.insert(id, row.clone());
        Ok(row)
    }

    async fn fines_update(&mut self, fine: &Fine) -> AppResult<()> {
        let row = self
            .working
            .fines
            .get_mut(&fine.id)
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", fine.id)))?;
        let amount = row.amount;
        *row = fine.clone();
        row.amount = amount;
        Ok(())
    }

    async fn fines_list(&mut self, filter: &FineFilter) -> AppResult<Vec<Fine>> {
        Ok(self
            .working
            .fines
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    async fn fines_count_outstanding(&mut self, reader_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .fines
            .values()
            .filter(|f| f.reader_id == reader_id && f.status.is_outstanding())
            .count() as i64)
    }

    async fn fines_count_by_level(&mut self, fine_level_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .fines
            .values()
            .filter(|f| f.fine_level_id == fine_level_id)
            .count() as i64)
    }
}

#[async_trait]
impl FineLevelRepository for MemoryTx {
    async fn fine_levels_get_by_id(&mut self, id: i32) -> AppResult<FineLevel> {
        self.working
            .fine_levels
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Fine level {} not found", id)))
    }

    async fn fine_levels_list(&mut self) -> AppResult<Vec<FineLevel>> {
        let mut rows: Vec<FineLevel> = self.working.fine_levels.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn fine_levels_create(&mut self, data: &CreateFineLevel) -> AppResult<FineLevel> {
        if self.working.fine_levels.values().any(|l| l.name == data.name) {
            return Err(conflict(format!("Fine level '{}' already exists", data.name)));
        }
        let id = self.working.allocate_id();
        let row = FineLevel {
            id,
            name: data.name.clone(),
            amount: data.amount,
            description: data.description.clone(),
            crea_date: Some(Utc::now()),
            modif_date: None,
        };
        self.working.fine_levels.insert(id, row.clone());
        Ok(row)
    }

    async fn fine_levels_update(&mut self, id: i32, data: &UpdateFineLevel) -> AppResult<FineLevel> {
        if let Some(ref name) = data.name {
            if self.working.fine_levels.values().any(|l| l.id != id && &l.name == name) {
                return Err(conflict(format!("Fine level '{}' already exists", name)));
            }
        }
        let row = self
            .working
            .fine_levels
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Fine level {} not found", id)))?;
        if let Some(ref name) = data.name {
            row.name = name.clone();
        }
        if let Some(amount) = data.amount {
            row.amount = amount;
        }
        if let Some(ref description) = data.description {
            row.description = Some(description.clone());
        }
        row.modif_date = Some(Utc::now());
        Ok(row.clone())
    }

    async fn fine_levels_delete(&mut self, id: i32) -> AppResult<()> {
        if self.working.fines.values().any(|f| f.fine_level_id == id) {
            return Err(conflict(format!("Fine level {} is referenced by fines", id)));
        }
        self.working
            .fine_levels
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Fine level {} not found", id)))
    }
}

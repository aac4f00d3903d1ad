//! Circulation statistics
//!
//! Read-only projections consumed by reporting: daily activity, fine totals
//! per reason and the list of books returned damaged or lost.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        borrowing::{BookCondition, BorrowingStatus},
        fine::{Fine, FineReason, FineStatus},
        stats::{ConditionEntry, DailyActivity, FineTotal},
        user::Actor,
    },
    repository::{BorrowingFilter, FineFilter, Store},
};

/// Longest range served by a single daily activity request
const MAX_RANGE_DAYS: i64 = 366;

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Borrowed, returned and overdue counts for each day of `[from, to]`
    pub async fn daily_activity(
        &self,
        actor: &Actor,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<DailyActivity>> {
        actor.require_staff()?;
        if to < from {
            return Err(AppError::Validation("'to' must not be before 'from'".to_string()));
        }
        if (to - from).num_days() >= MAX_RANGE_DAYS {
            return Err(AppError::Validation(format!(
                "Range is limited to {} days",
                MAX_RANGE_DAYS
            )));
        }

        let mut tx = self.store.begin().await?;
        tx.borrowings_daily_activity(from, to, self.clock.today()).await
    }

    /// Count and amounts per fine reason
    pub async fn fine_totals(&self, actor: &Actor) -> AppResult<Vec<FineTotal>> {
        actor.require_staff()?;
        let mut tx = self.store.begin().await?;
        let fines = tx.fines_list(&FineFilter::default()).await?;
        Ok(totals_by_reason(&fines))
    }

    /// Returned borrowings settled with the given condition
    pub async fn condition_report(
        &self,
        actor: &Actor,
        condition: BookCondition,
    ) -> AppResult<Vec<ConditionEntry>> {
        actor.require_staff()?;

        let mut tx = self.store.begin().await?;
        let returned = tx
            .borrowings_list(&BorrowingFilter {
                status: Some(BorrowingStatus::Returned),
                ..Default::default()
            })
            .await?;

        let mut titles: BTreeMap<i32, String> = BTreeMap::new();
        let mut entries = Vec::new();
        for borrowing in returned.into_iter().filter(|b| b.book_condition == Some(condition)) {
            let title = match titles.get(&borrowing.book_id) {
                Some(title) => title.clone(),
                None => {
                    let book = tx.books_get_by_id(borrowing.book_id).await?;
                    titles.insert(book.id, book.title.clone());
                    book.title
                }
            };
            entries.push(ConditionEntry {
                borrowing_id: borrowing.id,
                reader_id: borrowing.reader_id,
                book_id: borrowing.book_id,
                book_title: title,
                condition,
                return_date: borrowing.return_date,
            });
        }
        Ok(entries)
    }
}

fn totals_by_reason(fines: &[Fine]) -> Vec<FineTotal> {
    [FineReason::LateReturn, FineReason::Damaged, FineReason::Lost]
        .into_iter()
        .map(|reason| {
            let of_reason = fines.iter().filter(|f| f.reason == reason);
            let mut total = FineTotal {
                reason,
                count: 0,
                total_amount: Decimal::ZERO,
                paid_amount: Decimal::ZERO,
            };
            for fine in of_reason {
                total.count += 1;
                total.total_amount += fine.amount;
                if fine.status == FineStatus::Paid {
                    total.paid_amount += fine.amount;
                }
            }
            total
        })
        .collect()
}

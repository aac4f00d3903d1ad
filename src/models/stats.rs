//! Read-only projections consumed by reporting

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{
    borrowing::{BookCondition, Borrowing},
    fine::FineReason,
};

/// Circulation counts for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct DailyActivity {
    pub date: NaiveDate,
    /// Borrowings confirmed that day
    pub borrowed: i64,
    /// Borrowings settled that day
    pub returned: i64,
    /// Borrowings out at the end of that day whose due date had passed
    pub overdue: i64,
}

impl DailyActivity {
    /// Count `day` over loaded borrowings. Overdue is never reported for days
    /// after `today`.
    pub fn tally(borrowings: &[Borrowing], day: NaiveDate, today: NaiveDate) -> Self {
        let handed_over = |b: &&Borrowing| b.confirmed_at.map(|at| at.date_naive());

        let borrowed = borrowings
            .iter()
            .filter(|b| handed_over(b) == Some(day))
            .count() as i64;
        let returned = borrowings
            .iter()
            .filter(|b| b.return_date == Some(day))
            .count() as i64;
        let overdue = if day > today {
            0
        } else {
            borrowings
                .iter()
                .filter(|b| handed_over(b).map_or(false, |d| d <= day))
                .filter(|b| day > b.due_date && b.return_date.map_or(true, |r| r > day))
                .count() as i64
        };

        Self {
            date: day,
            borrowed,
            returned,
            overdue,
        }
    }
}

/// Fine totals for one reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FineTotal {
    pub reason: FineReason,
    pub count: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

/// A borrowing settled as damaged or lost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConditionEntry {
    pub borrowing_id: i32,
    pub reader_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub condition: BookCondition,
    pub return_date: Option<NaiveDate>,
}

/// Date range for daily activity
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DailyActivityQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ConditionQuery {
    pub condition: BookCondition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::borrowing::BorrowingStatus;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn borrowing(id: i32, confirmed: Option<NaiveDate>, due: NaiveDate, returned: Option<NaiveDate>) -> Borrowing {
        Borrowing {
            id,
            reader_id: 1,
            book_id: 1,
            borrow_date: day(1),
            due_date: due,
            return_date: returned,
            extended_count: 0,
            book_condition: returned.map(|_| BookCondition::Normal),
            status: match (confirmed, returned) {
                (None, _) => BorrowingStatus::Pending,
                (Some(_), None) => BorrowingStatus::Borrowed,
                (Some(_), Some(_)) => BorrowingStatus::Returned,
            },
            confirmed_by: confirmed.map(|_| 2),
            confirmed_at: confirmed.map(|d| Utc.from_utc_datetime(&d.and_hms_opt(10, 0, 0).unwrap())),
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            returned_by: None,
            returned_at: None,
        }
    }

    #[test]
    fn test_tally() {
        let borrowings = vec![
            borrowing(1, Some(day(2)), day(9), Some(day(12))),
            borrowing(2, Some(day(2)), day(16), None),
            borrowing(3, None, day(16), None),
        ];

        let second = DailyActivity::tally(&borrowings, day(2), day(20));
        assert_eq!((second.borrowed, second.returned, second.overdue), (2, 0, 0));

        let eleventh = DailyActivity::tally(&borrowings, day(11), day(20));
        assert_eq!((eleventh.borrowed, eleventh.returned, eleventh.overdue), (0, 0, 1));

        let twelfth = DailyActivity::tally(&borrowings, day(12), day(20));
        assert_eq!((twelfth.returned, twelfth.overdue), (1, 0));

        let future = DailyActivity::tally(&borrowings, day(25), day(20));
        assert_eq!(future.overdue, 0);
    }
}

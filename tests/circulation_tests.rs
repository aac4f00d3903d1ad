//! Borrowing and return workflows over the in-memory store

mod common;

use chrono::Duration;
use rust_decimal::Decimal;

use common::{start_day, Harness, LIBRARIAN};
use lectern_server::{
    error::AppError,
    models::{
        borrowing::{BookCondition, BorrowingQuery, BorrowingState, CreateBorrowing, RejectBorrowing},
        fine::FineReason,
        fine_level::UpdateFineLevel,
        return_request::SettleReturn,
        user::Actor,
    },
};

#[tokio::test]
async fn test_on_time_normal_return_restores_inventory() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(2).await;

    let loan = h.on_loan(&reader, book.id).await;
    assert_eq!(loan.state, BorrowingState::Borrowed);
    assert_eq!(h.quantities(book.id).await, (2, 1, 1));

    h.clock.advance_days(10);
    let outcome = h
        .return_with(&reader, loan.borrowing.id, BookCondition::Normal, None, None, None)
        .await
        .unwrap();

    assert!(outcome.fines.is_empty());
    assert_eq!(outcome.borrowing.state, BorrowingState::Returned);
    assert_eq!(outcome.borrowing.borrowing.return_date, Some(start_day() + Duration::days(10)));
    assert_eq!(outcome.borrowing.borrowing.returned_by, Some(LIBRARIAN.user_id));
    assert_eq!(h.quantities(book.id).await, (2, 2, 0));
    assert_eq!(h.stored_fine_count().await, 0);
}

#[tokio::test]
async fn test_last_copy_blocks_other_readers() {
    let h = Harness::new();
    let (a, b) = (Actor::reader(1), Actor::reader(2));
    let book = h.book(1).await;

    h.on_loan(&a, book.id).await;
    assert_eq!(h.quantities(book.id).await, (1, 0, 1));

    let refused = h
        .services
        .borrowings
        .create(&b, CreateBorrowing { book_id: book.id, borrow_days: None })
        .await;
    assert!(matches!(refused, Err(AppError::PolicyViolation(_))));

    let report = h.services.borrowings.check_eligibility(&b, book.id).await.unwrap();
    assert!(!report.eligible);
}

#[tokio::test]
async fn test_second_confirmation_of_last_copy_conflicts() {
    let h = Harness::new();
    let book = h.book(1).await;

    // Both requests pass the gate while the copy is still on the shelf
    let first = h.request(&Actor::reader(1), book.id).await;
    let second = h.request(&Actor::reader(2), book.id).await;

    let (r1, r2) = tokio::join!(
        h.services.borrowings.confirm(&LIBRARIAN, first.borrowing.id),
        h.services.borrowings.confirm(&LIBRARIAN, second.borrowing.id),
    );
    let results = [r1, r2];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));
    assert_eq!(h.quantities(book.id).await, (1, 0, 1));
}

#[tokio::test]
async fn test_confirming_twice_moves_one_copy() {
    let h = Harness::new();
    let book = h.book(1).await;
    let loan = h.on_loan(&Actor::reader(1), book.id).await;
    assert_eq!(h.quantities(book.id).await, (1, 0, 1));

    let again = h.services.borrowings.confirm(&LIBRARIAN, loan.borrowing.id).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));
    assert_eq!(h.quantities(book.id).await, (1, 0, 1));
}

#[tokio::test]
async fn test_extend_once() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let loan = h.on_loan(&reader, book.id).await;
    let due = loan.borrowing.due_date;
    assert_eq!(due, start_day() + Duration::days(14));

    let extended = h.services.borrowings.extend(&reader, loan.borrowing.id).await.unwrap();
    assert_eq!(extended.borrowing.due_date, due + Duration::days(7));
    assert_eq!(extended.borrowing.extended_count, 1);

    let again = h.services.borrowings.extend(&reader, loan.borrowing.id).await;
    assert!(matches!(again, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_extend_refused_when_overdue_or_not_owner() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let loan = h.on_loan(&reader, book.id).await;

    let stranger = h.services.borrowings.extend(&Actor::reader(2), loan.borrowing.id).await;
    assert!(matches!(stranger, Err(AppError::Unauthorized(_))));

    h.clock.advance_days(15);
    let overdue = h.services.borrowings.extend(&reader, loan.borrowing.id).await;
    assert!(matches!(overdue, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_borrow_limit() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(10).await;
    let mut books = vec![book.id];
    for _ in 0..5 {
        books.push(h.book(1).await.id);
    }

    for id in &books[..5] {
        h.request(&reader, *id).await;
    }
    let sixth = h
        .services
        .borrowings
        .create(&reader, CreateBorrowing { book_id: books[5], borrow_days: None })
        .await;
    assert!(matches!(sixth, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_concurrent_requests_respect_borrow_limit() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    for _ in 0..4 {
        let id = h.book(1).await.id;
        h.request(&reader, id).await;
    }
    let (fifth, sixth) = (h.book(1).await.id, h.book(1).await.id);

    let (r1, r2) = tokio::join!(
        h.services.borrowings.create(&reader, CreateBorrowing { book_id: fifth, borrow_days: None }),
        h.services.borrowings.create(&reader, CreateBorrowing { book_id: sixth, borrow_days: None }),
    );
    let results = [r1, r2];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(AppError::PolicyViolation(_)))));

    let mine = h.services.borrowings.list_mine(&reader, BorrowingQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 5);
}

#[tokio::test]
async fn test_staff_cannot_file_borrow_requests() {
    let h = Harness::new();
    let book = h.book(1).await;
    let request = h
        .services
        .borrowings
        .create(&LIBRARIAN, CreateBorrowing { book_id: book.id, borrow_days: None })
        .await;
    assert!(matches!(request, Err(AppError::Unauthorized(_))));
    assert_eq!(h.quantities(book.id).await, (1, 1, 0));
}

#[tokio::test]
async fn test_duplicate_pending_request() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(3).await;

    h.request(&reader, book.id).await;
    let duplicate = h
        .services
        .borrowings
        .create(&reader, CreateBorrowing { book_id: book.id, borrow_days: None })
        .await;
    assert!(matches!(duplicate, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_cancel_only_while_pending() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(2).await;

    let pending = h.request(&reader, book.id).await;
    h.services.borrowings.cancel(&reader, pending.borrowing.id).await.unwrap();
    let gone = h.services.borrowings.get(&reader, pending.borrowing.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
    assert_eq!(h.quantities(book.id).await, (2, 2, 0));

    let loan = h.on_loan(&reader, book.id).await;
    let late = h.services.borrowings.cancel(&reader, loan.borrowing.id).await;
    assert!(matches!(late, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_reject_keeps_inventory() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let pending = h.request(&reader, book.id).await;

    let empty = h
        .services
        .borrowings
        .reject(&LIBRARIAN, pending.borrowing.id, RejectBorrowing { reason: "   ".to_string() })
        .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let rejected = h
        .services
        .borrowings
        .reject(
            &LIBRARIAN,
            pending.borrowing.id,
            RejectBorrowing { reason: "Reserved for a class".to_string() },
        )
        .await
        .unwrap();
    assert_eq!(rejected.state, BorrowingState::Rejected);
    assert_eq!(rejected.borrowing.rejection_reason.as_deref(), Some("Reserved for a class"));
    assert_eq!(h.quantities(book.id).await, (1, 1, 0));

    let confirm = h.services.borrowings.confirm(&LIBRARIAN, pending.borrowing.id).await;
    assert!(matches!(confirm, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_lost_overdue_return_writes_off_copy() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(2).await;
    let lost = h.level("Lost book", 2500).await;
    let late = h.level("Late return", 300).await;
    let loan = h.on_loan(&reader, book.id).await;

    h.clock.advance_days(17);
    let overdue = h.services.borrowings.get(&reader, loan.borrowing.id).await.unwrap();
    assert_eq!(overdue.state, BorrowingState::Overdue);
    assert_eq!(overdue.days_overdue, 3);

    let outcome = h
        .return_with(
            &reader,
            loan.borrowing.id,
            BookCondition::Lost,
            Some(lost.id),
            Some(late.id),
            Some("Lost while travelling"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.fines.len(), 1);
    assert_eq!(outcome.fines[0].reason, FineReason::Lost);
    assert_eq!(outcome.fines[0].amount, Decimal::new(2500, 2));
    // available unchanged, borrowed and total each down by one
    assert_eq!(h.quantities(book.id).await, (1, 1, 0));
}

#[tokio::test]
async fn test_damaged_overdue_return_without_late_level() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let damage = h.level("Damage", 1000).await;
    let loan = h.on_loan(&reader, book.id).await;

    h.clock.advance_days(16);
    let outcome = h
        .return_with(
            &reader,
            loan.borrowing.id,
            BookCondition::Damaged,
            Some(damage.id),
            None,
            Some("Coffee stains"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.fines.len(), 2);
    assert!(outcome.fines.iter().all(|f| f.fine_level_id == damage.id));
    let late = outcome
        .fines
        .iter()
        .find(|f| f.reason == FineReason::LateReturn)
        .unwrap();
    assert!(late.note.as_deref().unwrap().starts_with("Late by 2 days"));
    assert_eq!(h.quantities(book.id).await, (1, 1, 0));
}

#[tokio::test]
async fn test_failed_settlement_leaves_nothing_behind() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let loan = h.on_loan(&reader, book.id).await;
    h.clock.advance_days(20);

    let request = h
        .services
        .borrowings
        .request_return(&reader, loan.borrowing.id)
        .await
        .unwrap();
    let settle = |fine_level_id| SettleReturn {
        book_condition: BookCondition::Normal,
        fine_level_id,
        late_fine_level_id: None,
        note: None,
    };

    let missing_level = h.services.returns.settle(&LIBRARIAN, request.id, settle(None)).await;
    assert!(matches!(missing_level, Err(AppError::Validation(_))));
    let unknown_level = h.services.returns.settle(&LIBRARIAN, request.id, settle(Some(9999))).await;
    assert!(matches!(unknown_level, Err(AppError::NotFound(_))));

    let still_out = h.services.borrowings.get(&reader, loan.borrowing.id).await.unwrap();
    assert_eq!(still_out.state, BorrowingState::Overdue);
    assert_eq!(h.quantities(book.id).await, (1, 0, 1));
    assert_eq!(h.stored_fine_count().await, 0);

    // Safe to retry once the inspection is complete
    let late = h.level("Late", 200).await;
    let outcome = h
        .services
        .returns
        .settle(&LIBRARIAN, request.id, settle(Some(late.id)))
        .await
        .unwrap();
    assert_eq!(outcome.fines.len(), 1);

    let twice = h.services.returns.settle(&LIBRARIAN, request.id, settle(Some(late.id))).await;
    assert!(matches!(twice, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_one_pending_return_request() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let loan = h.on_loan(&reader, book.id).await;

    h.services
        .borrowings
        .request_return(&reader, loan.borrowing.id)
        .await
        .unwrap();
    let again = h.services.borrowings.request_return(&reader, loan.borrowing.id).await;
    assert!(matches!(again, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_fine_amount_is_a_snapshot() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let damage = h.level("Damage", 1000).await;
    let loan = h.on_loan(&reader, book.id).await;

    let outcome = h
        .return_with(&reader, loan.borrowing.id, BookCondition::Damaged, Some(damage.id), None, Some("Torn cover"))
        .await
        .unwrap();

    h.services
        .fine_levels
        .update(
            &LIBRARIAN,
            damage.id,
            UpdateFineLevel { name: None, amount: Some(Decimal::new(4000, 2)), description: None },
        )
        .await
        .unwrap();

    let fine = h.services.fines.get(&reader, outcome.fines[0].id).await.unwrap();
    assert_eq!(fine.amount, Decimal::new(1000, 2));

    let delete = h.services.fine_levels.delete(&LIBRARIAN, damage.id).await;
    assert!(matches!(delete, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_overdue_filter_and_history() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let first = h.book(1).await;
    let second = h.book(1).await;

    let early = h.on_loan(&reader, first.id).await;
    h.clock.advance_days(5);
    h.on_loan(&reader, second.id).await;
    h.clock.advance_days(10);

    let overdue = h
        .services
        .borrowings
        .list(
            &LIBRARIAN,
            BorrowingQuery { status: Some(BorrowingState::Overdue), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].borrowing.id, early.borrowing.id);

    let mine = h.services.borrowings.list_mine(&reader, BorrowingQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 2);

    let open = h.services.borrowings.remove_history(&LIBRARIAN, early.borrowing.id).await;
    assert!(matches!(open, Err(AppError::InvalidState(_))));

    let late = h.level("Late", 100).await;
    h.return_with(&reader, early.borrowing.id, BookCondition::Normal, Some(late.id), None, None)
        .await
        .unwrap();

    // Fines still point at the borrowing
    let referenced = h.services.borrowings.remove_history(&LIBRARIAN, early.borrowing.id).await;
    assert!(matches!(referenced, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_set_total_quantity() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(3).await;
    h.on_loan(&reader, book.id).await;
    h.on_loan(&Actor::reader(2), book.id).await;

    let below = h.services.inventory.set_total_quantity(&LIBRARIAN, book.id, 1).await;
    assert!(matches!(below, Err(AppError::PolicyViolation(_))));

    let grown = h.services.inventory.set_total_quantity(&LIBRARIAN, book.id, 5).await.unwrap();
    assert_eq!(
        (grown.total_quantity, grown.available_quantity, grown.borrowed_quantity),
        (5, 3, 2)
    );
}

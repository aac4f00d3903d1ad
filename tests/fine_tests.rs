//! Fine payment workflow and its effect on eligibility

mod common;

use common::{Harness, LIBRARIAN};
use lectern_server::{
    clock::Clock,
    error::AppError,
    models::{
        borrowing::{BookCondition, CreateBorrowing},
        fine::{Fine, FineQuery, FineStatus, PayFine, RejectFine},
        user::Actor,
    },
};

/// A reader with one damage fine on a returned borrowing
async fn fined_reader(h: &Harness, reader: &Actor) -> Fine {
    let book = h.book(2).await;
    let level = h.level(&format!("Damage {}", reader.user_id), 800).await;
    let loan = h.on_loan(reader, book.id).await;
    let outcome = h
        .return_with(reader, loan.borrowing.id, BookCondition::Damaged, Some(level.id), None, Some("Spine broken"))
        .await
        .unwrap();
    outcome.fines.into_iter().next().unwrap()
}

fn proof(text: &str) -> PayFine {
    PayFine { payment_proof: text.to_string() }
}

fn refusal(text: &str) -> RejectFine {
    RejectFine { reason: text.to_string() }
}

#[tokio::test]
async fn test_pay_and_confirm() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let fine = fined_reader(&h, &reader).await;
    assert_eq!(fine.status, FineStatus::Unpaid);

    let submitted = h.services.fines.pay(&reader, fine.id, proof("receipt 42")).await.unwrap();
    assert_eq!(submitted.status, FineStatus::Pending);
    assert_eq!(submitted.payment_proof.as_deref(), Some("receipt 42"));
    assert!(submitted.submitted_at.is_some());

    let twice = h.services.fines.pay(&reader, fine.id, proof("receipt 43")).await;
    assert!(matches!(twice, Err(AppError::InvalidState(_))));

    let paid = h.services.fines.confirm(&LIBRARIAN, fine.id).await.unwrap();
    assert_eq!(paid.status, FineStatus::Paid);
    assert_eq!(paid.confirmed_by, Some(LIBRARIAN.user_id));

    let after = h.services.fines.pay(&reader, fine.id, proof("receipt 44")).await;
    assert!(matches!(after, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_rejected_payment_can_be_resubmitted() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let fine = fined_reader(&h, &reader).await;

    h.services.fines.pay(&reader, fine.id, proof("transfer")).await.unwrap();
    let rejected = h
        .services
        .fines
        .reject(&LIBRARIAN, fine.id, refusal("Transfer not received"))
        .await
        .unwrap();
    assert_eq!(rejected.status, FineStatus::Rejected);

    let again = h.services.fines.pay(&reader, fine.id, proof("second transfer")).await.unwrap();
    assert_eq!(again.status, FineStatus::Pending);
    assert_eq!(again.rejection_reason, None);

    let rejected = h
        .services
        .fines
        .reject(&LIBRARIAN, fine.id, refusal("Still missing"))
        .await
        .unwrap();
    assert_eq!(rejected.status, FineStatus::Rejected);

    let confirm = h.services.fines.confirm(&LIBRARIAN, fine.id).await;
    assert!(matches!(confirm, Err(AppError::InvalidState(_))));

    let stored = h.services.fines.get(&reader, fine.id).await.unwrap();
    assert_eq!(stored.status, FineStatus::Rejected);
    assert_eq!(stored.amount, fine.amount);
}

#[tokio::test]
async fn test_only_owner_pays_and_only_staff_confirm() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let fine = fined_reader(&h, &reader).await;

    let other = h.services.fines.pay(&Actor::reader(2), fine.id, proof("x")).await;
    assert!(matches!(other, Err(AppError::Unauthorized(_))));

    h.services.fines.pay(&reader, fine.id, proof("cash")).await.unwrap();
    let self_confirm = h.services.fines.confirm(&reader, fine.id).await;
    assert!(matches!(self_confirm, Err(AppError::Unauthorized(_))));

    let peek = h.services.fines.get(&Actor::reader(2), fine.id).await;
    assert!(matches!(peek, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_outstanding_fine_blocks_borrowing_until_paid() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let fine = fined_reader(&h, &reader).await;
    let book = h.book(1).await;
    let request = CreateBorrowing { book_id: book.id, borrow_days: None };

    let blocked = h.services.borrowings.create(&reader, request.clone()).await;
    assert!(matches!(blocked, Err(AppError::PolicyViolation(_))));

    // A rejected payment leaves the fine owed
    h.services.fines.pay(&reader, fine.id, proof("cheque")).await.unwrap();
    h.services.fines.reject(&LIBRARIAN, fine.id, refusal("Bounced")).await.unwrap();
    let still = h.services.borrowings.create(&reader, request.clone()).await;
    assert!(matches!(still, Err(AppError::PolicyViolation(_))));

    h.services.fines.pay(&reader, fine.id, proof("cash")).await.unwrap();
    h.services.fines.confirm(&LIBRARIAN, fine.id).await.unwrap();
    assert!(h.services.borrowings.create(&reader, request).await.is_ok());
}

#[tokio::test]
async fn test_outstanding_fine_blocks_extension() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let book = h.book(1).await;
    let loan = h.on_loan(&reader, book.id).await;
    fined_reader(&h, &reader).await;

    let extend = h.services.borrowings.extend(&reader, loan.borrowing.id).await;
    assert!(matches!(extend, Err(AppError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_list_fines() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    fined_reader(&h, &reader).await;
    fined_reader(&h, &Actor::reader(2)).await;

    let mine = h.services.fines.list_mine(&reader, FineQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 1);

    let forbidden = h.services.fines.list(&reader, FineQuery::default()).await;
    assert!(matches!(forbidden, Err(AppError::Unauthorized(_))));

    let unpaid = h
        .services
        .fines
        .list(&LIBRARIAN, FineQuery { status: Some(FineStatus::Unpaid), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(unpaid.len(), 2);
}

#[tokio::test]
async fn test_stats_projections() {
    let h = Harness::new();
    let reader = Actor::reader(1);
    let fine = fined_reader(&h, &reader).await;
    h.services.fines.pay(&reader, fine.id, proof("cash")).await.unwrap();
    h.services.fines.confirm(&LIBRARIAN, fine.id).await.unwrap();

    let totals = h.services.stats.fine_totals(&LIBRARIAN).await.unwrap();
    let damaged = totals.iter().find(|t| t.count == 1).unwrap();
    assert_eq!(damaged.total_amount, fine.amount);
    assert_eq!(damaged.paid_amount, fine.amount);

    let report = h
        .services
        .stats
        .condition_report(&LIBRARIAN, BookCondition::Damaged)
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].book_title, "The Name of the Rose");

    let today = h.clock.today();
    let activity = h.services.stats.daily_activity(&LIBRARIAN, today, today).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!((activity[0].borrowed, activity[0].returned), (1, 1));

    let reversed = h
        .services
        .stats
        .daily_activity(&LIBRARIAN, today, today.pred_opt().unwrap())
        .await;
    assert!(matches!(reversed, Err(AppError::Validation(_))));
}

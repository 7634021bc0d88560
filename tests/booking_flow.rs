mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;

use cinema_booking::config::BookingConfig;
use cinema_booking::error::BookingError;
use cinema_booking::models::{PaymentMethod, TransactionStatus};
use cinema_booking::services::sweeper::ExpirySweeper;
use cinema_booking::store::BookingStore;

use common::{
    checkout_service, hold_of, payment_service, screening_starting_in, seeded_store,
    CountingNotifier, OTHER_OWNER_ID, OWNER_ID, SCREENING_ID,
};

#[tokio::test]
async fn checkout_two_reguler_seats() {
    let store = seeded_store().await;
    let service = checkout_service(&store, BookingConfig::default());

    let summary = service
        .checkout(OWNER_ID, SCREENING_ID, &[1, 2], PaymentMethod::Cash)
        .await
        .unwrap();

    assert_eq!(summary.total_price, 100_000);
    assert_eq!(summary.ticket_ids.len(), 2);
    assert!(summary.payment_code.starts_with("TXN-"));

    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
    assert_eq!(txn.expires_at, txn.created_at + Duration::minutes(5));

    // Ticket prices sum back to the transaction total.
    let tickets = store.tickets_for(txn.id).await.unwrap();
    assert_eq!(tickets.iter().map(|t| t.price).sum::<i64>(), txn.total_price);
}

#[tokio::test]
async fn checkout_prices_mixed_categories() {
    let store = seeded_store().await;
    let service = checkout_service(&store, BookingConfig::default());

    // REGULER + VIP + VVIP
    let summary = service
        .checkout(OWNER_ID, SCREENING_ID, &[1, 9, 10], PaymentMethod::EWallet)
        .await
        .unwrap();

    assert_eq!(summary.total_price, 50_000 + 75_000 + 100_000);
}

#[tokio::test]
async fn checkout_rejects_bad_seat_lists() {
    let store = seeded_store().await;
    let service = checkout_service(&store, BookingConfig::default());

    let empty = service
        .checkout(OWNER_ID, SCREENING_ID, &[], PaymentMethod::Cash)
        .await;
    assert!(matches!(empty, Err(BookingError::InvalidInput(_))));

    let too_many: Vec<i64> = (1..=11).collect();
    let oversized = service
        .checkout(OWNER_ID, SCREENING_ID, &too_many, PaymentMethod::Cash)
        .await;
    assert!(matches!(oversized, Err(BookingError::InvalidInput(_))));

    let duplicated = service
        .checkout(OWNER_ID, SCREENING_ID, &[1, 1], PaymentMethod::Cash)
        .await;
    assert!(matches!(duplicated, Err(BookingError::InvalidInput(_))));
}

#[tokio::test]
async fn checkout_rejects_unknown_screening_and_seats() {
    let store = seeded_store().await;
    let service = checkout_service(&store, BookingConfig::default());

    let no_screening = service
        .checkout(OWNER_ID, 999, &[1], PaymentMethod::Cash)
        .await;
    assert!(matches!(
        no_screening,
        Err(BookingError::NotFound { resource: "screening", .. })
    ));

    let no_seat = service
        .checkout(OWNER_ID, SCREENING_ID, &[1, 999], PaymentMethod::Cash)
        .await;
    match no_seat {
        Err(BookingError::NotFound { resource, id }) => {
            assert_eq!(resource, "seat");
            assert_eq!(id, "999");
        }
        other => panic!("expected seat NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn checkout_rejects_seats_from_another_venue() {
    let store = seeded_store().await;
    store
        .insert_seat(cinema_booking::models::Seat {
            id: 50,
            venue_id: 2,
            number: "B1".to_string(),
            category: cinema_booking::models::SeatCategory::Reguler,
        })
        .await;
    let service = checkout_service(&store, BookingConfig::default());

    let result = service
        .checkout(OWNER_ID, SCREENING_ID, &[1, 50], PaymentMethod::Cash)
        .await;
    match result {
        Err(BookingError::InvalidInput(message)) => assert!(message.contains("B1")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[tokio::test]
async fn checkout_rejects_started_screening() {
    let store = seeded_store().await;
    store.insert_screening(screening_starting_in(7, -10)).await;
    let service = checkout_service(&store, BookingConfig::default());

    let result = service.checkout(OWNER_ID, 7, &[1], PaymentMethod::Cash).await;
    assert!(matches!(result, Err(BookingError::InvalidInput(_))));
}

#[tokio::test]
async fn second_checkout_names_conflicting_seats() {
    let store = seeded_store().await;
    let service = checkout_service(&store, BookingConfig::default());

    service
        .checkout(OWNER_ID, SCREENING_ID, &[7], PaymentMethod::Cash)
        .await
        .unwrap();

    let result = service
        .checkout(OTHER_OWNER_ID, SCREENING_ID, &[6, 7], PaymentMethod::Cash)
        .await;
    match result {
        Err(BookingError::SeatUnavailable { conflicting }) => {
            assert_eq!(conflicting, vec!["A7".to_string()]);
        }
        other => panic!("expected SeatUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_hold_releases_the_seat() {
    let store = seeded_store().await;
    let instant_expiry = checkout_service(&store, hold_of(0));
    let normal = checkout_service(&store, BookingConfig::default());

    instant_expiry
        .checkout(OWNER_ID, SCREENING_ID, &[3], PaymentMethod::Cash)
        .await
        .unwrap();

    // The first hold is already past its deadline, so the seat is free again.
    let second = normal
        .checkout(OTHER_OWNER_ID, SCREENING_ID, &[3], PaymentMethod::Cash)
        .await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn confirm_settles_once_and_notifies_once() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier.clone(), BookingConfig::default());

    let summary = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[1, 2], PaymentMethod::BankTransfer)
        .await
        .unwrap();

    assert!(payments.confirm(&summary.payment_code).await.unwrap());
    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Lunas);
    assert_eq!(notifier.sent(), 1);

    // Second confirm is a no-op: false, no second notification, still LUNAS.
    assert!(!payments.confirm(&summary.payment_code).await.unwrap());
    assert_eq!(notifier.sent(), 1);
    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Lunas);
}

#[tokio::test]
async fn confirm_unknown_code_is_not_found() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let result = payments.confirm("TXN-DOES-NOT-EXIST").await;
    assert!(matches!(result, Err(BookingError::NotFound { .. })));
}

#[tokio::test]
async fn confirm_after_expiry_cancels_and_returns_false() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, hold_of(0));
    let payments = payment_service(&store, notifier.clone(), BookingConfig::default());

    let summary = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[4], PaymentMethod::Cash)
        .await
        .unwrap();

    assert!(!payments.confirm(&summary.payment_code).await.unwrap());
    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Dibatalkan);
    assert_eq!(notifier.sent(), 0);

    // And it stays unconfirmable.
    assert!(!payments.confirm(&summary.payment_code).await.unwrap());
    assert_eq!(notifier.sent(), 0);
}

#[tokio::test]
async fn owner_cancellation_frees_the_seats() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let summary = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[5], PaymentMethod::Cash)
        .await
        .unwrap();

    let message = payments
        .cancel(summary.transaction_id, OWNER_ID)
        .await
        .unwrap();
    assert!(message.contains(&summary.payment_code));

    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Dibatalkan);

    // Seat is claimable again immediately.
    let again = checkout
        .checkout(OTHER_OWNER_ID, SCREENING_ID, &[5], PaymentMethod::Cash)
        .await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn cancellation_rules() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let summary = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[1], PaymentMethod::Cash)
        .await
        .unwrap();

    // Not the owner.
    let foreign = payments.cancel(summary.transaction_id, OTHER_OWNER_ID).await;
    assert!(matches!(foreign, Err(BookingError::Forbidden(_))));

    // Unknown id.
    let missing = payments.cancel(999, OWNER_ID).await;
    assert!(matches!(missing, Err(BookingError::NotFound { .. })));

    // Terminal transaction.
    assert!(payments.confirm(&summary.payment_code).await.unwrap());
    let settled = payments.cancel(summary.transaction_id, OWNER_ID).await;
    assert!(matches!(settled, Err(BookingError::InvalidState(_))));
}

#[tokio::test]
async fn cancellation_closes_near_showtime() {
    let store = seeded_store().await;
    // Screening in 10 minutes: checkout is still allowed, cancellation is not
    // (grace window is 30 minutes).
    store.insert_screening(screening_starting_in(8, 10)).await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let summary = checkout
        .checkout(OWNER_ID, 8, &[6], PaymentMethod::Cash)
        .await
        .unwrap();

    let result = payments.cancel(summary.transaction_id, OWNER_ID).await;
    assert!(matches!(result, Err(BookingError::Forbidden(_))));

    // The hold itself is untouched.
    let txn = store
        .transaction_by_id(summary.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn sweeper_expires_overdue_transactions_only() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let instant_expiry = checkout_service(&store, hold_of(0));
    let normal = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let overdue_a = instant_expiry
        .checkout(OWNER_ID, SCREENING_ID, &[1], PaymentMethod::Cash)
        .await
        .unwrap();
    let overdue_b = instant_expiry
        .checkout(OWNER_ID, SCREENING_ID, &[2], PaymentMethod::Cash)
        .await
        .unwrap();
    let live = normal
        .checkout(OWNER_ID, SCREENING_ID, &[3], PaymentMethod::Cash)
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(store.clone(), std::time::Duration::from_secs(60));
    let report = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(report.expired, 2);
    assert_eq!(report.failed, 0);

    for id in [overdue_a.transaction_id, overdue_b.transaction_id] {
        let txn = store.transaction_by_id(id).await.unwrap().unwrap();
        assert_eq!(txn.status, TransactionStatus::Dibatalkan);
    }
    let txn = store
        .transaction_by_id(live.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);

    // Swept transactions are gone for good.
    assert!(!payments.confirm(&overdue_a.payment_code).await.unwrap());

    // Nothing left to do on the next pass.
    let report = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(report.expired, 0);
}

#[tokio::test]
async fn history_lists_newest_first_with_status_filter() {
    let store = seeded_store().await;
    let notifier = Arc::new(CountingNotifier::default());
    let checkout = checkout_service(&store, BookingConfig::default());
    let payments = payment_service(&store, notifier, BookingConfig::default());

    let first = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[1], PaymentMethod::Cash)
        .await
        .unwrap();
    let second = checkout
        .checkout(OWNER_ID, SCREENING_ID, &[2, 3], PaymentMethod::EWallet)
        .await
        .unwrap();
    checkout
        .checkout(OTHER_OWNER_ID, SCREENING_ID, &[4], PaymentMethod::Cash)
        .await
        .unwrap();
    assert!(payments.confirm(&first.payment_code).await.unwrap());

    let all = store
        .transactions_for_owner(OWNER_ID, None, 20, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].transaction.id, second.transaction_id);
    assert_eq!(all[0].seat_numbers, vec!["A2".to_string(), "A3".to_string()]);

    let paid = store
        .transactions_for_owner(OWNER_ID, Some(TransactionStatus::Lunas), 20, 0)
        .await
        .unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].transaction.id, first.transaction_id);
}

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cinema_booking::config::BookingConfig;
use cinema_booking::models::{Screening, Seat, SeatCategory, User};
use cinema_booking::services::checkout::CheckoutService;
use cinema_booking::services::notifier::{PaymentConfirmation, PaymentNotifier};
use cinema_booking::services::payment::PaymentService;
use cinema_booking::store::memory::MemoryBookingStore;

pub const OWNER_ID: i64 = 1;
pub const OTHER_OWNER_ID: i64 = 2;
pub const VENUE_ID: i64 = 1;
pub const SCREENING_ID: i64 = 1;

/// Screening tomorrow evening: not started, and far enough out that the
/// cancellation grace window never interferes unless a test wants it to.
pub fn screening_tomorrow(id: i64) -> Screening {
    let starts = Utc::now().naive_utc() + Duration::days(1);
    Screening {
        id,
        venue_id: VENUE_ID,
        movie_title: "Laskar Pelangi".to_string(),
        start_date: starts.date(),
        start_time: starts.time(),
    }
}

pub fn screening_starting_in(id: i64, minutes: i64) -> Screening {
    let starts = Utc::now().naive_utc() + Duration::minutes(minutes);
    Screening {
        id,
        venue_id: VENUE_ID,
        movie_title: "Laskar Pelangi".to_string(),
        start_date: starts.date(),
        start_time: starts.time(),
    }
}

/// Seats 1..=8 are REGULER A1..A8, seat 9 is VIP V1, seat 10 is VVIP W1.
pub async fn seeded_store() -> Arc<MemoryBookingStore> {
    let store = Arc::new(MemoryBookingStore::new());

    store
        .insert_user(User {
            id: OWNER_ID,
            username: "andi".to_string(),
            email: "andi@example.com".to_string(),
            password: "rahasia".to_string(),
            is_active: true,
        })
        .await;
    store
        .insert_user(User {
            id: OTHER_OWNER_ID,
            username: "budi".to_string(),
            email: "budi@example.com".to_string(),
            password: "rahasia".to_string(),
            is_active: true,
        })
        .await;

    store.insert_screening(screening_tomorrow(SCREENING_ID)).await;

    for id in 1..=8 {
        store
            .insert_seat(Seat {
                id,
                venue_id: VENUE_ID,
                number: format!("A{id}"),
                category: SeatCategory::Reguler,
            })
            .await;
    }
    store
        .insert_seat(Seat {
            id: 9,
            venue_id: VENUE_ID,
            number: "V1".to_string(),
            category: SeatCategory::Vip,
        })
        .await;
    store
        .insert_seat(Seat {
            id: 10,
            venue_id: VENUE_ID,
            number: "W1".to_string(),
            category: SeatCategory::Vvip,
        })
        .await;

    store
}

pub fn hold_of(minutes: i64) -> BookingConfig {
    BookingConfig {
        hold_minutes: minutes,
        ..BookingConfig::default()
    }
}

pub fn checkout_service(store: &Arc<MemoryBookingStore>, booking: BookingConfig) -> CheckoutService {
    CheckoutService::new(store.clone(), booking)
}

pub fn payment_service(
    store: &Arc<MemoryBookingStore>,
    notifier: Arc<CountingNotifier>,
    booking: BookingConfig,
) -> PaymentService {
    PaymentService::new(store.clone(), notifier, booking)
}

/// Notifier that only counts deliveries; the idempotency tests assert on it.
#[derive(Default)]
pub struct CountingNotifier {
    sent: AtomicUsize,
}

impl CountingNotifier {
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentNotifier for CountingNotifier {
    async fn send_payment_confirmation(
        &self,
        _recipient: &str,
        _confirmation: &PaymentConfirmation,
    ) -> anyhow::Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

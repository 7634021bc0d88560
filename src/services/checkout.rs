use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::models::{PaymentMethod, Seat};
use crate::pricing;
use crate::store::{BookingStore, NewReservation, ReserveError, SeatClaim};

/// Bounded retry budget for payment-code generation. Codes carry 128 bits
/// of randomness, so exhausting this is an operational alarm, not a user
/// error.
const PAYMENT_CODE_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub transaction_id: i64,
    pub payment_code: String,
    pub expires_at: DateTime<Utc>,
    pub total_price: i64,
    pub payment_method: PaymentMethod,
    pub ticket_ids: Vec<i64>,
}

/// Validates a seat-claim request and turns it into a PENDING transaction
/// with one ticket per seat. The seat-exclusivity check and the inserts run
/// as one atomic unit inside the store.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn BookingStore>,
    booking: BookingConfig,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn BookingStore>, booking: BookingConfig) -> Self {
        Self { store, booking }
    }

    pub async fn checkout(
        &self,
        owner_id: i64,
        screening_id: i64,
        seat_ids: &[i64],
        payment_method: PaymentMethod,
    ) -> Result<CheckoutSummary, BookingError> {
        self.validate_seat_ids(seat_ids)?;

        let now = Utc::now();

        let screening = self
            .store
            .screening(screening_id)
            .await?
            .ok_or_else(|| BookingError::not_found("screening", screening_id))?;

        if screening.starts_at() <= now.naive_utc() {
            return Err(BookingError::InvalidInput(
                "screening has already started".to_string(),
            ));
        }

        let seats = self.store.seats_by_ids(seat_ids).await?;
        if seats.len() != seat_ids.len() {
            let found: HashSet<i64> = seats.iter().map(|s| s.id).collect();
            let missing: Vec<String> = seat_ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(BookingError::not_found("seat", missing.join(", ")));
        }

        let foreign: Vec<String> = seats
            .iter()
            .filter(|s| s.venue_id != screening.venue_id)
            .map(|s| s.number.clone())
            .collect();
        if !foreign.is_empty() {
            return Err(BookingError::InvalidInput(format!(
                "seats not in this screening's venue: {}",
                foreign.join(", ")
            )));
        }

        let total_price = pricing::total_price(&seats);
        let payment_code = self.generate_payment_code().await?;
        let expires_at = now + Duration::minutes(self.booking.hold_minutes);

        let new = NewReservation {
            owner_id,
            screening_id,
            total_price,
            payment_method,
            payment_code,
            expires_at,
            seats: seats
                .iter()
                .map(|s| SeatClaim {
                    seat_id: s.id,
                    price: pricing::price(s.category),
                })
                .collect(),
        };

        match self.store.create_reservation(new, now).await {
            Ok(reservation) => {
                info!(
                    transaction_id = reservation.transaction.id,
                    payment_code = %reservation.transaction.payment_code,
                    seats = seats.len(),
                    total_price,
                    "checkout completed"
                );
                Ok(CheckoutSummary {
                    transaction_id: reservation.transaction.id,
                    payment_code: reservation.transaction.payment_code,
                    expires_at: reservation.transaction.expires_at,
                    total_price,
                    payment_method,
                    ticket_ids: reservation.tickets.iter().map(|t| t.id).collect(),
                })
            }
            Err(ReserveError::SeatsTaken(taken)) => Err(BookingError::SeatUnavailable {
                conflicting: seat_numbers(&seats, &taken),
            }),
            Err(ReserveError::Store(e)) => Err(e.into()),
        }
    }

    fn validate_seat_ids(&self, seat_ids: &[i64]) -> Result<(), BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidInput(
                "at least one seat is required".to_string(),
            ));
        }
        if seat_ids.len() > self.booking.max_seats_per_checkout {
            return Err(BookingError::InvalidInput(format!(
                "at most {} seats per transaction",
                self.booking.max_seats_per_checkout
            )));
        }
        let mut seen = HashSet::with_capacity(seat_ids.len());
        if !seat_ids.iter().all(|id| seen.insert(*id)) {
            return Err(BookingError::InvalidInput(
                "duplicate seat ids in request".to_string(),
            ));
        }
        Ok(())
    }

    async fn generate_payment_code(&self) -> Result<String, BookingError> {
        for _ in 0..PAYMENT_CODE_ATTEMPTS {
            let code = format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase());
            if !self.store.payment_code_in_use(&code).await? {
                return Ok(code);
            }
        }
        Err(BookingError::Fatal(
            "could not generate a unique payment code".to_string(),
        ))
    }
}

fn seat_numbers(seats: &[Seat], ids: &[i64]) -> Vec<String> {
    let mut numbers: Vec<String> = seats
        .iter()
        .filter(|s| ids.contains(&s.id))
        .map(|s| s.number.clone())
        .collect();
    numbers.sort();
    numbers
}

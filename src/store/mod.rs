//! Storage port for the booking engine. The trait exposes whole atomic
//! units, not raw reads and writes: the reservation insert carries its own
//! availability re-check, and every state transition is a conditional update
//! that reports whether it won. Adapters: Postgres for production, an
//! in-process store for tests and fixtures.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{PaymentMethod, Screening, Seat, Ticket, Transaction, TransactionStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),
}

#[derive(Debug, Error)]
pub enum ReserveError {
    /// Some requested seats are already held for this screening. Carries the
    /// seat ids so the caller can name them.
    #[error("seats already claimed: {0:?}")]
    SeatsTaken(Vec<i64>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One seat of a reservation, priced at checkout time.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub seat_id: i64,
    pub price: i64,
}

/// Everything needed to persist one checkout atomically.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub owner_id: i64,
    pub screening_id: i64,
    pub total_price: i64,
    pub payment_method: PaymentMethod,
    pub payment_code: String,
    pub expires_at: DateTime<Utc>,
    pub seats: Vec<SeatClaim>,
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub transaction: Transaction,
    pub tickets: Vec<Ticket>,
}

/// History row: a transaction together with its seat numbers.
#[derive(Debug, Clone)]
pub struct TransactionWithSeats {
    pub transaction: Transaction,
    pub seat_numbers: Vec<String>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn screening(&self, id: i64) -> Result<Option<Screening>, StoreError>;

    async fn seats_by_ids(&self, ids: &[i64]) -> Result<Vec<Seat>, StoreError>;

    async fn seats_for_venue(&self, venue_id: i64) -> Result<Vec<Seat>, StoreError>;

    /// Seat Inventory View: which of the candidate seats are held for this
    /// screening by a LUNAS transaction or an unexpired PENDING one.
    /// Advisory outside `create_reservation`, authoritative inside it.
    async fn unavailable_seats(
        &self,
        screening_id: i64,
        seat_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError>;

    async fn payment_code_in_use(&self, code: &str) -> Result<bool, StoreError>;

    /// Atomic seat claim: re-checks availability under locks, then inserts
    /// the PENDING transaction and its tickets. Exactly one of two
    /// concurrent calls for an overlapping seat set can succeed.
    async fn create_reservation(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ReserveError>;

    async fn transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError>;

    async fn transaction_by_code(&self, code: &str) -> Result<Option<Transaction>, StoreError>;

    async fn tickets_for(&self, transaction_id: i64) -> Result<Vec<Ticket>, StoreError>;

    /// PENDING and unexpired -> LUNAS. Returns false when the guard fails,
    /// i.e. the transaction is terminal or overdue.
    async fn confirm_if_active(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// PENDING -> DIBATALKAN (owner cancellation).
    async fn cancel_if_pending(&self, id: i64) -> Result<bool, StoreError>;

    /// PENDING and overdue -> DIBATALKAN (sweeper / lazy expiry).
    async fn expire_if_overdue(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Sweeper scan: ids of PENDING transactions whose deadline has passed.
    async fn expired_pending_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>, StoreError>;

    async fn owner_email(&self, owner_id: i64) -> Result<Option<String>, StoreError>;

    async fn transactions_for_owner(
        &self,
        owner_id: i64,
        status: Option<TransactionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionWithSeats>, StoreError>;
}

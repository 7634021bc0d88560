use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::{
    BookingStore, NewReservation, Reservation, ReserveError, StoreError, TransactionWithSeats,
};
use crate::models::{
    Screening, Seat, Ticket, Transaction, TransactionStatus, User,
};

/// In-process adapter. A single mutex over the tables gives every trait
/// method the same all-or-nothing visibility the Postgres adapter gets from
/// its database transaction. Doubles as the fixture surface for tests.
#[derive(Default)]
pub struct MemoryBookingStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    screenings: HashMap<i64, Screening>,
    seats: BTreeMap<i64, Seat>,
    transactions: BTreeMap<i64, Transaction>,
    tickets: BTreeMap<i64, Ticket>,
    next_transaction_id: i64,
    next_ticket_id: i64,
}

impl Inner {
    /// Candidate seats held for this screening by a LUNAS transaction or an
    /// unexpired PENDING one.
    fn unavailable(&self, screening_id: i64, seat_ids: &[i64], now: DateTime<Utc>) -> Vec<i64> {
        let mut taken: Vec<i64> = Vec::new();
        for ticket in self.tickets.values() {
            if !seat_ids.contains(&ticket.seat_id) || taken.contains(&ticket.seat_id) {
                continue;
            }
            let Some(txn) = self.transactions.get(&ticket.transaction_id) else {
                continue;
            };
            if txn.screening_id != screening_id {
                continue;
            }
            let holds_seat = txn.status == TransactionStatus::Lunas || txn.is_active(now);
            if holds_seat {
                taken.push(ticket.seat_id);
            }
        }
        taken.sort_unstable();
        taken
    }
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_screening(&self, screening: Screening) {
        self.inner
            .lock()
            .await
            .screenings
            .insert(screening.id, screening);
    }

    pub async fn insert_seat(&self, seat: Seat) {
        self.inner.lock().await.seats.insert(seat.id, seat);
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn screening(&self, id: i64) -> Result<Option<Screening>, StoreError> {
        Ok(self.inner.lock().await.screenings.get(&id).cloned())
    }

    async fn seats_by_ids(&self, ids: &[i64]) -> Result<Vec<Seat>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .seats
            .values()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn seats_for_venue(&self, venue_id: i64) -> Result<Vec<Seat>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .seats
            .values()
            .filter(|s| s.venue_id == venue_id)
            .cloned()
            .collect())
    }

    async fn unavailable_seats(
        &self,
        screening_id: i64,
        seat_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .unavailable(screening_id, seat_ids, now))
    }

    async fn payment_code_in_use(&self, code: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .values()
            .any(|t| t.payment_code == code))
    }

    async fn create_reservation(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ReserveError> {
        let mut inner = self.inner.lock().await;

        let seat_ids: Vec<i64> = new.seats.iter().map(|s| s.seat_id).collect();
        let taken = inner.unavailable(new.screening_id, &seat_ids, now);
        if !taken.is_empty() {
            return Err(ReserveError::SeatsTaken(taken));
        }

        if inner
            .transactions
            .values()
            .any(|t| t.payment_code == new.payment_code)
        {
            return Err(StoreError::UniqueViolation("payment_code").into());
        }

        inner.next_transaction_id += 1;
        let transaction = Transaction {
            id: inner.next_transaction_id,
            owner_id: new.owner_id,
            screening_id: new.screening_id,
            total_price: new.total_price,
            status: TransactionStatus::Pending,
            payment_method: new.payment_method,
            payment_code: new.payment_code,
            created_at: now,
            expires_at: new.expires_at,
        };

        let mut tickets = Vec::with_capacity(new.seats.len());
        for claim in &new.seats {
            inner.next_ticket_id += 1;
            let ticket = Ticket {
                id: inner.next_ticket_id,
                transaction_id: transaction.id,
                seat_id: claim.seat_id,
                price: claim.price,
            };
            inner.tickets.insert(ticket.id, ticket.clone());
            tickets.push(ticket);
        }
        inner
            .transactions
            .insert(transaction.id, transaction.clone());

        Ok(Reservation {
            transaction,
            tickets,
        })
    }

    async fn transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.lock().await.transactions.get(&id).cloned())
    }

    async fn transaction_by_code(&self, code: &str) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .values()
            .find(|t| t.payment_code == code)
            .cloned())
    }

    async fn tickets_for(&self, transaction_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn confirm_if_active(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.transactions.get_mut(&id) {
            Some(txn) if txn.is_active(now) => {
                txn.status = TransactionStatus::Lunas;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_if_pending(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.transactions.get_mut(&id) {
            Some(txn) if txn.status == TransactionStatus::Pending => {
                txn.status = TransactionStatus::Dibatalkan;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_if_overdue(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.transactions.get_mut(&id) {
            Some(txn) if txn.status == TransactionStatus::Pending && txn.is_expired(now) => {
                txn.status = TransactionStatus::Dibatalkan;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expired_pending_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Pending && t.is_expired(now))
            .map(|t| t.id)
            .collect())
    }

    async fn owner_email(&self, owner_id: i64) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&owner_id).map(|u| u.email.clone()))
    }

    async fn transactions_for_owner(
        &self,
        owner_id: i64,
        status: Option<TransactionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionWithSeats>, StoreError> {
        let inner = self.inner.lock().await;

        let mut owned: Vec<&Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect();
        owned.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|transaction| {
                let mut seat_numbers: Vec<String> = inner
                    .tickets
                    .values()
                    .filter(|t| t.transaction_id == transaction.id)
                    .filter_map(|t| inner.seats.get(&t.seat_id).map(|s| s.number.clone()))
                    .collect();
                seat_numbers.sort();
                TransactionWithSeats {
                    transaction: transaction.clone(),
                    seat_numbers,
                }
            })
            .collect())
    }
}

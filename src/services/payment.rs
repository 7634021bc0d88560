use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::models::Transaction;
use crate::services::notifier::{PaymentConfirmation, PaymentNotifier};
use crate::store::BookingStore;

/// Resolves payment codes into LUNAS transitions and handles owner
/// cancellation. Both go through the store's conditional updates, so a
/// concurrent sweeper or double submit loses cleanly instead of mutating a
/// terminal transaction.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn PaymentNotifier>,
    booking: BookingConfig,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn PaymentNotifier>,
        booking: BookingConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            booking,
        }
    }

    /// Returns true exactly once per transaction: on the call that wins the
    /// PENDING -> LUNAS transition. Every other outcome (already settled,
    /// expired, lost the race) is false.
    pub async fn confirm(&self, payment_code: &str) -> Result<bool, BookingError> {
        let txn = self
            .store
            .transaction_by_code(payment_code)
            .await?
            .ok_or_else(|| BookingError::not_found("transaction", payment_code))?;

        if txn.status.is_terminal() {
            warn!(payment_code, status = ?txn.status, "confirm on settled transaction");
            return Ok(false);
        }

        let now = Utc::now();
        if txn.is_expired(now) {
            // Same effect the sweeper would have; losing that race is fine.
            self.store.expire_if_overdue(txn.id, now).await?;
            info!(payment_code, "confirm after expiry, transaction cancelled");
            return Ok(false);
        }

        if !self.store.confirm_if_active(txn.id, now).await? {
            return Ok(false);
        }

        info!(payment_code, transaction_id = txn.id, "payment confirmed");
        self.notify(&txn).await;
        Ok(true)
    }

    /// Owner-initiated cancellation. Allowed only while PENDING and only
    /// while the screening is further away than the grace window.
    pub async fn cancel(
        &self,
        transaction_id: i64,
        owner_id: i64,
    ) -> Result<String, BookingError> {
        let txn = self
            .store
            .transaction_by_id(transaction_id)
            .await?
            .ok_or_else(|| BookingError::not_found("transaction", transaction_id))?;

        if txn.owner_id != owner_id {
            return Err(BookingError::Forbidden(
                "transaction belongs to another user".to_string(),
            ));
        }

        if txn.status.is_terminal() {
            return Err(BookingError::InvalidState(
                "only PENDING transactions can be cancelled".to_string(),
            ));
        }

        let screening = self
            .store
            .screening(txn.screening_id)
            .await?
            .ok_or_else(|| BookingError::not_found("screening", txn.screening_id))?;

        let now = Utc::now();
        let grace = Duration::minutes(self.booking.cancel_grace_minutes);
        if screening.starts_at() <= now.naive_utc() + grace {
            return Err(BookingError::Forbidden(format!(
                "screening starts within {} minutes, cancellation closed",
                self.booking.cancel_grace_minutes
            )));
        }

        if !self.store.cancel_if_pending(txn.id).await? {
            // Settled or expired between our read and the update.
            return Err(BookingError::InvalidState(
                "transaction was resolved concurrently".to_string(),
            ));
        }

        info!(transaction_id, payment_code = %txn.payment_code, "transaction cancelled by owner");
        Ok(format!(
            "transaction {} has been cancelled",
            txn.payment_code
        ))
    }

    /// Fire-and-forget confirmation notice; runs after the transition has
    /// committed, so every failure ends at the log.
    async fn notify(&self, txn: &Transaction) {
        let recipient = match self.store.owner_email(txn.owner_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(owner_id = txn.owner_id, "no address for confirmation notice");
                return;
            }
            Err(e) => {
                error!(owner_id = txn.owner_id, error = %e, "owner lookup failed, notice skipped");
                return;
            }
        };

        let movie_title = match self.store.screening(txn.screening_id).await {
            Ok(Some(s)) => s.movie_title,
            _ => String::new(),
        };

        let seat_numbers = match self.seat_numbers(txn.id).await {
            Ok(numbers) => numbers,
            Err(e) => {
                error!(transaction_id = txn.id, error = %e, "seat lookup failed, notice skipped");
                return;
            }
        };

        let confirmation = PaymentConfirmation {
            payment_code: txn.payment_code.clone(),
            movie_title,
            seat_numbers,
            total_price: txn.total_price,
        };

        if let Err(e) = self
            .notifier
            .send_payment_confirmation(&recipient, &confirmation)
            .await
        {
            error!(payment_code = %txn.payment_code, error = %e, "confirmation notice failed");
        }
    }

    async fn seat_numbers(&self, transaction_id: i64) -> Result<Vec<String>, BookingError> {
        let tickets = self.store.tickets_for(transaction_id).await?;
        let seat_ids: Vec<i64> = tickets.iter().map(|t| t.seat_id).collect();
        let seats = self.store.seats_by_ids(&seat_ids).await?;
        let mut numbers: Vec<String> = seats.into_iter().map(|s| s.number).collect();
        numbers.sort();
        Ok(numbers)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;

use super::{
    BookingStore, NewReservation, Reservation, ReserveError, StoreError, TransactionWithSeats,
};
use crate::models::{Screening, Seat, Ticket, Transaction, TransactionStatus};

/// Production adapter. Checkout runs in one database transaction with row
/// locks on the candidate seats; transitions are single conditional UPDATEs
/// whose `rows_affected` decides the winner.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UNAVAILABLE_SEATS_SQL: &str = r#"
    SELECT DISTINCT t.seat_id
    FROM tickets t
    JOIN transactions x ON x.id = t.transaction_id
    WHERE x.screening_id = $1
      AND t.seat_id = ANY($2)
      AND (x.status = 'LUNAS' OR (x.status = 'PENDING' AND x.expires_at > $3))
    ORDER BY t.seat_id
"#;

const TRANSACTION_COLUMNS: &str = "id, owner_id, screening_id, total_price, status, \
     payment_method, payment_code, created_at, expires_at";

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn screening(&self, id: i64) -> Result<Option<Screening>, StoreError> {
        let screening = sqlx::query_as::<_, Screening>(
            "SELECT id, venue_id, movie_title, start_date, start_time
             FROM screenings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(screening)
    }

    async fn seats_by_ids(&self, ids: &[i64]) -> Result<Vec<Seat>, StoreError> {
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT id, venue_id, number, category FROM seats WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(seats)
    }

    async fn seats_for_venue(&self, venue_id: i64) -> Result<Vec<Seat>, StoreError> {
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT id, venue_id, number, category FROM seats WHERE venue_id = $1 ORDER BY id",
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(seats)
    }

    async fn unavailable_seats(
        &self,
        screening_id: i64,
        seat_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        let taken = sqlx::query_scalar::<_, i64>(UNAVAILABLE_SEATS_SQL)
            .bind(screening_id)
            .bind(seat_ids)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(taken)
    }

    async fn payment_code_in_use(&self, code: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE payment_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_reservation(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ReserveError> {
        let seat_ids: Vec<i64> = new.seats.iter().map(|s| s.seat_id).collect();

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // Lock the candidate seats in id order so concurrent checkouts for
        // overlapping seat sets serialize instead of deadlocking.
        sqlx::query("SELECT id FROM seats WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&seat_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        // The availability check must happen under the locks: a prior read
        // is stale the moment a concurrent writer commits.
        let taken = sqlx::query_scalar::<_, i64>(UNAVAILABLE_SEATS_SQL)
            .bind(new.screening_id)
            .bind(&seat_ids)
            .bind(now)
            .fetch_all(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        if !taken.is_empty() {
            tx.rollback().await.ok();
            return Err(ReserveError::SeatsTaken(taken));
        }

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions
                 (owner_id, screening_id, total_price, status, payment_method,
                  payment_code, created_at, expires_at)
             VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(new.owner_id)
        .bind(new.screening_id)
        .bind(new.total_price)
        .bind(new.payment_method)
        .bind(&new.payment_code)
        .bind(now)
        .bind(new.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        let mut tickets = Vec::with_capacity(new.seats.len());
        for claim in &new.seats {
            let ticket = sqlx::query_as::<_, Ticket>(
                "INSERT INTO tickets (transaction_id, seat_id, price)
                 VALUES ($1, $2, $3)
                 RETURNING id, transaction_id, seat_id, price",
            )
            .bind(transaction.id)
            .bind(claim.seat_id)
            .bind(claim.price)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            tickets.push(ticket);
        }

        tx.commit().await.map_err(StoreError::from)?;

        Ok(Reservation {
            transaction,
            tickets,
        })
    }

    async fn transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn transaction_by_code(&self, code: &str) -> Result<Option<Transaction>, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE payment_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn tickets_for(&self, transaction_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, transaction_id, seat_id, price
             FROM tickets WHERE transaction_id = $1 ORDER BY id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    async fn confirm_if_active(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'LUNAS'
             WHERE id = $1 AND status = 'PENDING' AND expires_at > $2",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel_if_pending(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'DIBATALKAN'
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_if_overdue(&self, id: i64, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'DIBATALKAN'
             WHERE id = $1 AND status = 'PENDING' AND expires_at <= $2",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expired_pending_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>, StoreError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM transactions
             WHERE status = 'PENDING' AND expires_at <= $1 ORDER BY id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn owner_email(&self, owner_id: i64) -> Result<Option<String>, StoreError> {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(email)
    }

    async fn transactions_for_owner(
        &self,
        owner_id: i64,
        status: Option<TransactionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionWithSeats>, StoreError> {
        let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE owner_id = $1");
        if status.is_some() {
            sql.push_str(" AND status = $4");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3");

        let mut query = sqlx::query_as::<_, Transaction>(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(offset);
        if let Some(status) = status {
            query = query.bind(status);
        }

        let transactions = query.fetch_all(&self.pool).await?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = transactions.iter().map(|t| t.id).collect();
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT t.transaction_id, s.number
             FROM tickets t
             JOIN seats s ON s.id = t.seat_id
             WHERE t.transaction_id = ANY($1)
             ORDER BY t.transaction_id, s.number",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut seats_by_transaction: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for (transaction_id, number) in rows {
            seats_by_transaction
                .entry(transaction_id)
                .or_default()
                .push(number);
        }

        Ok(transactions
            .into_iter()
            .map(|transaction| {
                let seat_numbers = seats_by_transaction
                    .remove(&transaction.id)
                    .unwrap_or_default();
                TransactionWithSeats {
                    transaction,
                    seat_numbers,
                }
            })
            .collect())
    }
}

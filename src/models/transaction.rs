use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a booking transaction. PENDING is the only non-terminal
/// state; LUNAS (paid) and DIBATALKAN (cancelled/expired) are never left
/// once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Lunas,
    Dibatalkan,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Whether `self -> to` is a legal transition. Only PENDING may move,
    /// and only into a terminal state.
    pub fn can_transition(self, to: TransactionStatus) -> bool {
        matches!(self, TransactionStatus::Pending) && to.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    BankTransfer,
    EWallet,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub owner_id: i64,
    pub screening_id: i64,
    pub total_price: i64,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
    pub payment_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// PENDING and still inside the payment window. Active transactions hold
    /// their seats; everything else has released them or sold them.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Pending && !self.is_expired(now)
    }
}

/// One seat bound to one transaction at the price in force at checkout.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub transaction_id: i64,
    pub seat_id: i64,
    pub price: i64,
}

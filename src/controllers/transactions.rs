use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::models::{PaymentMethod, TransactionStatus};
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transactions", get(my_transactions))
        .route("/transactions/checkout", post(checkout))
        .route("/transactions/confirm", post(confirm_payment))
        .route("/transactions/cancel", patch(cancel_transaction))
}

/* ---------- CHECKOUT ---------- */

// POST /api/transactions/checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub screening_id: i64,
    #[validate(length(min = 1, max = 10, message = "between 1 and 10 seats per transaction"))]
    pub seat_ids: Vec<i64>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub transaction_id: i64,
    pub payment_code: String,
    pub expires_at: DateTime<Utc>,
    pub total_price: i64,
    pub payment_method: PaymentMethod,
    pub ticket_ids: Vec<i64>,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()
        .map_err(|e| BookingError::InvalidInput(e.to_string()))?;

    let summary = state
        .checkout
        .checkout(user.id, req.screening_id, &req.seat_ids, req.payment_method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            transaction_id: summary.transaction_id,
            payment_code: summary.payment_code,
            expires_at: summary.expires_at,
            total_price: summary.total_price,
            payment_method: summary.payment_method,
            ticket_ids: summary.ticket_ids,
        }),
    ))
}

/* ---------- PAYMENT CONFIRMATION ---------- */

// POST /api/transactions/confirm
//
// No auth: the payment code itself is the shared secret handed to the
// external payment flow.
#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    payment_code: String,
}

async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let paid = state.payments.confirm(&req.payment_code).await?;

    let message = if paid {
        "payment confirmed"
    } else {
        "transaction already resolved or expired"
    };
    Ok((StatusCode::OK, Json(json!({ "paid": paid, "message": message }))))
}

/* ---------- CANCELLATION ---------- */

// PATCH /api/transactions/cancel
#[derive(Debug, Deserialize)]
struct CancelRequest {
    transaction_id: i64,
}

async fn cancel_transaction(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let message = state.payments.cancel(req.transaction_id, user.id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": message })),
    ))
}

/* ---------- HISTORY ---------- */

// GET /api/transactions
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    status: Option<TransactionStatus>,
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
struct TransactionResponse {
    id: i64,
    screening_id: i64,
    status: TransactionStatus,
    total_price: i64,
    payment_method: PaymentMethod,
    payment_code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    seats: Vec<String>,
}

async fn my_transactions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 50);
    let offset = ((page - 1) * page_size) as i64;

    let rows = state
        .store
        .transactions_for_owner(user.id, params.status, page_size as i64, offset)
        .await?;

    let payload: Vec<TransactionResponse> = rows
        .into_iter()
        .map(|row| TransactionResponse {
            id: row.transaction.id,
            screening_id: row.transaction.screening_id,
            status: row.transaction.status,
            total_price: row.transaction.total_price,
            payment_method: row.transaction.payment_method,
            payment_code: row.transaction.payment_code,
            created_at: row.transaction.created_at,
            expires_at: row.transaction.expires_at,
            seats: row.seat_numbers,
        })
        .collect();

    Ok((StatusCode::OK, Json(payload)))
}

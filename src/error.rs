//! Typed failures of the booking core. Handlers return these directly; the
//! `IntoResponse` impl decides the HTTP mapping so services stay transport
//! agnostic.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed request, rejected before touching shared state.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Lost the seat race or the seats were already claimed. Always names
    /// the conflicting seats so the caller can retry with a new selection.
    #[error("seats not available: {}", .conflicting.join(", "))]
    SeatUnavailable { conflicting: Vec<String> },

    #[error("{0}")]
    Forbidden(String),

    /// Transition attempted on an already-terminal transaction. An expected
    /// outcome under races, not a bug.
    #[error("{0}")]
    InvalidState(String),

    /// Operational alarm (payment-code generation exhausted its retries).
    #[error("{0}")]
    Fatal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidInput(_) => "INVALID_INPUT",
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::InvalidState(_) => "INVALID_STATE",
            BookingError::Fatal(_) => "FATAL",
            BookingError::Store(_) => "STORE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            BookingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::SeatUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::InvalidState(_) => StatusCode::CONFLICT,
            BookingError::Fatal(_) | BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats: Option<Vec<String>>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }

        let seats = match &self {
            BookingError::SeatUnavailable { conflicting } => Some(conflicting.clone()),
            _ => None,
        };

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
            seats,
        };

        (status, Json(body)).into_response()
    }
}

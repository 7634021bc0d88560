use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::BookingError;
use crate::models::SeatCategory;
use crate::pricing;
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/screenings/{id}/seats", get(screening_seats))
}

#[derive(Debug, Serialize)]
struct SeatView {
    id: i64,
    number: String,
    category: SeatCategory,
    price: i64,
    available: bool,
}

// GET /api/screenings/{id}/seats
//
// Advisory seat map for pickers; the authoritative availability check runs
// inside checkout itself.
async fn screening_seats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let screening = state
        .store
        .screening(id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", id))?;

    let seats = state.store.seats_for_venue(screening.venue_id).await?;
    let seat_ids: Vec<i64> = seats.iter().map(|s| s.id).collect();

    let unavailable: HashSet<i64> = state
        .store
        .unavailable_seats(id, &seat_ids, Utc::now())
        .await?
        .into_iter()
        .collect();

    let payload: Vec<SeatView> = seats
        .into_iter()
        .map(|seat| SeatView {
            available: !unavailable.contains(&seat.id),
            price: pricing::price(seat.category),
            id: seat.id,
            number: seat.number,
            category: seat.category,
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "screening_id": screening.id,
            "movie_title": screening.movie_title,
            "start_date": screening.start_date,
            "start_time": screening.start_time,
            "seats": payload,
        })),
    ))
}

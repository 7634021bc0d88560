//! Fixed price table per seat category. Prices are in rupiah and are locked
//! into the ticket at checkout time; later table changes never touch
//! existing transactions.

use crate::models::{Seat, SeatCategory};

pub fn price(category: SeatCategory) -> i64 {
    match category {
        SeatCategory::Reguler => 50_000,
        SeatCategory::Vip => 75_000,
        SeatCategory::Vvip => 100_000,
    }
}

pub fn total_price(seats: &[Seat]) -> i64 {
    seats.iter().map(|s| price(s.category)).sum()
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Screening {
    pub id: i64,
    pub venue_id: i64,
    pub movie_title: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
}

impl Screening {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }
}

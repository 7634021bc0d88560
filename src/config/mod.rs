use serde::Deserialize;
use std::env;

// Top-level configuration container, one section per concern.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Reservation tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// How long a PENDING transaction holds its seats.
    pub hold_minutes: i64,
    /// Expiry sweep cadence.
    pub sweep_interval_secs: u64,
    /// Owner cancellation closes this many minutes before the screening.
    pub cancel_grace_minutes: i64,
    pub max_seats_per_checkout: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            hold_minutes: 5,
            sweep_interval_secs: 60,
            cancel_grace_minutes: 30,
            max_seats_per_checkout: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            booking: BookingConfig {
                hold_minutes: env::var("BOOKING_HOLD_MINUTES")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("BOOKING_HOLD_MINUTES must be a valid number"),
                sweep_interval_secs: env::var("BOOKING_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("BOOKING_SWEEP_INTERVAL_SECS must be a valid number"),
                cancel_grace_minutes: env::var("BOOKING_CANCEL_GRACE_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("BOOKING_CANCEL_GRACE_MINUTES must be a valid number"),
                max_seats_per_checkout: env::var("BOOKING_MAX_SEATS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("BOOKING_MAX_SEATS must be a valid number"),
            },
        }
    }
}

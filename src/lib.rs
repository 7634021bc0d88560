pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pricing;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::services::checkout::CheckoutService;
use crate::services::notifier::{LogNotifier, PaymentNotifier};
use crate::services::payment::PaymentService;
use crate::store::postgres::PgBookingStore;
use crate::store::BookingStore;

// Shared state for the whole application.
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
    pub store: Arc<dyn BookingStore>,
    pub checkout: CheckoutService,
    pub payments: PaymentService,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Arc<Self>, anyhow::Error> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let store: Arc<dyn BookingStore> = Arc::new(PgBookingStore::new(db.pool.clone()));
        let notifier: Arc<dyn PaymentNotifier> = Arc::new(LogNotifier);
        let checkout = CheckoutService::new(store.clone(), config.booking.clone());
        let payments = PaymentService::new(store.clone(), notifier, config.booking.clone());

        Ok(Arc::new(Self {
            db,
            config,
            store,
            checkout,
            payments,
        }))
    }
}

pub mod checkout;
pub mod notifier;
pub mod payment;
pub mod sweeper;

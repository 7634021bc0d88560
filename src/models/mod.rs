pub mod user;
pub mod screening;
pub mod seat;
pub mod transaction;

pub use screening::Screening;
pub use seat::{Seat, SeatCategory};
pub use transaction::{PaymentMethod, Ticket, Transaction, TransactionStatus};
pub use user::User;

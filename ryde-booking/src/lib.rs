pub mod expiry;
pub mod ledger;
pub mod manager;
pub mod models;

pub use expiry::ExpiryTimers;
pub use ledger::{LedgerError, SeatLedger};
pub use manager::{CancelError, ConfirmError, HoldGrant, ReservationManager, ReserveError};
pub use models::{Booking, PaidStatus, Reservation, ReservationStatus};

pub mod models;
pub mod schedule;
pub mod repository;
pub mod manager;
pub mod accounts;
pub mod password;
pub mod memory;

pub use models::{Booking, BookingDetails, BookingStatus, Event, User};
pub use manager::{BookingError, BookingManager, BookingOutcome, CancellationPolicy};
pub use accounts::{AccountError, AccountService, Registration};
pub use repository::{Ledger, StoreError, StoreResult, StoreTransaction, UserRepository};
pub use memory::MemoryStore;

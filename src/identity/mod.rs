//! Transaction identity.
//!
//! # Data Flow
//! ```text
//! SystemTime::now()
//!     → + learned clock drift (optional)
//!     → max(candidate, last_issued + 1)
//!     → TransactionId { payer, seconds, nanos }
//! ```

pub mod clock;

pub use clock::{ClockError, TransactionIdGenerator};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt finished with a retryable code or transport fault:
//!     → retries.rs (RetryPolicy: is there budget left, how long to wait)
//!     → backoff.rs (linear or exponential schedule, capped)
//!     → deadline.rs (sleep, unless the call deadline or shutdown fires first)
//! ```
//!
//! # Design Decisions
//! - A retry budget of R allows R+1 attempts in total
//! - Transport faults and retryable codes draw from the same budget
//! - Every await inside a call goes through its `Deadline`

pub mod backoff;
pub mod deadline;
pub mod retries;

pub use deadline::{Deadline, Interrupted};
pub use retries::{BackoffStrategy, RetryPolicy};

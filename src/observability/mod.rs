//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! execution::engine / execution::finality
//!     → logging.rs (tracing events: transaction_id, attempt, code)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; hosts choose the exporter
//! - `init_logging` is opt-in and safe to call more than once
//! - Private key material never appears in events

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError};

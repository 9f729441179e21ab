//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Client::close(grace):
//!     Stop admitting calls → Wait for in-flight calls (≤ grace)
//!     → Shutdown::trigger (remaining calls end with Cancelled)
//!     → Transport::close
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop admission, drain, cancel, release
//! - Shutdown has a timeout: the grace period bounds the drain
//! - Use after close fails fast with a configuration error

pub mod shutdown;

pub use shutdown::Shutdown;

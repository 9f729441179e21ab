//! Execution subsystem: submit, await finality, validate.
//!
//! # Data Flow
//! ```text
//! Client operation
//!     → engine.rs (build → sign → send → classify → retry/backoff)
//!     → validator.rs::precheck (Accepted or PrecheckError)
//!     → finality.rs (poll receipt / record until terminal or poll budget spent)
//!     → validator.rs::consensus (Receipt/Record or ConsensusError)
//! ```
//!
//! # Design Decisions
//! - `ResponseCode::classify` is the single retry table for all three stages
//! - The engine never raises on a protocol code; only the validator does
//! - Delivery is at-least-once; the network deduplicates by transaction id

pub mod engine;
pub mod finality;
pub mod validator;

pub use engine::{Engine, IdSource, Outcome, Reply};
pub use finality::FinalityPoller;

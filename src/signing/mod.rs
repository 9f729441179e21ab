//! Signing engine.
//!
//! # Data Flow
//! ```text
//! TransactionBody
//!     → canonical_bytes() (serde_json, field order fixed by the struct)
//!     → Signatory (payer first, then each distinct sender)
//!     → SignedTransaction { body, signatures }
//! ```
//!
//! # Security Constraints
//! - Private keys never leave `Account`; only signatures are emitted
//! - Threshold coverage is not verified locally; the network decides

pub mod signatory;

pub use signatory::{sign_transaction, verify_signature, Signatory};

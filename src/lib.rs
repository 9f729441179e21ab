//! Client engine for a hashgraph distributed ledger.
//!
//! Builds, signs and submits transactions to a gateway node, retries them
//! under a bounded policy, polls for consensus outcomes and maps result codes
//! to typed errors.

pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod identity;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod signing;
pub mod transport;

pub use client::{AccountInfo, Client, CreateAccountParams, TransferParams};
pub use config::{ClientConfig, Context};
pub use error::{ClientError, Result};
pub use identity::TransactionIdGenerator;
pub use ledger::{Account, Address, Endorsement, Receipt, Record, ResponseCode, TransactionId};
pub use resilience::{BackoffStrategy, RetryPolicy};
pub use transport::{Gateway, HttpTransport, Transport, TransportError};

//! Transport boundary to gateway nodes.
//!
//! # Data Flow
//! ```text
//! execution::engine (signed request)
//!     → Transport::submit / Transport::query (one attempt, no retries)
//!     → http.rs (JSON over HTTP via reqwest) or any caller-supplied impl
//!     → TransactionResponse / QueryResponse
//! ```
//!
//! # Design Decisions
//! - A transport performs exactly one network exchange per call
//! - Connection pooling and TLS belong to the transport implementation
//! - Transport faults are reported as `TransportError`, never as codes

pub mod http;
pub mod wire;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::ledger::Address;
use wire::{Query, QueryResponse, SignedTransaction, TransactionResponse};

pub use http::HttpTransport;

/// A gateway node: where requests are sent and which account it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub url: Url,
    pub node: Address,
}

impl Gateway {
    pub fn new(url: Url, node: Address) -> Self {
        Self { url, node }
    }
}

/// Connection-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("node answered with HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("transport has been closed")]
    Closed,
}

/// One request/response exchange with a gateway node.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(
        &self,
        gateway: &Gateway,
        transaction: &SignedTransaction,
    ) -> Result<TransactionResponse, TransportError>;

    async fn query(&self, gateway: &Gateway, query: &Query) -> Result<QueryResponse, TransportError>;

    /// Release connections. Called once when the owning client closes.
    async fn close(&self) {}
}

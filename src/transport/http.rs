//! JSON-over-HTTP transport backed by reqwest.
//!
//! # Responsibilities
//! - POST signed transactions to `{gateway}/v1/transactions`
//! - POST queries to `{gateway}/v1/queries`
//! - Map connection, timeout and HTTP status failures to `TransportError`

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::transport::wire::{Query, QueryResponse, SignedTransaction, TransactionResponse};
use crate::transport::{Gateway, Transport, TransportError};

const TRANSACTIONS_PATH: &str = "v1/transactions";
const QUERIES_PATH: &str = "v1/queries";

/// Transport that speaks JSON to a gateway's HTTP endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Create a transport whose individual requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            closed: AtomicBool::new(false),
        })
    }

    async fn post<Req, Resp>(&self, gateway: &Gateway, path: &str, body: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let url = gateway
            .url
            .join(path)
            .map_err(|e| TransportError::Connect(format!("Invalid gateway URL '{}': {}", gateway.url, e)))?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(node = %gateway.node, status = %status, "Gateway returned non-success status");
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Connect(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        gateway: &Gateway,
        transaction: &SignedTransaction,
    ) -> Result<TransactionResponse, TransportError> {
        self.post(gateway, TRANSACTIONS_PATH, transaction).await
    }

    async fn query(&self, gateway: &Gateway, query: &Query) -> Result<QueryResponse, TransportError> {
        self.post(gateway, QUERIES_PATH, query).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("HTTP transport closed");
    }
}

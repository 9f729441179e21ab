//! Client error taxonomy.

use thiserror::Error;

use crate::ledger::{EndorsementError, KeyError, ResponseCode, TransactionId};
use crate::transport::TransportError;

/// Errors surfaced to callers of the client.
///
/// Every variant raised after a transaction id was minted carries it, so the
/// caller can re-query the outcome later.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing gateway or payer, or a closed client. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input. Raised before any I/O.
    #[error("invalid argument '{parameter}': {message}")]
    Argument {
        parameter: &'static str,
        message: String,
    },

    /// The node could not be reached within the retry budget.
    #[error("transport failed for transaction {transaction_id} after {attempts} attempts: {source}")]
    Transport {
        transaction_id: TransactionId,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The gateway node rejected the request before consensus.
    #[error("transaction {transaction_id} failed pre-check: {status}")]
    Precheck {
        status: ResponseCode,
        transaction_id: TransactionId,
    },

    /// Consensus reached a final failure status.
    #[error("transaction {transaction_id} failed with status: {status}")]
    Consensus {
        status: ResponseCode,
        transaction_id: TransactionId,
    },

    /// No final status was observed within the poll budget.
    ///
    /// The transaction may still succeed or fail; query it again by id.
    #[error("outcome of transaction {transaction_id} unknown after {polls} polls")]
    PollTimeout {
        transaction_id: TransactionId,
        polls: u32,
    },

    /// The call deadline elapsed or the client was closed mid-call.
    ///
    /// The request may already have been delivered and can still finalize.
    #[error("call for transaction {transaction_id} was cancelled; it may still reach consensus")]
    Cancelled { transaction_id: TransactionId },
}

impl ClientError {
    pub(crate) fn argument(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Argument {
            parameter,
            message: message.into(),
        }
    }

    /// Transaction id the error refers to, when one was minted.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            ClientError::Configuration(_) | ClientError::Argument { .. } => None,
            ClientError::Transport { transaction_id, .. }
            | ClientError::Precheck { transaction_id, .. }
            | ClientError::Consensus { transaction_id, .. }
            | ClientError::PollTimeout { transaction_id, .. }
            | ClientError::Cancelled { transaction_id } => Some(*transaction_id),
        }
    }

    /// Result code carried by precheck and consensus failures.
    pub fn status(&self) -> Option<ResponseCode> {
        match self {
            ClientError::Precheck { status, .. } | ClientError::Consensus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<EndorsementError> for ClientError {
    fn from(e: EndorsementError) -> Self {
        ClientError::argument("endorsement", e.to_string())
    }
}

impl From<KeyError> for ClientError {
    fn from(e: KeyError) -> Self {
        ClientError::argument("private_key", e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

//! Result codes returned by gateway nodes and consensus.
//!
//! The classification table in [`ResponseCode::classify`] is the only place
//! that decides whether a code is final, retryable or fatal. The execution
//! loop and the response validator both read it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a call a code was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Node-local validation before admission to consensus.
    Precheck,
    /// Finalized status read back from a receipt or record.
    Consensus,
}

/// What the caller should do with a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Proceed,
    Retry,
    Fail,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Proceed => "proceed",
            Disposition::Retry => "retry",
            Disposition::Fail => "fail",
        }
    }
}

/// Closed set of precheck and consensus outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    Success,
    /// Consensus has not yet decided the transaction.
    Unknown,
    Busy,
    PlatformTransactionNotCreated,
    PlatformNotActive,
    InvalidTransactionStart,
    TransactionExpired,
    InvalidTransactionDuration,
    ReceiptNotFound,
    RecordNotFound,
    InvalidTransaction,
    InvalidTransactionBody,
    InvalidTransactionId,
    TransactionOversize,
    DuplicateTransaction,
    InvalidNodeAccount,
    PayerAccountNotFound,
    InvalidAccountId,
    AccountDeleted,
    InvalidSignature,
    InvalidSignatureCountMismatchingKey,
    KeyRequired,
    BadEncoding,
    InsufficientTxFee,
    InsufficientPayerBalance,
    InsufficientAccountBalance,
    InvalidAccountAmounts,
    AccountRepeatedInAccountAmounts,
    InvalidInitialBalance,
    InvalidRenewalPeriod,
    MemoTooLong,
    /// Any code this client does not know about.
    #[serde(other)]
    Unrecognized,
}

impl ResponseCode {
    /// Classify a code observed in the given phase.
    pub fn classify(self, phase: Phase) -> Disposition {
        use ResponseCode::*;
        match phase {
            Phase::Precheck => match self {
                Ok | Success => Disposition::Proceed,
                Busy | PlatformTransactionNotCreated | PlatformNotActive | InvalidTransactionStart => {
                    Disposition::Retry
                }
                _ => Disposition::Fail,
            },
            Phase::Consensus => match self {
                Success => Disposition::Proceed,
                Unknown | Busy | PlatformNotActive | ReceiptNotFound | RecordNotFound => {
                    Disposition::Retry
                }
                _ => Disposition::Fail,
            },
        }
    }

    /// Precheck rejection caused by a start time outside the node's window.
    ///
    /// Retrying this code requires a freshly minted transaction id.
    pub fn is_stale_start(self) -> bool {
        matches!(self, ResponseCode::InvalidTransactionStart)
    }

    pub fn as_str(&self) -> &'static str {
        use ResponseCode::*;
        match self {
            Ok => "OK",
            Success => "SUCCESS",
            Unknown => "UNKNOWN",
            Busy => "BUSY",
            PlatformTransactionNotCreated => "PLATFORM_TRANSACTION_NOT_CREATED",
            PlatformNotActive => "PLATFORM_NOT_ACTIVE",
            InvalidTransactionStart => "INVALID_TRANSACTION_START",
            TransactionExpired => "TRANSACTION_EXPIRED",
            InvalidTransactionDuration => "INVALID_TRANSACTION_DURATION",
            ReceiptNotFound => "RECEIPT_NOT_FOUND",
            RecordNotFound => "RECORD_NOT_FOUND",
            InvalidTransaction => "INVALID_TRANSACTION",
            InvalidTransactionBody => "INVALID_TRANSACTION_BODY",
            InvalidTransactionId => "INVALID_TRANSACTION_ID",
            TransactionOversize => "TRANSACTION_OVERSIZE",
            DuplicateTransaction => "DUPLICATE_TRANSACTION",
            InvalidNodeAccount => "INVALID_NODE_ACCOUNT",
            PayerAccountNotFound => "PAYER_ACCOUNT_NOT_FOUND",
            InvalidAccountId => "INVALID_ACCOUNT_ID",
            AccountDeleted => "ACCOUNT_DELETED",
            InvalidSignature => "INVALID_SIGNATURE",
            InvalidSignatureCountMismatchingKey => "INVALID_SIGNATURE_COUNT_MISMATCHING_KEY",
            KeyRequired => "KEY_REQUIRED",
            BadEncoding => "BAD_ENCODING",
            InsufficientTxFee => "INSUFFICIENT_TX_FEE",
            InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            AccountRepeatedInAccountAmounts => "ACCOUNT_REPEATED_IN_ACCOUNT_AMOUNTS",
            InvalidInitialBalance => "INVALID_INITIAL_BALANCE",
            InvalidRenewalPeriod => "INVALID_RENEWAL_PERIOD",
            MemoTooLong => "MEMO_TOO_LONG",
            Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

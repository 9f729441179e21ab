//! Final interpretation of response codes.
//!
//! Shares `ResponseCode::classify` with the engine, so a code that the
//! engine retried can only reach here once the budget is spent, and is then
//! reported as a failure of its phase.

use crate::error::{ClientError, Result};
use crate::ledger::{Disposition, Phase, Receipt, Record, ResponseCode, TransactionId};

/// Accept a precheck code or fail with `ClientError::Precheck`.
pub fn precheck(transaction_id: TransactionId, code: ResponseCode) -> Result<()> {
    match code.classify(Phase::Precheck) {
        Disposition::Proceed => Ok(()),
        Disposition::Retry | Disposition::Fail => Err(ClientError::Precheck {
            status: code,
            transaction_id,
        }),
    }
}

/// Accept a consensus status or fail with `ClientError::Consensus`.
pub fn consensus(transaction_id: TransactionId, status: ResponseCode) -> Result<()> {
    match status.classify(Phase::Consensus) {
        Disposition::Proceed => Ok(()),
        Disposition::Retry | Disposition::Fail => Err(ClientError::Consensus {
            status,
            transaction_id,
        }),
    }
}

pub fn receipt(receipt: Receipt) -> Result<Receipt> {
    consensus(receipt.transaction_id, receipt.status)?;
    Ok(receipt)
}

pub fn record(record: Record) -> Result<Record> {
    consensus(record.transaction_id, record.status)?;
    Ok(record)
}

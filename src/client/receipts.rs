//! Outcome lookups for previously issued transaction ids.
//!
//! A call that ended in `Cancelled`, `PollTimeout` or a transport error may
//! still have reached consensus; these re-query it by id.

use crate::client::Client;
use crate::error::Result;
use crate::execution::validator;
use crate::ledger::{Receipt, Record, TransactionId};

impl Client {
    /// Poll for the receipt of `transaction_id` and validate its status.
    pub async fn get_receipt(&self, transaction_id: TransactionId) -> Result<Receipt> {
        let mut call = self.admit()?;
        let receipt = self.await_receipt_in(&mut call, transaction_id).await?;
        validator::receipt(receipt)
    }

    /// Poll for the record of `transaction_id` and validate its status.
    ///
    /// Each poll pays for itself from the configured payer.
    pub async fn get_transaction_record(&self, transaction_id: TransactionId) -> Result<Record> {
        let mut call = self.admit()?;
        let record = self.await_record_in(&mut call, transaction_id).await?;
        validator::record(record)
    }
}

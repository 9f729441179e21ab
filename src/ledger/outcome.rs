//! Finalized transaction outcomes.
//!
//! Receipts and records are produced by the network and only read here.

use serde::{Deserialize, Serialize};

use crate::ledger::address::Address;
use crate::ledger::response_code::ResponseCode;
use crate::ledger::transaction_id::TransactionId;

/// Minimal finalized outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub status: ResponseCode,
    /// Entity created by the transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// A single signed balance movement inside a transfer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub address: Address,
    pub amount: i64,
}

/// Detailed finalized outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub transaction_id: TransactionId,
    pub status: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Transfers in the order the network reported them.
    #[serde(default)]
    pub transfers: Vec<AccountAmount>,
    /// Fee charged, in tinybars.
    pub fee: u64,
    #[serde(default)]
    pub memo: String,
}

impl Record {
    /// Net amount moved for `address` across the transfer list.
    pub fn net_transfer(&self, address: &Address) -> i64 {
        self.transfers
            .iter()
            .filter(|t| &t.address == address)
            .map(|t| t.amount)
            .sum()
    }

    /// The receipt subset of this record.
    pub fn receipt(&self) -> Receipt {
        Receipt {
            transaction_id: self.transaction_id,
            status: self.status,
            address: self.address,
        }
    }
}

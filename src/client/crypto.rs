//! Account creation, transfers and account queries.

use std::time::Duration;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::ledger::{Account, AccountAmount, Address, Endorsement, Receipt, Record};
use crate::transport::wire::{Query, QueryAnswer, TransactionData, WireKey};

/// Default auto-renew period of new accounts (about three months).
pub const DEFAULT_AUTO_RENEW_PERIOD: Duration = Duration::from_secs(7_890_000);

/// Parameters of a new account.
#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    /// Raw 32-byte Ed25519 public key. Ignored when `endorsement` is set.
    pub public_key: Vec<u8>,
    /// Tinybars moved from the payer into the new account.
    pub initial_balance: u64,
    pub auto_renew_period: Duration,
    /// Full key structure for the account, e.g. a threshold of keys.
    pub endorsement: Option<Endorsement>,
}

impl Default for CreateAccountParams {
    fn default() -> Self {
        Self {
            public_key: Vec::new(),
            initial_balance: 0,
            auto_renew_period: DEFAULT_AUTO_RENEW_PERIOD,
            endorsement: None,
        }
    }
}

/// A multi-party transfer. Every sending account signs.
#[derive(Debug, Clone, Default)]
pub struct TransferParams {
    pub sends: Vec<(Account, i64)>,
    pub receives: Vec<(Address, i64)>,
}

/// Account details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: Address,
    /// Balance in tinybars.
    pub balance: u64,
    pub endorsement: Endorsement,
    pub deleted: bool,
}

impl Client {
    /// Create an account; the receipt carries its address.
    pub async fn create_account(&self, params: CreateAccountParams) -> Result<Receipt> {
        let endorsement = match params.endorsement {
            Some(endorsement) => endorsement,
            None => Endorsement::from_public_key_bytes(&params.public_key)
                .map_err(|e| ClientError::argument("public_key", e.to_string()))?,
        };
        if params.auto_renew_period.is_zero() {
            return Err(ClientError::argument(
                "auto_renew_period",
                "The auto renew period must be greater than zero.",
            ));
        }

        let data = TransactionData::CryptoCreateAccount {
            key: WireKey::from(&endorsement),
            initial_balance: params.initial_balance,
            auto_renew_period_secs: params.auto_renew_period.as_secs(),
        };
        self.execute_for_receipt("create_account", data, &[]).await
    }

    /// Balance of `address` in tinybars.
    pub async fn get_account_balance(&self, address: Address) -> Result<u64> {
        self.paid_query(
            "balance_query",
            |header| Query::AccountBalance { header, address },
            |answer| match answer {
                QueryAnswer::AccountBalance { balance } => Some(balance),
                _ => None,
            },
        )
        .await
    }

    pub async fn get_account_info(&self, address: Address) -> Result<AccountInfo> {
        self.paid_query(
            "account_info_query",
            |header| Query::AccountInfo { header, address },
            |answer| match answer {
                QueryAnswer::AccountInfo(info) => {
                    let endorsement = Endorsement::try_from(&info.key).ok()?;
                    Some(AccountInfo {
                        address: info.address,
                        balance: info.balance,
                        endorsement,
                        deleted: info.deleted,
                    })
                }
                _ => None,
            },
        )
        .await
    }

    /// Move `amount` tinybars from `from` to `to`.
    pub async fn transfer(&self, from: &Account, to: Address, amount: i64) -> Result<Receipt> {
        let transfers = single_transfer(from, to, amount)?;
        self.execute_for_receipt("transfer", TransactionData::CryptoTransfer { transfers }, &[from])
            .await
    }

    pub async fn transfer_with_record(&self, from: &Account, to: Address, amount: i64) -> Result<Record> {
        let transfers = single_transfer(from, to, amount)?;
        self.execute_for_record("transfer", TransactionData::CryptoTransfer { transfers }, &[from])
            .await
    }

    /// Transfer between several senders and receivers.
    pub async fn multi_transfer(&self, params: &TransferParams) -> Result<Receipt> {
        let transfers = transfer_list(params)?;
        let senders: Vec<&Account> = params.sends.iter().map(|(account, _)| account).collect();
        self.execute_for_receipt("multi_transfer", TransactionData::CryptoTransfer { transfers }, &senders)
            .await
    }

    pub async fn multi_transfer_with_record(&self, params: &TransferParams) -> Result<Record> {
        let transfers = transfer_list(params)?;
        let senders: Vec<&Account> = params.sends.iter().map(|(account, _)| account).collect();
        self.execute_for_record("multi_transfer", TransactionData::CryptoTransfer { transfers }, &senders)
            .await
    }
}

fn single_transfer(from: &Account, to: Address, amount: i64) -> Result<Vec<AccountAmount>> {
    if amount <= 0 {
        return Err(ClientError::argument(
            "amount",
            "The amount to transfer must be greater than zero.",
        ));
    }
    Ok(vec![
        AccountAmount {
            address: from.address(),
            amount: -amount,
        },
        AccountAmount {
            address: to,
            amount,
        },
    ])
}

/// Validate a multi-party transfer and net it into one entry per address.
///
/// Entries keep the order in which their address first appears, sends
/// before receives. An address that nets to zero keeps a zero entry.
fn transfer_list(params: &TransferParams) -> Result<Vec<AccountAmount>> {
    if params.sends.is_empty() {
        return Err(ClientError::argument(
            "sends",
            "There must be at least one send account to transfer money from.",
        ));
    }
    if params.receives.is_empty() {
        return Err(ClientError::argument(
            "receives",
            "There must be at least one receiving account to transfer money to.",
        ));
    }
    if params.sends.iter().any(|(_, amount)| *amount <= 0) {
        return Err(ClientError::argument("sends", "All amount entries must be positive values"));
    }
    if params.receives.iter().any(|(_, amount)| *amount <= 0) {
        return Err(ClientError::argument("receives", "All amount entries must be positive values"));
    }

    let overflow = || ClientError::argument("sends", "The transfer amounts overflow.");
    let total_sent = params
        .sends
        .iter()
        .try_fold(0i64, |sum, (_, amount)| sum.checked_add(*amount))
        .ok_or_else(overflow)?;
    let total_received = params
        .receives
        .iter()
        .try_fold(0i64, |sum, (_, amount)| sum.checked_add(*amount))
        .ok_or_else(overflow)?;
    if total_sent != total_received {
        return Err(ClientError::argument(
            "sends",
            "The sum of sends and receives does not balance.",
        ));
    }

    let movements = params
        .sends
        .iter()
        .map(|(account, amount)| (account.address(), -amount))
        .chain(params.receives.iter().copied());

    let mut transfers: Vec<AccountAmount> = Vec::new();
    for (address, amount) in movements {
        match transfers.iter_mut().find(|t| t.address == address) {
            // Bounded by the totals checked above.
            Some(entry) => entry.amount += amount,
            None => transfers.push(AccountAmount { address, amount }),
        }
    }
    Ok(transfers)
}

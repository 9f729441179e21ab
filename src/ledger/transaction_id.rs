//! Transaction identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ledger::address::{Address, ParseAddressError};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Payer address plus valid-start timestamp.
///
/// The network deduplicates submissions by this value, which is what makes
/// resubmitting an identical signed request safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    pub payer: Address,
    pub valid_start_seconds: i64,
    pub valid_start_nanos: i32,
}

impl TransactionId {
    /// Build from a total nanoseconds-since-epoch value.
    pub fn from_epoch_nanos(payer: Address, nanos: i64) -> Self {
        Self {
            payer,
            valid_start_seconds: nanos.div_euclid(NANOS_PER_SECOND),
            valid_start_nanos: nanos.rem_euclid(NANOS_PER_SECOND) as i32,
        }
    }

    /// Valid start expressed as nanoseconds since the epoch.
    pub fn epoch_nanos(&self) -> i64 {
        self.valid_start_seconds * NANOS_PER_SECOND + self.valid_start_nanos as i64
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.payer, self.valid_start_seconds, self.valid_start_nanos
        )
    }
}

/// Error returned when a transaction id string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTransactionIdError {
    #[error(transparent)]
    Address(#[from] ParseAddressError),

    #[error("invalid transaction id '{0}': expected realm.shard.num@seconds.nanos")]
    Format(String),
}

impl FromStr for TransactionId {
    type Err = ParseTransactionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseTransactionIdError::Format(s.to_string());
        let (payer, start) = s.split_once('@').ok_or_else(malformed)?;
        let (seconds, nanos) = start.split_once('.').ok_or_else(malformed)?;
        let valid_start_seconds = seconds.parse::<i64>().map_err(|_| malformed())?;
        let valid_start_nanos = nanos.parse::<i32>().map_err(|_| malformed())?;
        if !(0..NANOS_PER_SECOND as i32).contains(&valid_start_nanos) {
            return Err(malformed());
        }
        Ok(Self {
            payer: payer.parse()?,
            valid_start_seconds,
            valid_start_nanos,
        })
    }
}

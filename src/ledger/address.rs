//! Network entity addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies an account, file or contract on the network.
///
/// Equality and ordering follow the `(realm, shard, num)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub realm: u64,
    pub shard: u64,
    pub num: u64,
}

impl Address {
    pub const fn new(realm: u64, shard: u64, num: u64) -> Self {
        Self { realm, shard, num }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.realm, self.shard, self.num)
    }
}

/// Error returned when an address string is not `realm.shard.num`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{0}': expected realm.shard.num")]
pub struct ParseAddressError(pub String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| ParseAddressError(s.to_string()))
        };
        let address = Address::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(ParseAddressError(s.to_string()));
        }
        Ok(address)
    }
}

//! Accounts that can sign on behalf of an address.
//!
//! # Security
//! - Signing keys are never logged or serialized
//! - `Debug` output carries the address and key count only

use ed25519_dalek::{SigningKey, VerifyingKey};
use std::fmt;
use thiserror::Error;

use crate::ledger::address::Address;
use crate::ledger::endorsement::Endorsement;

/// Errors raised when importing private key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid private key encoding: expected 32 hex-encoded bytes")]
    InvalidEncoding,
}

/// Decode a hex-encoded 32-byte Ed25519 seed (with or without `0x`).
pub fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey, KeyError> {
    let key_hex = private_key_hex.trim();
    let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
    let bytes = hex::decode(key_hex).map_err(|_| KeyError::InvalidEncoding)?;
    let seed: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidEncoding)?;
    Ok(SigningKey::from_bytes(&seed))
}

/// An address together with the private keys the caller holds for it.
///
/// When the address's endorsement is known, only keys that appear in it sign.
#[derive(Clone)]
pub struct Account {
    address: Address,
    keys: Vec<SigningKey>,
    endorsement: Option<Endorsement>,
}

impl Account {
    pub fn new(address: Address, keys: Vec<SigningKey>) -> Self {
        Self {
            address,
            keys,
            endorsement: None,
        }
    }

    /// Attach the endorsement the ledger holds for this address, e.g. from
    /// `Client::get_account_info`.
    pub fn with_endorsement(mut self, endorsement: Endorsement) -> Self {
        self.endorsement = Some(endorsement);
        self
    }

    pub fn endorsement(&self) -> Option<&Endorsement> {
        self.endorsement.as_ref()
    }

    /// Account signing with one key.
    pub fn with_key(address: Address, key: SigningKey) -> Self {
        Self::new(address, vec![key])
    }

    /// Account signing with one hex-encoded key.
    pub fn from_private_key(address: Address, private_key_hex: &str) -> Result<Self, KeyError> {
        Ok(Self::with_key(address, signing_key_from_hex(private_key_hex)?))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    pub fn public_keys(&self) -> Vec<VerifyingKey> {
        self.keys.iter().map(SigningKey::verifying_key).collect()
    }
}

impl From<&Account> for Address {
    fn from(account: &Account) -> Self {
        account.address
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("keys", &self.keys.len())
            .field("endorsement", &self.endorsement.is_some())
            .finish()
    }
}

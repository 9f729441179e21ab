//! Signature assembly over canonical transaction bytes.
//!
//! The signatory signs with every supplied key that is relevant and never
//! tries to pick a minimal covering set. Extra signatures are tolerated by
//! the network; missing ones are reported by it at submission time.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{ClientError, Result};
use crate::ledger::{Account, Endorsement};
use crate::transport::wire::{SignaturePair, SignedTransaction, TransactionBody};

/// Accumulates signatures, one per distinct public key, in insertion order.
#[derive(Debug, Default)]
pub struct Signatory {
    pairs: Vec<SignaturePair>,
    signed: Vec<VerifyingKey>,
}

impl Signatory {
    pub fn new() -> Self {
        Self::default()
    }

    fn sign_key(&mut self, bytes: &[u8], key: &SigningKey) {
        let public = key.verifying_key();
        if self.signed.contains(&public) {
            return;
        }
        let signature = key.sign(bytes);
        self.pairs.push(SignaturePair {
            public_key: hex::encode(public.as_bytes()),
            signature: hex::encode(signature.to_bytes()),
        });
        self.signed.push(public);
    }

    /// Sign with every key the account holds.
    pub fn sign_account(&mut self, bytes: &[u8], account: &Account) -> &mut Self {
        for key in account.keys() {
            self.sign_key(bytes, key);
        }
        self
    }

    /// Walk `endorsement` and sign for each leaf whose private key is in `keys`.
    pub fn sign_endorsement(&mut self, bytes: &[u8], endorsement: &Endorsement, keys: &[SigningKey]) -> &mut Self {
        for leaf in endorsement.public_keys() {
            if let Some(key) = keys.iter().find(|k| k.verifying_key() == leaf) {
                self.sign_key(bytes, key);
            }
        }
        self
    }

    /// Public keys signed so far, in signature order.
    pub fn signed_keys(&self) -> &[VerifyingKey] {
        &self.signed
    }

    pub fn finish(self) -> Vec<SignaturePair> {
        self.pairs
    }
}

/// Sign `body` on behalf of every signer.
///
/// A signer with a known endorsement signs with the keys found in it; any
/// other signer signs with every key it holds. Signers contribute in the
/// order given; a signer repeated later in the list adds nothing, so the
/// payer can also appear among the senders.
pub fn sign_transaction(body: TransactionBody, signers: &[&Account]) -> Result<SignedTransaction> {
    let bytes = body
        .canonical_bytes()
        .map_err(|e| ClientError::argument("transaction", format!("unable to encode body: {}", e)))?;
    let mut signatory = Signatory::new();
    for signer in signers {
        match signer.endorsement() {
            Some(endorsement) => signatory.sign_endorsement(&bytes, endorsement, signer.keys()),
            None => signatory.sign_account(&bytes, signer),
        };
    }
    Ok(SignedTransaction {
        body,
        signatures: signatory.finish(),
    })
}

/// Check one signature pair against `bytes`.
pub fn verify_signature(bytes: &[u8], pair: &SignaturePair) -> bool {
    let Ok(public) = hex::decode(&pair.public_key) else {
        return false;
    };
    let Ok(public) = <[u8; 32]>::try_from(public.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&public) else {
        return false;
    };
    let Ok(signature) = hex::decode(&pair.signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature) else {
        return false;
    };
    key.verify(bytes, &signature).is_ok()
}

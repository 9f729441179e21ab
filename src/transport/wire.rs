//! Wire message shapes exchanged with gateway nodes.
//!
//! These mirror the network's message contract. The client only reads and
//! writes the fields listed here; everything is JSON on the wire.

use serde::{Deserialize, Serialize};

use crate::ledger::{
    AccountAmount, Address, Endorsement, EndorsementError, EndorsementNode, Receipt, Record,
    ResponseCode, TransactionId,
};

/// Body of a transaction; its serialized form is what gets signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node_account: Address,
    /// Maximum fee the payer will pay, in tinybars.
    pub transaction_fee: u64,
    pub valid_duration_secs: u64,
    #[serde(default)]
    pub memo: String,
    pub data: TransactionData,
}

impl TransactionBody {
    /// Deterministic byte encoding covered by every signature.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Domain-specific part of a transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionData {
    CryptoTransfer {
        transfers: Vec<AccountAmount>,
    },
    CryptoCreateAccount {
        key: WireKey,
        initial_balance: u64,
        auto_renew_period_secs: u64,
    },
}

/// Recursive key structure as the network encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKey {
    /// Hex-encoded 32-byte public key.
    Ed25519(String),
    Threshold { threshold: u32, keys: Vec<WireKey> },
    Entity(Address),
}

impl From<&Endorsement> for WireKey {
    fn from(endorsement: &Endorsement) -> Self {
        fn encode(endorsement: &Endorsement, index: crate::ledger::NodeIndex) -> WireKey {
            match endorsement.at(index) {
                EndorsementNode::Key(key) => WireKey::Ed25519(hex::encode(key.as_bytes())),
                EndorsementNode::Threshold { required, children } => WireKey::Threshold {
                    threshold: *required,
                    keys: children.iter().map(|c| encode(endorsement, *c)).collect(),
                },
                EndorsementNode::Entity(address) => WireKey::Entity(*address),
            }
        }
        encode(endorsement, endorsement.root())
    }
}

impl TryFrom<&WireKey> for Endorsement {
    type Error = EndorsementError;

    fn try_from(key: &WireKey) -> Result<Self, Self::Error> {
        match key {
            WireKey::Ed25519(hex_key) => {
                let bytes = hex::decode(hex_key).map_err(|_| EndorsementError::InvalidPublicKey)?;
                Endorsement::from_public_key_bytes(&bytes)
            }
            WireKey::Threshold { threshold, keys } => {
                let children = keys
                    .iter()
                    .map(Endorsement::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Endorsement::threshold(*threshold, children)
            }
            WireKey::Entity(address) => Ok(Endorsement::entity(*address)),
        }
    }
}

/// One signature over a body's canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Hex-encoded 64-byte Ed25519 signature.
    pub signature: String,
}

/// A body together with its signatures, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub signatures: Vec<SignaturePair>,
}

impl SignedTransaction {
    pub fn transaction_id(&self) -> TransactionId {
        self.body.transaction_id
    }
}

/// Gateway answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub precheck_code: ResponseCode,
    /// Node wall clock at the time of the answer, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_time_nanos: Option<i64>,
}

/// Header of paid queries: a signed fee transfer to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QueryHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<SignedTransaction>,
}

/// Read-only request to a gateway node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    AccountBalance { header: QueryHeader, address: Address },
    AccountInfo { header: QueryHeader, address: Address },
    TransactionReceipt { transaction_id: TransactionId },
    TransactionRecord { header: QueryHeader, transaction_id: TransactionId },
}

/// Gateway answer to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub precheck_code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<QueryAnswer>,
}

/// Typed payload of a successful query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryAnswer {
    AccountBalance { balance: u64 },
    AccountInfo(AccountInfoAnswer),
    Receipt(Receipt),
    Record(Record),
}

/// Account details as returned by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfoAnswer {
    pub address: Address,
    pub balance: u64,
    pub key: WireKey,
    #[serde(default)]
    pub deleted: bool,
}

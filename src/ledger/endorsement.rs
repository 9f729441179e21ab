//! Signing requirements attached to accounts, files and contracts.
//!
//! An [`Endorsement`] is a tree of key leaves, entity references and
//! threshold nodes. The tree is stored in a flat arena: every child index
//! points at an earlier slot and the root is the last slot, so a built
//! endorsement can never contain a cycle.

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

use crate::ledger::address::Address;

/// Position of a node inside an endorsement arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

/// A single node of an endorsement tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndorsementNode {
    /// Satisfied by a signature from this Ed25519 key.
    Key(VerifyingKey),
    /// Satisfied when at least `required` children are satisfied.
    Threshold { required: u32, children: Vec<NodeIndex> },
    /// Satisfied by the network on behalf of an entity (e.g. a contract).
    Entity(Address),
}

/// Errors raised while building an endorsement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndorsementError {
    #[error("at least one endorsement in a list is required")]
    Empty,

    #[error("required count {required} exceeds the {available} endorsements provided")]
    RequiredExceedsChildren { required: u32, available: usize },

    #[error("invalid Ed25519 public key")]
    InvalidPublicKey,
}

/// Immutable authorization requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endorsement {
    nodes: Vec<EndorsementNode>,
}

impl Endorsement {
    /// Requirement satisfied by a single key.
    pub fn key(key: VerifyingKey) -> Self {
        Self {
            nodes: vec![EndorsementNode::Key(key)],
        }
    }

    /// Requirement satisfied by a single key given as raw 32 bytes.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<Self, EndorsementError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EndorsementError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| EndorsementError::InvalidPublicKey)?;
        Ok(Self::key(key))
    }

    /// Requirement delegated to another network entity.
    pub fn entity(address: Address) -> Self {
        Self {
            nodes: vec![EndorsementNode::Entity(address)],
        }
    }

    /// Requirement satisfied when `required` of `children` are satisfied.
    pub fn threshold(
        required: u32,
        children: impl IntoIterator<Item = Endorsement>,
    ) -> Result<Self, EndorsementError> {
        let children: Vec<Endorsement> = children.into_iter().collect();
        if children.is_empty() {
            return Err(EndorsementError::Empty);
        }
        if required as usize > children.len() {
            return Err(EndorsementError::RequiredExceedsChildren {
                required,
                available: children.len(),
            });
        }

        let mut nodes = Vec::with_capacity(children.iter().map(|c| c.nodes.len()).sum::<usize>() + 1);
        let mut roots = Vec::with_capacity(children.len());
        for child in children {
            let offset = nodes.len();
            let child_root = offset + child.nodes.len() - 1;
            nodes.extend(child.nodes.into_iter().map(|node| match node {
                EndorsementNode::Threshold { required, children } => EndorsementNode::Threshold {
                    required,
                    children: children.into_iter().map(|i| NodeIndex(i.0 + offset)).collect(),
                },
                other => other,
            }));
            roots.push(NodeIndex(child_root));
        }
        nodes.push(EndorsementNode::Threshold {
            required,
            children: roots,
        });
        Ok(Self { nodes })
    }

    /// Requirement satisfied only when every child is satisfied.
    pub fn all_of(children: impl IntoIterator<Item = Endorsement>) -> Result<Self, EndorsementError> {
        let children: Vec<Endorsement> = children.into_iter().collect();
        let required = children.len() as u32;
        Self::threshold(required, children)
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex(self.nodes.len() - 1)
    }

    /// Node at `index`, or `None` when the index belongs to another tree.
    pub fn node(&self, index: NodeIndex) -> Option<&EndorsementNode> {
        self.nodes.get(index.0)
    }

    /// Indices reached from this tree's own root are always in bounds.
    pub(crate) fn at(&self, index: NodeIndex) -> &EndorsementNode {
        &self.nodes[index.0]
    }

    /// Distinct leaf keys in depth-first, left-to-right order.
    pub fn public_keys(&self) -> Vec<VerifyingKey> {
        let mut keys = Vec::new();
        self.collect_keys(self.root(), &mut keys);
        keys
    }

    fn collect_keys(&self, index: NodeIndex, keys: &mut Vec<VerifyingKey>) {
        match self.at(index) {
            EndorsementNode::Key(key) => {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
            EndorsementNode::Threshold { children, .. } => {
                for child in children {
                    self.collect_keys(*child, keys);
                }
            }
            EndorsementNode::Entity(_) => {}
        }
    }

    /// True if `key` appears as any leaf of the tree.
    pub fn contains_key(&self, key: &VerifyingKey) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, EndorsementNode::Key(k) if k == key))
    }

    /// Local check of whether signatures from `keys` would meet the tree.
    ///
    /// Entity leaves can only be satisfied by the network and count as
    /// unsatisfied here. Submission never calls this.
    pub fn is_satisfied_by(&self, keys: &[VerifyingKey]) -> bool {
        self.satisfied(self.root(), keys)
    }

    fn satisfied(&self, index: NodeIndex, keys: &[VerifyingKey]) -> bool {
        match self.at(index) {
            EndorsementNode::Key(key) => keys.contains(key),
            EndorsementNode::Threshold { required, children } => {
                let met = children.iter().filter(|c| self.satisfied(**c, keys)).count();
                met >= *required as usize
            }
            EndorsementNode::Entity(_) => false,
        }
    }
}

impl From<VerifyingKey> for Endorsement {
    fn from(key: VerifyingKey) -> Self {
        Self::key(key)
    }
}

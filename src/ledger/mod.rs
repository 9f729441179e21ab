//! Ledger value types.
//!
//! # Data Flow
//! ```text
//! Caller constructs:
//!     → Address / Account / Endorsement
//! Client mints:
//!     → TransactionId (identity::clock)
//! Network returns:
//!     → ResponseCode (precheck) → Receipt / Record (consensus)
//! ```
//!
//! All types here are immutable values; nothing in this module performs I/O.

pub mod account;
pub mod address;
pub mod endorsement;
pub mod outcome;
pub mod response_code;
pub mod transaction_id;

pub use account::{Account, KeyError};
pub use address::Address;
pub use endorsement::{Endorsement, EndorsementError, EndorsementNode, NodeIndex};
pub use outcome::{AccountAmount, Receipt, Record};
pub use response_code::{Disposition, Phase, ResponseCode};
pub use transaction_id::TransactionId;

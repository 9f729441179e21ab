//! Strictly increasing valid-start timestamps.
//!
//! # Invariants
//! - Every value issued by one generator is strictly greater than the last
//! - The last-issued value and the learned drift are only touched under
//!   the generator's lock, so concurrent callers never see a duplicate

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::error::ClientError;
use crate::ledger::{Address, TransactionId};

/// Fatal clock misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("system clock is set before the Unix epoch")]
    BeforeEpoch,
}

impl From<ClockError> for ClientError {
    fn from(e: ClockError) -> Self {
        ClientError::Configuration(e.to_string())
    }
}

#[derive(Debug, Default)]
struct ClockState {
    last_issued: i64,
    drift_nanos: i64,
}

/// Mints transaction ids for any payer.
#[derive(Debug, Default)]
pub struct TransactionIdGenerator {
    state: Mutex<ClockState>,
}

static PROCESS_GENERATOR: OnceLock<Arc<TransactionIdGenerator>> = OnceLock::new();

fn local_nanos() -> Result<i64, ClockError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| ClockError::BeforeEpoch)?;
    Ok(elapsed.as_nanos() as i64)
}

impl TransactionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator shared by every client in this process.
    pub fn process() -> Arc<TransactionIdGenerator> {
        PROCESS_GENERATOR
            .get_or_init(|| Arc::new(TransactionIdGenerator::new()))
            .clone()
    }

    /// Next unique nanoseconds-since-epoch value.
    pub fn unique_nanos(&self, adjust_for_drift: bool) -> Result<i64, ClockError> {
        let now = local_nanos()?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let candidate = if adjust_for_drift {
            now.saturating_add(state.drift_nanos)
        } else {
            now
        };
        let issued = if candidate > state.last_issued {
            candidate
        } else {
            state.last_issued + 1
        };
        state.last_issued = issued;
        Ok(issued)
    }

    /// Mint a fresh id for `payer`.
    pub fn next_id(&self, payer: Address, adjust_for_drift: bool) -> Result<TransactionId, ClockError> {
        let nanos = self.unique_nanos(adjust_for_drift)?;
        Ok(TransactionId::from_epoch_nanos(payer, nanos))
    }

    /// Record a node's reported wall clock and learn the offset from ours.
    pub fn observe_node_time(&self, node_nanos: i64) -> Result<(), ClockError> {
        let now = local_nanos()?;
        let drift = node_nanos.saturating_sub(now);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.drift_nanos != drift {
            tracing::debug!(drift_nanos = drift, "Updated clock drift from node time");
        }
        state.drift_nanos = drift;
        Ok(())
    }

    /// Currently learned offset (node minus local) in nanoseconds.
    pub fn clock_drift_nanos(&self) -> i64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).drift_nanos
    }
}

//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration of a client. All types
//! derive Serde traits for deserialization from TOML files. Private keys are
//! deliberately absent: the payer key is read from the environment.

use serde::{Deserialize, Serialize};

use crate::resilience::BackoffStrategy;

/// Root configuration for a client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node that receives submissions and queries.
    pub gateway: Option<GatewayConfig>,

    /// Account paying for transactions and queries.
    pub payer: Option<PayerConfig>,

    /// Defaults applied to every transaction body.
    pub transactions: TransactionConfig,

    /// Retry and receipt polling settings.
    pub retries: RetryConfig,

    /// Call deadlines.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Gateway node endpoint and account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Base URL of the node's HTTP endpoint (e.g., "http://127.0.0.1:50211/").
    pub url: String,

    #[serde(default)]
    pub realm: u64,

    #[serde(default)]
    pub shard: u64,

    /// Account number of the node.
    pub account: u64,
}

/// Payer account. The key comes from `HASHGRAPH_PAYER_PRIVATE_KEY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayerConfig {
    #[serde(default)]
    pub realm: u64,

    #[serde(default)]
    pub shard: u64,

    pub account: u64,
}

/// Transaction body defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Maximum fee the payer accepts, in tinybars.
    pub fee_limit: i64,

    /// Seconds after the valid start during which the node accepts the transaction.
    pub valid_duration_secs: u64,

    /// Memo attached to every transaction.
    pub memo: String,

    /// Shift valid-start times by the drift learned from node responses.
    pub adjust_for_clock_drift: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            fee_limit: 100_000_000,
            valid_duration_secs: 120,
            memo: String::new(),
            adjust_for_clock_drift: false,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay between attempts in milliseconds.
    pub delay_ms: u64,

    /// Upper bound for a single delay in milliseconds.
    pub max_delay_ms: u64,

    /// How the delay grows with the attempt number.
    pub strategy: BackoffStrategy,

    /// Receipt or record polls before the outcome is reported as unknown.
    pub receipt_poll_limit: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay_ms: 200,
            max_delay_ms: 5_000,
            strategy: BackoffStrategy::Linear,
            receipt_poll_limit: 20,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a whole call including retries and polls. Unset means none.
    pub call_timeout_ms: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

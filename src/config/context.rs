//! Runtime configuration snapshot.
//!
//! A `Context` is immutable once a call starts. Overrides build a new
//! snapshot from a copy of the parent; nothing is shared mutably between
//! parent and child.

use ed25519_dalek::SigningKey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::{ClientError, Result};
use crate::ledger::account::signing_key_from_hex;
use crate::ledger::{Account, Address, TransactionId};
use crate::resilience::RetryPolicy;
use crate::transport::Gateway;

/// Environment variable holding the payer's hex-encoded Ed25519 seed.
pub const PAYER_KEY_ENV: &str = "HASHGRAPH_PAYER_PRIVATE_KEY";

/// Called with the outgoing request before each attempt.
pub type SendObserver = Arc<dyn Fn(&TransactionId, &serde_json::Value) + Send + Sync>;

/// Called with each response and the attempt number that produced it.
pub type ReceiveObserver = Arc<dyn Fn(&TransactionId, u32, &serde_json::Value) + Send + Sync>;

/// Diagnostic hooks. They see requests and responses but cannot alter them.
#[derive(Clone, Default)]
pub struct Observers {
    pub on_sending_request: Option<SendObserver>,
    pub on_response_received: Option<ReceiveObserver>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("on_sending_request", &self.on_sending_request.is_some())
            .field("on_response_received", &self.on_response_received.is_some())
            .finish()
    }
}

/// Everything a call needs to know besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub gateway: Option<Gateway>,
    pub payer: Option<Arc<Account>>,
    /// Maximum fee in tinybars.
    pub fee_limit: u64,
    pub retry_policy: RetryPolicy,
    pub receipt_poll_limit: u32,
    pub adjust_for_clock_drift: bool,
    pub valid_duration: Duration,
    pub memo: String,
    /// Use this id instead of minting one. Never re-minted on retry.
    pub transaction_id: Option<TransactionId>,
    /// Deadline for a whole call, retries and polls included.
    pub call_timeout: Option<Duration>,
    pub observers: Observers,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            gateway: None,
            payer: None,
            fee_limit: 100_000_000,
            retry_policy: RetryPolicy::default(),
            receipt_poll_limit: 20,
            adjust_for_clock_drift: false,
            valid_duration: Duration::from_secs(120),
            memo: String::new(),
            transaction_id: None,
            call_timeout: None,
            observers: Observers::default(),
        }
    }
}

impl Context {
    /// Build a snapshot from file configuration, taking the payer key from
    /// `HASHGRAPH_PAYER_PRIVATE_KEY`.
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let key = match (&config.payer, std::env::var(PAYER_KEY_ENV)) {
            (Some(_), Ok(hex)) => Some(signing_key_from_hex(&hex).map_err(|e| ConfigError::PayerKey {
                variable: PAYER_KEY_ENV,
                reason: e.to_string(),
            })?),
            (Some(_), Err(_)) => {
                return Err(ConfigError::PayerKey {
                    variable: PAYER_KEY_ENV,
                    reason: "variable is not set".to_string(),
                })
            }
            (None, _) => None,
        };
        Self::from_config_with_key(config, key)
    }

    /// Build a snapshot from file configuration and an explicit payer key.
    ///
    /// The configuration is validated first; an invalid one is rejected with
    /// every problem found.
    pub fn from_config_with_key(
        config: &ClientConfig,
        payer_key: Option<SigningKey>,
    ) -> std::result::Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let gateway = match &config.gateway {
            Some(g) => {
                let url = url::Url::parse(&g.url).map_err(|e| {
                    ConfigError::Validation(vec![ValidationError::new("gateway.url", format!("invalid URL: {}", e))])
                })?;
                Some(Gateway::new(url, Address::new(g.realm, g.shard, g.account)))
            }
            None => None,
        };

        let payer = config.payer.as_ref().map(|p| {
            let address = Address::new(p.realm, p.shard, p.account);
            let keys = payer_key.into_iter().collect();
            Arc::new(Account::new(address, keys))
        });

        let retries = &config.retries;
        let retry_policy = RetryPolicy::new(retries.max_retries, Duration::from_millis(retries.delay_ms))
            .with_max_delay(Duration::from_millis(retries.max_delay_ms))
            .with_strategy(retries.strategy);

        let fee_limit = u64::try_from(config.transactions.fee_limit).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::new(
                "transactions.fee_limit",
                "must be greater than zero",
            )])
        })?;

        Ok(Self {
            gateway,
            payer,
            fee_limit,
            retry_policy,
            receipt_poll_limit: retries.receipt_poll_limit,
            adjust_for_clock_drift: config.transactions.adjust_for_clock_drift,
            valid_duration: Duration::from_secs(config.transactions.valid_duration_secs),
            memo: config.transactions.memo.clone(),
            transaction_id: None,
            call_timeout: config.timeouts.call_timeout_ms.map(Duration::from_millis),
            observers: Observers::default(),
        })
    }

    /// Copy this snapshot and apply `configure` to the copy.
    pub fn derive(&self, configure: impl FnOnce(&mut Context)) -> Context {
        let mut child = self.clone();
        configure(&mut child);
        child
    }

    pub(crate) fn require_gateway(&self) -> Result<&Gateway> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ClientError::Configuration("the gateway node has not been configured".to_string()))
    }

    pub(crate) fn require_payer(&self) -> Result<&Account> {
        self.payer
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("the payer account has not been configured".to_string()))
    }
}

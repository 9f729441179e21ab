//! Finality polling.
//!
//! # Responsibilities
//! - Re-query the network for the outcome of an accepted transaction
//! - Stop at the first terminal status, success or failure
//! - Report `PollTimeout` when the poll budget runs out
//!
//! # Design Decisions
//! - Uses consensus-phase classification: "not yet available" is retryable
//! - A terminal failure status is returned, not raised; the validator decides
//! - Transport faults count as polls; they never end polling early

use crate::config::Context;
use crate::error::{ClientError, Result};
use crate::ledger::{Disposition, Phase, Receipt, Record, ResponseCode, TransactionId};
use crate::observability::metrics;
use crate::resilience::{Deadline, RetryPolicy};
use crate::transport::wire::{Query, QueryAnswer};
use crate::transport::{Gateway, Transport};

/// Polls one gateway for final outcomes.
pub struct FinalityPoller<'a> {
    transport: &'a dyn Transport,
    gateway: &'a Gateway,
    policy: &'a RetryPolicy,
    poll_limit: u32,
}

impl<'a> FinalityPoller<'a> {
    pub fn new(transport: &'a dyn Transport, gateway: &'a Gateway, context: &'a Context) -> Self {
        Self {
            transport,
            gateway,
            policy: &context.retry_policy,
            poll_limit: context.receipt_poll_limit,
        }
    }

    /// Wait for the receipt of `transaction_id`.
    pub async fn await_receipt(&self, transaction_id: TransactionId, deadline: &mut Deadline) -> Result<Receipt> {
        self.poll(
            transaction_id,
            deadline,
            || Ok(Query::TransactionReceipt { transaction_id }),
            |answer| match answer {
                QueryAnswer::Receipt(receipt) => Some((receipt.status, receipt)),
                _ => None,
            },
        )
        .await
    }

    /// Wait for the record of `transaction_id`.
    ///
    /// Record queries are paid, so `build_query` is called for every poll and
    /// must attach a fresh payment.
    pub async fn await_record<B>(
        &self,
        transaction_id: TransactionId,
        deadline: &mut Deadline,
        build_query: B,
    ) -> Result<Record>
    where
        B: FnMut() -> Result<Query>,
    {
        self.poll(transaction_id, deadline, build_query, |answer| match answer {
            QueryAnswer::Record(record) => Some((record.status, record)),
            _ => None,
        })
        .await
    }

    async fn poll<T, B, E>(
        &self,
        transaction_id: TransactionId,
        deadline: &mut Deadline,
        mut build_query: B,
        extract: E,
    ) -> Result<T>
    where
        B: FnMut() -> Result<Query>,
        E: Fn(QueryAnswer) -> Option<(ResponseCode, T)>,
    {
        for poll in 1..=self.poll_limit {
            let query = build_query()?;
            let exchange = deadline
                .run(self.transport.query(self.gateway, &query))
                .await
                .map_err(|reason| {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        poll,
                        reason = ?reason,
                        "Finality polling interrupted"
                    );
                    ClientError::Cancelled { transaction_id }
                })?;

            match exchange {
                Err(error) => {
                    metrics::record_poll("transport_error");
                    tracing::warn!(transaction_id = %transaction_id, poll, error = %error, "Finality poll failed");
                }
                Ok(response) if response.precheck_code.classify(Phase::Precheck) != Disposition::Proceed => {
                    let code = response.precheck_code;
                    let pending = code.classify(Phase::Precheck) == Disposition::Retry
                        || code.classify(Phase::Consensus) == Disposition::Retry;
                    if !pending {
                        metrics::record_poll("rejected");
                        tracing::error!(transaction_id = %transaction_id, poll, code = %code, "Finality query rejected");
                        return Err(ClientError::Precheck {
                            status: code,
                            transaction_id,
                        });
                    }
                    metrics::record_poll("pending");
                    tracing::debug!(transaction_id = %transaction_id, poll, code = %code, "Outcome not yet available");
                }
                Ok(response) => match response.answer.and_then(&extract) {
                    Some((status, outcome)) if status.classify(Phase::Consensus) != Disposition::Retry => {
                        metrics::record_poll("final");
                        tracing::info!(transaction_id = %transaction_id, polls = poll, status = %status, "Transaction reached finality");
                        return Ok(outcome);
                    }
                    Some((status, _)) => {
                        metrics::record_poll("pending");
                        tracing::debug!(transaction_id = %transaction_id, poll, status = %status, "Outcome not yet final");
                    }
                    None => {
                        metrics::record_poll("pending");
                        tracing::warn!(transaction_id = %transaction_id, poll, "Finality answer missing or of the wrong type");
                    }
                },
            }

            if poll < self.poll_limit {
                if let Err(reason) = deadline.sleep(self.policy.delay_for(poll)).await {
                    tracing::warn!(transaction_id = %transaction_id, poll, reason = ?reason, "Finality polling interrupted");
                    return Err(ClientError::Cancelled { transaction_id });
                }
            }
        }

        tracing::error!(
            transaction_id = %transaction_id,
            polls = self.poll_limit,
            "No final status observed within the poll budget"
        );
        Err(ClientError::PollTimeout {
            transaction_id,
            polls: self.poll_limit,
        })
    }
}

//! Submission state machine.
//!
//! ```text
//! Built ──build()──▶ Signed ──invoke()──▶ Submitting ──proceed/fail──▶ Accepted | Rejected
//!                      ▲                      │
//!                      │ stale start:         │ retry code or transport fault,
//!                      │ new id, re-sign      │ budget left
//!                      └────── Retrying ◀─────┘
//! ```
//!
//! # Invariants
//! - Attempts of one call are strictly sequential
//! - The transaction id changes only on a stale-start retry of a minted id
//! - Exhausting the budget on a retryable code returns that response;
//!   exhausting it on transport faults returns `ClientError::Transport`
//! - `DUPLICATE_TRANSACTION` answering a resend after a transport fault means
//!   the earlier attempt reached the node; the call is accepted under that id

use serde::Serialize;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::config::{Context, Observers};
use crate::error::{ClientError, Result};
use crate::identity::TransactionIdGenerator;
use crate::ledger::{Address, Disposition, ResponseCode, TransactionId};
use crate::observability::metrics;
use crate::resilience::{Deadline, Interrupted, RetryPolicy};
use crate::transport::wire::{QueryResponse, TransactionResponse};
use crate::transport::TransportError;

/// A node answer the engine can classify.
pub trait Reply: Serialize {
    fn code(&self) -> ResponseCode;

    /// Node wall clock in nanoseconds since the epoch, when reported.
    fn node_time_nanos(&self) -> Option<i64> {
        None
    }
}

impl Reply for TransactionResponse {
    fn code(&self) -> ResponseCode {
        self.precheck_code
    }

    fn node_time_nanos(&self) -> Option<i64> {
        self.node_time_nanos
    }
}

impl Reply for QueryResponse {
    fn code(&self) -> ResponseCode {
        self.precheck_code
    }
}

/// Where the first transaction id of a call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// Mint from the generator; re-minted on stale start.
    Mint { payer: Address },
    /// Caller-chosen id; used for every attempt.
    Pinned(TransactionId),
}

/// Final response of a call and how it was obtained.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub response: T,
    /// Id carried by the attempt that produced `response`.
    pub transaction_id: TransactionId,
    pub attempts: u32,
    /// The node already held `transaction_id` from an attempt whose reply was
    /// lost. Finality decides the result, not `response`.
    pub delivered_earlier: bool,
}

/// Runs one logical submission under a retry policy.
pub struct Engine<'a> {
    kind: &'static str,
    policy: &'a RetryPolicy,
    generator: &'a TransactionIdGenerator,
    adjust_for_clock_drift: bool,
    observers: &'a Observers,
}

impl<'a> Engine<'a> {
    /// `kind` labels logs and metrics (e.g. "transfer", "balance_query").
    pub fn new(kind: &'static str, context: &'a Context, generator: &'a TransactionIdGenerator) -> Self {
        Self {
            kind,
            policy: &context.retry_policy,
            generator,
            adjust_for_clock_drift: context.adjust_for_clock_drift,
            observers: &context.observers,
        }
    }

    /// Build, send and classify until a final response or the budget runs out.
    ///
    /// `build` is called once per transaction id and must return a fully
    /// signed request. `invoke` performs one network exchange. `classify`
    /// maps the response code to a disposition.
    pub async fn execute<Req, Resp, B, I, Fut, C>(
        &self,
        source: IdSource,
        deadline: &mut Deadline,
        mut build: B,
        invoke: I,
        classify: C,
    ) -> Result<Outcome<Resp>>
    where
        Req: Clone + Serialize,
        Resp: Reply,
        B: FnMut(TransactionId) -> Result<Req>,
        I: Fn(Req) -> Fut,
        Fut: Future<Output = std::result::Result<Resp, TransportError>>,
        C: Fn(ResponseCode) -> Disposition,
    {
        let start_time = Instant::now();
        let remint_for = match source {
            IdSource::Mint { payer } => Some(payer),
            IdSource::Pinned(_) => None,
        };
        let mut transaction_id = match source {
            IdSource::Mint { payer } => self.generator.next_id(payer, self.adjust_for_clock_drift)?,
            IdSource::Pinned(id) => id,
        };
        let mut request = build(transaction_id)?;
        let mut attempt = 0u32;
        // An attempt under the current id may have reached the node.
        let mut maybe_delivered = false;

        loop {
            attempt += 1;
            self.notify_sending(&transaction_id, &request);
            tracing::debug!(kind = self.kind, transaction_id = %transaction_id, attempt, "Sending request");

            let exchange = match deadline.run(invoke(request.clone())).await {
                Ok(exchange) => exchange,
                Err(reason) => return Err(self.interrupted(transaction_id, attempt, reason, start_time)),
            };

            let stale_start = match exchange {
                Ok(response) => {
                    self.notify_received(&transaction_id, attempt, &response);
                    if self.adjust_for_clock_drift {
                        if let Some(node_nanos) = response.node_time_nanos() {
                            self.generator.observe_node_time(node_nanos)?;
                        }
                    }

                    let code = response.code();
                    if code == ResponseCode::DuplicateTransaction && maybe_delivered {
                        tracing::info!(
                            kind = self.kind,
                            transaction_id = %transaction_id,
                            attempts = attempt,
                            "Earlier attempt reached the node; accepting it"
                        );
                        metrics::record_attempt(self.kind, Disposition::Proceed.as_str());
                        metrics::record_call(self.kind, Disposition::Proceed.as_str(), start_time);
                        return Ok(Outcome {
                            response,
                            transaction_id,
                            attempts: attempt,
                            delivered_earlier: true,
                        });
                    }

                    let disposition = classify(code);
                    metrics::record_attempt(self.kind, disposition.as_str());

                    let pinned_stale = code.is_stale_start() && remint_for.is_none();
                    if disposition != Disposition::Retry || !self.policy.allows_another(attempt) || pinned_stale {
                        if disposition == Disposition::Retry {
                            tracing::warn!(
                                kind = self.kind,
                                transaction_id = %transaction_id,
                                attempts = attempt,
                                code = %code,
                                "Retry budget exhausted"
                            );
                        } else {
                            tracing::debug!(
                                kind = self.kind,
                                transaction_id = %transaction_id,
                                attempts = attempt,
                                code = %code,
                                "Received final response"
                            );
                        }
                        metrics::record_call(self.kind, disposition.as_str(), start_time);
                        return Ok(Outcome {
                            response,
                            transaction_id,
                            attempts: attempt,
                            delivered_earlier: false,
                        });
                    }

                    tracing::warn!(
                        kind = self.kind,
                        transaction_id = %transaction_id,
                        attempt,
                        code = %code,
                        "Retrying request"
                    );
                    code.is_stale_start()
                }
                Err(error) => {
                    metrics::record_attempt(self.kind, "transport_error");
                    maybe_delivered = true;
                    if !self.policy.allows_another(attempt) {
                        tracing::error!(
                            kind = self.kind,
                            transaction_id = %transaction_id,
                            attempts = attempt,
                            error = %error,
                            "Transport failed on every attempt"
                        );
                        metrics::record_call(self.kind, "transport_error", start_time);
                        return Err(ClientError::Transport {
                            transaction_id,
                            attempts: attempt,
                            source: error,
                        });
                    }
                    tracing::warn!(
                        kind = self.kind,
                        transaction_id = %transaction_id,
                        attempt,
                        error = %error,
                        "Retrying request after transport error"
                    );
                    false
                }
            };

            if let Err(reason) = deadline.sleep(self.policy.delay_for(attempt)).await {
                return Err(self.interrupted(transaction_id, attempt, reason, start_time));
            }

            if stale_start {
                if let Some(payer) = remint_for {
                    let stale = transaction_id;
                    transaction_id = self.generator.next_id(payer, self.adjust_for_clock_drift)?;
                    request = build(transaction_id)?;
                    maybe_delivered = false;
                    tracing::info!(
                        kind = self.kind,
                        stale = %stale,
                        transaction_id = %transaction_id,
                        "Reissued transaction with a new valid start"
                    );
                }
            }
        }
    }

    fn interrupted(
        &self,
        transaction_id: TransactionId,
        attempt: u32,
        reason: Interrupted,
        start_time: Instant,
    ) -> ClientError {
        tracing::warn!(
            kind = self.kind,
            transaction_id = %transaction_id,
            attempt,
            reason = ?reason,
            "Call interrupted; the transaction may still reach consensus"
        );
        metrics::record_call(self.kind, "cancelled", start_time);
        ClientError::Cancelled { transaction_id }
    }

    fn notify_sending<Req: Serialize>(&self, transaction_id: &TransactionId, request: &Req) {
        if let Some(observer) = &self.observers.on_sending_request {
            let message = serde_json::to_value(request).unwrap_or(serde_json::Value::Null);
            if catch_unwind(AssertUnwindSafe(|| observer(transaction_id, &message))).is_err() {
                tracing::warn!(transaction_id = %transaction_id, "on_sending_request observer panicked");
            }
        }
    }

    fn notify_received<Resp: Serialize>(&self, transaction_id: &TransactionId, attempt: u32, response: &Resp) {
        if let Some(observer) = &self.observers.on_response_received {
            let message = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);
            if catch_unwind(AssertUnwindSafe(|| observer(transaction_id, attempt, &message))).is_err() {
                tracing::warn!(transaction_id = %transaction_id, "on_response_received observer panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Phase;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const PAYER: Address = Address::new(0, 0, 2);

    fn context(max_retries: u32) -> Context {
        Context {
            retry_policy: RetryPolicy::new(max_retries, Duration::from_millis(1)),
            ..Context::default()
        }
    }

    /// Answers from a script; the last entry repeats forever.
    #[derive(Clone)]
    struct Script {
        answers: Arc<Mutex<VecDeque<std::result::Result<ResponseCode, TransportError>>>>,
        seen: Arc<Mutex<Vec<TransactionId>>>,
    }

    impl Script {
        fn new(answers: Vec<std::result::Result<ResponseCode, TransportError>>) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers.into())),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn invoke(
            &self,
            request: TransactionId,
        ) -> impl Future<Output = std::result::Result<TransactionResponse, TransportError>> {
            let script = self.clone();
            async move {
                script.seen.lock().unwrap().push(request);
                let mut answers = script.answers.lock().unwrap();
                let next = if answers.len() > 1 {
                    answers.pop_front().unwrap()
                } else {
                    answers.front().cloned().unwrap()
                };
                next.map(|code| TransactionResponse {
                    precheck_code: code,
                    node_time_nanos: None,
                })
            }
        }

        fn seen(&self) -> Vec<TransactionId> {
            self.seen.lock().unwrap().clone()
        }
    }

    fn precheck(code: ResponseCode) -> Disposition {
        code.classify(Phase::Precheck)
    }

    #[tokio::test]
    async fn test_always_busy_makes_r_plus_one_attempts() {
        let ctx = context(3);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::Busy)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.response.precheck_code, ResponseCode::Busy);
        let seen = script.seen();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|id| *id == outcome.transaction_id));
    }

    #[tokio::test]
    async fn test_busy_then_ok_keeps_transaction_id() {
        let ctx = context(5);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::Busy), Ok(ResponseCode::Busy), Ok(ResponseCode::Ok)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.response.precheck_code, ResponseCode::Ok);
        assert!(script.seen().iter().all(|id| *id == outcome.transaction_id));
    }

    #[tokio::test]
    async fn test_fatal_code_is_returned_without_retry() {
        let ctx = context(5);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::InvalidSignature)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.response.precheck_code, ResponseCode::InvalidSignature);
    }

    #[tokio::test]
    async fn test_stale_start_mints_new_id() {
        let ctx = context(5);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::InvalidTransactionStart), Ok(ResponseCode::Ok)]);
        let builds = Arc::new(Mutex::new(0));

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                |id| {
                    *builds.lock().unwrap() += 1;
                    Ok(id)
                },
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        let seen = script.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen[1] > seen[0]);
        assert_eq!(outcome.transaction_id, seen[1]);
        assert_eq!(*builds.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_pinned_id_is_never_reminted() {
        let ctx = context(5);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let pinned = TransactionId::from_epoch_nanos(PAYER, 1_000_000_000);
        let script = Script::new(vec![Ok(ResponseCode::InvalidTransactionStart)]);

        let outcome = engine
            .execute(
                IdSource::Pinned(pinned),
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.transaction_id, pinned);
        assert_eq!(outcome.response.precheck_code, ResponseCode::InvalidTransactionStart);
    }

    #[tokio::test]
    async fn test_transport_faults_share_budget() {
        let ctx = context(2);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![
            Ok(ResponseCode::Busy),
            Err(TransportError::Connect("refused".into())),
        ]);

        let err = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap_err();

        match err {
            ClientError::Transport { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(source, TransportError::Connect("refused".into()));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(script.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_after_lost_reply_is_accepted() {
        let ctx = context(3);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Err(TransportError::Timeout), Ok(ResponseCode::DuplicateTransaction)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert!(outcome.delivered_earlier);
        assert_eq!(outcome.attempts, 2);
        let seen = script.seen();
        assert_eq!(seen, vec![outcome.transaction_id, outcome.transaction_id]);
    }

    #[tokio::test]
    async fn test_duplicate_without_lost_reply_is_final() {
        let ctx = context(3);
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::Busy), Ok(ResponseCode::DuplicateTransaction)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert!(!outcome.delivered_earlier);
        assert_eq!(outcome.response.precheck_code, ResponseCode::DuplicateTransaction);
    }

    #[tokio::test]
    async fn test_deadline_cancels_backoff() {
        let ctx = Context {
            retry_policy: RetryPolicy::new(10, Duration::from_secs(10)),
            ..Context::default()
        };
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::Busy)]);
        let mut deadline = Deadline::new(Some(Duration::from_millis(30)), None);

        let err = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut deadline,
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Cancelled { .. }));
        assert_eq!(err.transaction_id(), script.seen().first().copied());
    }

    #[tokio::test]
    async fn test_observers_cannot_break_the_call() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sent_clone = sent.clone();
        let mut ctx = context(1);
        ctx.observers.on_sending_request = Some(Arc::new(move |id: &TransactionId, _message: &serde_json::Value| {
            sent_clone.lock().unwrap().push(*id);
        }));
        ctx.observers.on_response_received = Some(Arc::new(|_id: &TransactionId, _attempt: u32, _message: &serde_json::Value| {
            panic!("observer failure");
        }));
        let generator = TransactionIdGenerator::new();
        let engine = Engine::new("test", &ctx, &generator);
        let script = Script::new(vec![Ok(ResponseCode::Busy), Ok(ResponseCode::Ok)]);

        let outcome = engine
            .execute(
                IdSource::Mint { payer: PAYER },
                &mut Deadline::unbounded(),
                Ok,
                |req| script.invoke(req),
                precheck,
            )
            .await
            .unwrap();

        assert_eq!(outcome.response.precheck_code, ResponseCode::Ok);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}

//! Caller-facing client.
//!
//! # Data Flow
//! ```text
//! Client::transfer(..) / create_account(..) / get_account_balance(..)
//!     → admit (closed? → ConfigurationError; snapshot Context; start Deadline)
//!     → local argument validation (ArgumentError, zero network calls)
//!     → execution::Engine → validator → FinalityPoller → validator
//!     → Receipt / Record / answer
//! ```
//!
//! # Design Decisions
//! - A call runs against the snapshot taken at admission
//! - Children from `clone_with` share transport, id generator and lifecycle
//! - `close` affects every handle sharing the transport

pub mod crypto;
pub mod receipts;

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::config::{ClientConfig, Context};
use crate::error::{ClientError, Result};
use crate::execution::{validator, Engine, FinalityPoller, IdSource, Reply};
use crate::identity::TransactionIdGenerator;
use crate::ledger::{AccountAmount, Account, Phase, Receipt, Record, TransactionId};
use crate::lifecycle::Shutdown;
use crate::resilience::Deadline;
use crate::signing::sign_transaction;
use crate::transport::wire::{Query, QueryAnswer, QueryHeader, SignedTransaction, TransactionBody, TransactionData};
use crate::transport::{Gateway, HttpTransport, Transport, TransportError};

pub use crypto::{AccountInfo, CreateAccountParams, TransferParams};

/// Request timeout of the default HTTP transport when no call timeout is set.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared by a client and every child derived from it.
struct Shared {
    transport: Arc<dyn Transport>,
    generator: Arc<TransactionIdGenerator>,
    shutdown: Shutdown,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Handle for submitting transactions and queries to one network.
pub struct Client {
    context: ArcSwap<Context>,
    shared: Arc<Shared>,
}

/// Decrements the in-flight count when a call ends.
struct InFlight(Arc<Shared>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// An admitted call: its snapshot, its deadline, its slot.
pub(crate) struct Call {
    pub(crate) context: Arc<Context>,
    pub(crate) deadline: Deadline,
    _in_flight: InFlight,
}

impl Client {
    /// Client using `transport` and the process-wide id generator.
    pub fn new(transport: Arc<dyn Transport>, context: Context) -> Self {
        Self::with_generator(transport, context, TransactionIdGenerator::process())
    }

    pub fn with_generator(
        transport: Arc<dyn Transport>,
        context: Context,
        generator: Arc<TransactionIdGenerator>,
    ) -> Self {
        Self {
            context: ArcSwap::from_pointee(context),
            shared: Arc::new(Shared {
                transport,
                generator,
                shutdown: Shutdown::new(),
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Client over HTTP, configured from a validated `ClientConfig`.
    ///
    /// The payer key is taken from `HASHGRAPH_PAYER_PRIVATE_KEY`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let context = Context::from_config(config).map_err(|e| ClientError::Configuration(e.to_string()))?;
        let request_timeout = context.call_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let transport = HttpTransport::new(request_timeout)
            .map_err(|e| ClientError::Configuration(format!("unable to create transport: {}", e)))?;
        Ok(Self::new(Arc::new(transport), context))
    }

    /// Current snapshot.
    pub fn context(&self) -> Arc<Context> {
        self.context.load_full()
    }

    /// Replace this handle's snapshot with a modified copy.
    ///
    /// Calls already running keep the snapshot they were admitted with.
    /// Concurrent updates are applied in turn; `configure` may run more than
    /// once when another update wins the race.
    pub fn configure(&self, configure: impl Fn(&mut Context)) {
        self.context.rcu(|current| current.derive(&configure));
    }

    /// Child handle with a modified copy of this handle's snapshot.
    pub fn clone_with(&self, configure: impl FnOnce(&mut Context)) -> Client {
        Client {
            context: ArcSwap::from_pointee(self.context.load().derive(configure)),
            shared: self.shared.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of calls currently running on this client and its children.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Stop admitting calls, give running ones `grace` to finish, cancel the
    /// rest and release the transport. Later calls to `close` do nothing.
    pub async fn close(&self, grace: Duration) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(in_flight = self.in_flight(), "Closing client");

        let shared = &self.shared;
        let drained = tokio::time::timeout(grace, async {
            loop {
                let idle = shared.idle.notified();
                if shared.in_flight.load(Ordering::Acquire) == 0 {
                    break;
                }
                idle.await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                in_flight = self.in_flight(),
                "Grace period elapsed; cancelling in-flight calls"
            );
        }
        shared.shutdown.trigger();
        shared.transport.close().await;
        tracing::info!("Client closed");
    }

    pub(crate) fn admit(&self) -> Result<Call> {
        let shutdown = self.shared.shutdown.subscribe();
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        let in_flight = InFlight(self.shared.clone());
        if self.is_closed() {
            return Err(ClientError::Configuration("client is closed".to_string()));
        }
        let context = self.context.load_full();
        let deadline = Deadline::new(context.call_timeout, Some(shutdown));
        Ok(Call {
            context,
            deadline,
            _in_flight: in_flight,
        })
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.shared.transport.as_ref()
    }

    pub(crate) fn generator(&self) -> &TransactionIdGenerator {
        &self.shared.generator
    }

    /// Submit a transaction and return the id it was accepted under.
    ///
    /// The payer signs first, then each of `signers` in order.
    pub(crate) async fn submit(
        &self,
        call: &mut Call,
        kind: &'static str,
        data: TransactionData,
        signers: &[&Account],
    ) -> Result<TransactionId> {
        let context = call.context.clone();
        let gateway = context.require_gateway()?;
        let payer = context.require_payer()?;
        let source = match context.transaction_id {
            Some(id) => IdSource::Pinned(id),
            None => IdSource::Mint {
                payer: payer.address(),
            },
        };

        let mut all_signers = Vec::with_capacity(signers.len() + 1);
        all_signers.push(payer);
        all_signers.extend_from_slice(signers);

        let engine = Engine::new(kind, &context, self.generator());
        let outcome = engine
            .execute(
                source,
                &mut call.deadline,
                |transaction_id| {
                    let body = transaction_body(&context, gateway, transaction_id, data.clone());
                    sign_transaction(body, &all_signers)
                },
                |transaction: SignedTransaction| {
                    let transport = self.shared.transport.clone();
                    let gateway = gateway.clone();
                    async move { transport.submit(&gateway, &transaction).await }
                },
                |code| code.classify(Phase::Precheck),
            )
            .await?;

        if !outcome.delivered_earlier {
            validator::precheck(outcome.transaction_id, outcome.response.code())?;
        }
        tracing::info!(kind, transaction_id = %outcome.transaction_id, attempts = outcome.attempts, "Transaction accepted");
        Ok(outcome.transaction_id)
    }

    /// Submit, wait for the receipt and validate it.
    pub(crate) async fn execute_for_receipt(
        &self,
        kind: &'static str,
        data: TransactionData,
        signers: &[&Account],
    ) -> Result<Receipt> {
        let mut call = self.admit()?;
        let transaction_id = self.submit(&mut call, kind, data, signers).await?;
        let receipt = self.await_receipt_in(&mut call, transaction_id).await?;
        validator::receipt(receipt)
    }

    /// Submit, wait for the record and validate it.
    pub(crate) async fn execute_for_record(
        &self,
        kind: &'static str,
        data: TransactionData,
        signers: &[&Account],
    ) -> Result<Record> {
        let mut call = self.admit()?;
        let transaction_id = self.submit(&mut call, kind, data, signers).await?;
        // The receipt is cheap and tells us when the record exists.
        let receipt = self.await_receipt_in(&mut call, transaction_id).await?;
        validator::receipt(receipt)?;
        let record = self.await_record_in(&mut call, transaction_id).await?;
        validator::record(record)
    }

    pub(crate) async fn await_receipt_in(&self, call: &mut Call, transaction_id: TransactionId) -> Result<Receipt> {
        let context = call.context.clone();
        let gateway = context.require_gateway()?;
        FinalityPoller::new(self.transport(), gateway, &context)
            .await_receipt(transaction_id, &mut call.deadline)
            .await
    }

    pub(crate) async fn await_record_in(&self, call: &mut Call, transaction_id: TransactionId) -> Result<Record> {
        let context = call.context.clone();
        let gateway = context.require_gateway()?;
        let payer = context.require_payer()?;
        FinalityPoller::new(self.transport(), gateway, &context)
            .await_record(transaction_id, &mut call.deadline, || {
                let payment_id = self
                    .generator()
                    .next_id(payer.address(), context.adjust_for_clock_drift)?;
                let header = self.query_header(&context, gateway, payer, payment_id)?;
                Ok(Query::TransactionRecord { header, transaction_id })
            })
            .await
    }

    /// Run a paid query: a fresh fee payment is signed for every id the
    /// engine mints. `extract` picks the expected answer out of the response.
    pub(crate) async fn paid_query<T, F, E>(&self, kind: &'static str, make_query: F, extract: E) -> Result<T>
    where
        F: Fn(QueryHeader) -> Query,
        E: FnOnce(QueryAnswer) -> Option<T>,
    {
        let mut call = self.admit()?;
        let context = call.context.clone();
        let gateway = context.require_gateway()?;
        let payer = context.require_payer()?;

        let engine = Engine::new(kind, &context, self.generator());
        let outcome = engine
            .execute(
                IdSource::Mint {
                    payer: payer.address(),
                },
                &mut call.deadline,
                |payment_id| Ok(make_query(self.query_header(&context, gateway, payer, payment_id)?)),
                |query: Query| {
                    let transport = self.shared.transport.clone();
                    let gateway = gateway.clone();
                    async move { transport.query(&gateway, &query).await }
                },
                |code| code.classify(Phase::Precheck),
            )
            .await?;

        validator::precheck(outcome.transaction_id, outcome.response.code())?;
        outcome
            .response
            .answer
            .and_then(extract)
            .ok_or_else(|| ClientError::Transport {
                transaction_id: outcome.transaction_id,
                attempts: outcome.attempts,
                source: TransportError::Decode(format!("{} answer missing or of the wrong type", kind)),
            })
    }

    /// Fee payment from the payer to the gateway node, signed by the payer.
    fn query_header(
        &self,
        context: &Context,
        gateway: &Gateway,
        payer: &Account,
        payment_id: TransactionId,
    ) -> Result<QueryHeader> {
        let fee = i64::try_from(context.fee_limit)
            .map_err(|_| ClientError::argument("fee_limit", "exceeds the largest transferable amount"))?;
        let data = TransactionData::CryptoTransfer {
            transfers: vec![
                AccountAmount {
                    address: payer.address(),
                    amount: -fee,
                },
                AccountAmount {
                    address: gateway.node,
                    amount: fee,
                },
            ],
        };
        let body = transaction_body(context, gateway, payment_id, data);
        Ok(QueryHeader {
            payment: Some(sign_transaction(body, &[payer])?),
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("context", &self.context.load())
            .field("closed", &self.is_closed())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn transaction_body(
    context: &Context,
    gateway: &Gateway,
    transaction_id: TransactionId,
    data: TransactionData,
) -> TransactionBody {
    TransactionBody {
        transaction_id,
        node_account: gateway.node,
        transaction_fee: context.fee_limit,
        valid_duration_secs: context.valid_duration.as_secs(),
        memo: context.memo.clone(),
        data,
    }
}

//! Shared utilities for integration tests.
//!
//! - `SimulatedNode`: in-process `Transport` with balances, signature checks,
//!   delayed receipts and scripted failures
//! - `start_programmable_backend`: raw-TCP HTTP server for `HttpTransport`

#![allow(dead_code)]

use async_trait::async_trait;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use hashgraph_client::config::Context;
use hashgraph_client::ledger::{Account, AccountAmount, Address, Endorsement, Record, ResponseCode, TransactionId};
use hashgraph_client::resilience::RetryPolicy;
use hashgraph_client::signing::verify_signature;
use hashgraph_client::transport::wire::{
    AccountInfoAnswer, Query, QueryAnswer, QueryHeader, QueryResponse, SignedTransaction, TransactionData,
    TransactionResponse, WireKey,
};
use hashgraph_client::transport::{Gateway, Transport, TransportError};
use hashgraph_client::Client;

pub const PAYER: Address = Address::new(0, 0, 2);
pub const NODE: Address = Address::new(0, 0, 3);
pub const PAYER_BALANCE: u64 = 1_000_000_000;

pub fn generate_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

pub fn gateway() -> Gateway {
    Gateway::new("http://127.0.0.1:50211/".parse().unwrap(), NODE)
}

/// Context with short delays so retries finish quickly.
pub fn test_context(payer: &Account) -> Context {
    Context {
        gateway: Some(gateway()),
        payer: Some(Arc::new(payer.clone())),
        retry_policy: RetryPolicy::new(3, Duration::from_millis(1)),
        receipt_poll_limit: 10,
        ..Context::default()
    }
}

/// A simulated node with a funded payer, and a client pointed at it.
pub fn setup() -> (Arc<SimulatedNode>, Client, Account) {
    let payer = Account::with_key(PAYER, generate_key());
    let node = Arc::new(SimulatedNode::new());
    node.add_account(PAYER, Endorsement::key(payer.keys()[0].verifying_key()), PAYER_BALANCE);
    node.add_account(NODE, Endorsement::key(generate_key().verifying_key()), 0);
    let client = Client::new(node.clone(), test_context(&payer));
    (node, client, payer)
}

struct SimAccount {
    balance: u64,
    key: Endorsement,
}

struct Finalized {
    record: Record,
    polls_until_ready: u32,
}

#[derive(Default)]
struct NodeState {
    accounts: HashMap<Address, SimAccount>,
    next_account: u64,
    finalized: HashMap<TransactionId, Finalized>,
    scripted_precheck: VecDeque<ResponseCode>,
    transport_failures: u32,
    lost_replies: u32,
    receipt_delay_polls: u32,
    never_final: bool,
    stall: bool,
    node_time_offset_nanos: Option<i64>,
    submitted: Vec<SignedTransaction>,
}

/// In-process stand-in for a gateway node.
///
/// Finalizes transactions synchronously on submission but only reveals the
/// receipt after `receipt_delay_polls` receipt polls.
pub struct SimulatedNode {
    state: Mutex<NodeState>,
    submissions: AtomicU32,
    queries: AtomicU32,
}

impl SimulatedNode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NodeState {
                next_account: 1001,
                ..NodeState::default()
            }),
            submissions: AtomicU32::new(0),
            queries: AtomicU32::new(0),
        }
    }

    pub fn add_account(&self, address: Address, key: Endorsement, balance: u64) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address, SimAccount { balance, key });
    }

    pub fn balance(&self, address: Address) -> Option<u64> {
        self.state.lock().unwrap().accounts.get(&address).map(|a| a.balance)
    }

    /// Answer the next submissions with these codes, without processing them.
    pub fn script_precheck(&self, codes: impl IntoIterator<Item = ResponseCode>) {
        self.state.lock().unwrap().scripted_precheck.extend(codes);
    }

    /// Fail the next `count` exchanges with a connection error.
    pub fn fail_transport(&self, count: u32) {
        self.state.lock().unwrap().transport_failures = count;
    }

    /// Process the next `count` submissions but time out instead of replying.
    pub fn lose_replies(&self, count: u32) {
        self.state.lock().unwrap().lost_replies = count;
    }

    pub fn set_receipt_delay(&self, polls: u32) {
        self.state.lock().unwrap().receipt_delay_polls = polls;
    }

    /// Receipts stay UNKNOWN forever.
    pub fn set_never_final(&self, never_final: bool) {
        self.state.lock().unwrap().never_final = never_final;
    }

    /// Submissions hang until the caller gives up; they are still processed.
    pub fn set_stall(&self, stall: bool) {
        self.state.lock().unwrap().stall = stall;
    }

    /// Report a node clock `offset` nanoseconds ahead of local time.
    pub fn set_node_time_offset(&self, offset: i64) {
        self.state.lock().unwrap().node_time_offset_nanos = Some(offset);
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> u32 {
        self.submissions() + self.queries()
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn take_transport_failure(state: &mut NodeState) -> bool {
        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            true
        } else {
            false
        }
    }

    fn process(state: &mut NodeState, transaction: &SignedTransaction) -> ResponseCode {
        let Ok(bytes) = transaction.body.canonical_bytes() else {
            return ResponseCode::BadEncoding;
        };
        if !transaction.signatures.iter().all(|s| verify_signature(&bytes, s)) {
            return ResponseCode::InvalidSignature;
        }
        let signed: Vec<VerifyingKey> = transaction
            .signatures
            .iter()
            .filter_map(|s| {
                let raw: [u8; 32] = hex::decode(&s.public_key).ok()?.try_into().ok()?;
                VerifyingKey::from_bytes(&raw).ok()
            })
            .collect();

        let id = transaction.transaction_id();
        if state.finalized.contains_key(&id) {
            return ResponseCode::DuplicateTransaction;
        }
        let Some(payer) = state.accounts.get(&id.payer) else {
            return ResponseCode::PayerAccountNotFound;
        };
        if !payer.key.is_satisfied_by(&signed) {
            return ResponseCode::InvalidSignature;
        }

        let mut record = Record {
            transaction_id: id,
            status: ResponseCode::Success,
            address: None,
            transfers: Vec::new(),
            fee: 0,
            memo: transaction.body.memo.clone(),
        };

        match &transaction.body.data {
            TransactionData::CryptoTransfer { transfers } => {
                if transfers.iter().map(|t| t.amount).sum::<i64>() != 0 {
                    return ResponseCode::InvalidAccountAmounts;
                }
                for t in transfers.iter().filter(|t| t.amount < 0) {
                    match state.accounts.get(&t.address) {
                        Some(sender) if sender.key.is_satisfied_by(&signed) => {}
                        Some(_) => return ResponseCode::InvalidSignature,
                        None => return ResponseCode::InvalidAccountId,
                    }
                }
                record.status = Self::apply_transfers(state, transfers);
                if record.status == ResponseCode::Success {
                    record.transfers = transfers.clone();
                }
            }
            TransactionData::CryptoCreateAccount {
                key, initial_balance, ..
            } => {
                let endorsement = match Endorsement::try_from(key) {
                    Ok(endorsement) => endorsement,
                    Err(_) => return ResponseCode::BadEncoding,
                };
                let payer_balance = state.accounts.get(&id.payer).map(|a| a.balance).unwrap_or(0);
                if payer_balance < *initial_balance {
                    record.status = ResponseCode::InsufficientPayerBalance;
                } else {
                    let address = Address::new(0, 0, state.next_account);
                    state.next_account += 1;
                    if let Some(payer) = state.accounts.get_mut(&id.payer) {
                        payer.balance -= initial_balance;
                    }
                    state.accounts.insert(
                        address,
                        SimAccount {
                            balance: *initial_balance,
                            key: endorsement,
                        },
                    );
                    record.address = Some(address);
                    let amount = *initial_balance as i64;
                    record.transfers = vec![
                        AccountAmount {
                            address: id.payer,
                            amount: -amount,
                        },
                        AccountAmount { address, amount },
                    ];
                }
            }
        }

        let polls_until_ready = state.receipt_delay_polls;
        state.finalized.insert(
            id,
            Finalized {
                record,
                polls_until_ready,
            },
        );
        ResponseCode::Ok
    }

    fn apply_transfers(state: &mut NodeState, transfers: &[AccountAmount]) -> ResponseCode {
        let mut next: HashMap<Address, i64> = HashMap::new();
        for t in transfers {
            let Some(account) = state.accounts.get(&t.address) else {
                return ResponseCode::InvalidAccountId;
            };
            let balance = next.entry(t.address).or_insert(account.balance as i64);
            *balance += t.amount;
        }
        if next.values().any(|b| *b < 0) {
            return ResponseCode::InsufficientAccountBalance;
        }
        for (address, balance) in next {
            if let Some(account) = state.accounts.get_mut(&address) {
                account.balance = balance as u64;
            }
        }
        ResponseCode::Success
    }

    fn payment_ok(header: &QueryHeader) -> bool {
        match &header.payment {
            Some(payment) => payment
                .body
                .canonical_bytes()
                .map(|bytes| !payment.signatures.is_empty() && payment.signatures.iter().all(|s| verify_signature(&bytes, s)))
                .unwrap_or(false),
            None => false,
        }
    }

    fn outcome(state: &mut NodeState, transaction_id: &TransactionId) -> Result<Record, ResponseCode> {
        let never_final = state.never_final;
        let Some(finalized) = state.finalized.get_mut(transaction_id) else {
            return Err(ResponseCode::ReceiptNotFound);
        };
        if never_final || finalized.polls_until_ready > 0 {
            finalized.polls_until_ready = finalized.polls_until_ready.saturating_sub(1);
            let mut pending = finalized.record.clone();
            pending.status = ResponseCode::Unknown;
            return Ok(pending);
        }
        Ok(finalized.record.clone())
    }
}

fn answer(answer: QueryAnswer) -> QueryResponse {
    QueryResponse {
        precheck_code: ResponseCode::Ok,
        answer: Some(answer),
    }
}

fn rejected(code: ResponseCode) -> QueryResponse {
    QueryResponse {
        precheck_code: code,
        answer: None,
    }
}

fn local_nanos() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as i64
}

#[async_trait]
impl Transport for SimulatedNode {
    async fn submit(
        &self,
        _gateway: &Gateway,
        transaction: &SignedTransaction,
    ) -> Result<TransactionResponse, TransportError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let (code, stall, offset) = {
            let mut state = self.state.lock().unwrap();
            if Self::take_transport_failure(&mut state) {
                return Err(TransportError::Connect("connection refused".into()));
            }
            state.submitted.push(transaction.clone());
            let code = match state.scripted_precheck.pop_front() {
                Some(code) => code,
                None => Self::process(&mut state, transaction),
            };
            if state.lost_replies > 0 {
                state.lost_replies -= 1;
                return Err(TransportError::Timeout);
            }
            (code, state.stall, state.node_time_offset_nanos)
        };
        if stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(TransactionResponse {
            precheck_code: code,
            node_time_nanos: offset.map(|o| local_nanos() + o),
        })
    }

    async fn query(&self, _gateway: &Gateway, query: &Query) -> Result<QueryResponse, TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if Self::take_transport_failure(&mut state) {
            return Err(TransportError::Connect("connection refused".into()));
        }

        let response = match query {
            Query::TransactionReceipt { transaction_id } => match Self::outcome(&mut state, transaction_id) {
                Ok(record) => answer(QueryAnswer::Receipt(record.receipt())),
                Err(code) => rejected(code),
            },
            Query::TransactionRecord { header, transaction_id } => {
                if !Self::payment_ok(header) {
                    rejected(ResponseCode::InvalidSignature)
                } else {
                    match Self::outcome(&mut state, transaction_id) {
                        Ok(record) => answer(QueryAnswer::Record(record)),
                        Err(_) => rejected(ResponseCode::RecordNotFound),
                    }
                }
            }
            Query::AccountBalance { header, address } => {
                if !Self::payment_ok(header) {
                    rejected(ResponseCode::InvalidSignature)
                } else {
                    match state.accounts.get(address) {
                        Some(account) => answer(QueryAnswer::AccountBalance {
                            balance: account.balance,
                        }),
                        None => rejected(ResponseCode::InvalidAccountId),
                    }
                }
            }
            Query::AccountInfo { header, address } => {
                if !Self::payment_ok(header) {
                    rejected(ResponseCode::InvalidSignature)
                } else {
                    match state.accounts.get(address) {
                        Some(account) => answer(QueryAnswer::AccountInfo(AccountInfoAnswer {
                            address: *address,
                            balance: account.balance,
                            key: WireKey::from(&account.key),
                            deleted: false,
                        })),
                        None => rejected(ResponseCode::InvalidAccountId),
                    }
                }
            }
        };
        Ok(response)
    }
}

/// Read one HTTP request (headers plus `Content-Length` body) from `socket`.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return Some(String::from_utf8_lossy(&buf[header_end + 4..header_end + 4 + content_length]).into_owned());
            }
        }
    }
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the request body and returns a status and a JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

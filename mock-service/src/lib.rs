//! An in-process stand-in for a chain's REST API.
//!
//! Every [`MockChain`] owns its state: accounts and their sequences, a block producer, and a
//! count of calls per path. Nothing is shared between instances, so tests can run side by side.
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, info, warn};

pub const CHAIN_ID: &str = "mock-chain";

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub block_interval: Duration,
    /// Broadcasts beyond this many per second are answered with 429.
    pub tx_rate_limit: Option<NonZeroU32>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            block_interval: Duration::from_millis(200),
            tx_rate_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Header {
    chain_id: &'static str,
    height: String,
    #[serde(with = "time::serde::rfc3339")]
    time: OffsetDateTime,
    num_txs: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct AccountEntry {
    account_number: u64,
    sequence: u64,
}

struct ChainState {
    blocks: Mutex<Vec<Header>>,
    pending_txs: AtomicU64,
    tx_counter: AtomicU64,
    accounts: Mutex<HashMap<String, AccountEntry>>,
    calls: Mutex<HashMap<String, usize>>,
    rejection: Mutex<Option<(u32, String)>>,
    limiter: Option<DefaultDirectRateLimiter>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChainState {
    fn new(options: &MockOptions) -> Self {
        let genesis = Header {
            chain_id: CHAIN_ID,
            height: "1".to_string(),
            time: OffsetDateTime::now_utc(),
            num_txs: "0".to_string(),
        };
        Self {
            blocks: Mutex::new(vec![genesis]),
            pending_txs: AtomicU64::new(0),
            tx_counter: AtomicU64::new(0),
            accounts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            rejection: Mutex::new(None),
            limiter: options
                .tx_rate_limit
                .map(|tps| RateLimiter::direct(Quota::per_second(tps))),
        }
    }

    fn produce_block(&self) {
        let mut blocks = lock(&self.blocks);
        let height = blocks.len() as u64 + 1;
        let num_txs = self.pending_txs.swap(0, Ordering::Relaxed);
        blocks.push(Header {
            chain_id: CHAIN_ID,
            height: height.to_string(),
            time: OffsetDateTime::now_utc(),
            num_txs: num_txs.to_string(),
        });
    }

    fn height(&self) -> u64 {
        lock(&self.blocks).len() as u64
    }

    fn header(&self, height: u64) -> Option<Header> {
        let index = usize::try_from(height).ok()?.checked_sub(1)?;
        lock(&self.blocks).get(index).cloned()
    }
}

/// A running mock chain. The server stops when this is dropped.
pub struct MockChain {
    addr: SocketAddr,
    state: Arc<ChainState>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockChain {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests received for exactly `path` (no query string).
    pub fn calls(&self, path: &str) -> usize {
        lock(&self.state.calls).get(path).copied().unwrap_or(0)
    }

    pub fn sequence(&self, address: &str) -> u64 {
        lock(&self.state.accounts)
            .get(address)
            .map(|a| a.sequence)
            .unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.state.height()
    }

    /// Answer every following broadcast with a non-zero `code`.
    pub fn reject_txs(&self, code: u32, log: &str) {
        *lock(&self.state.rejection) = Some((code, log.to_string()));
    }
}

impl Drop for MockChain {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Starts a chain with default options on an ephemeral localhost port.
pub async fn spawn() -> std::io::Result<MockChain> {
    spawn_with(MockOptions::default()).await
}

pub async fn spawn_with(options: MockOptions) -> std::io::Result<MockChain> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(ChainState::new(&options));

    let producer = tokio::spawn(produce_blocks(state.clone(), options.block_interval));
    let app = app(state.clone());
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!("Mock chain stopped: {err}");
        }
    });

    debug!("Mock chain listening on {addr}");
    Ok(MockChain {
        addr,
        state,
        tasks: vec![producer, server],
    })
}

/// Serves a chain on `addr` until the process exits.
pub async fn run(addr: SocketAddr, options: MockOptions) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let state = Arc::new(ChainState::new(&options));
    tokio::spawn(produce_blocks(state.clone(), options.block_interval));

    info!("Mock chain listening on {addr}");
    axum::serve(listener, app(state)).await
}

fn app(state: Arc<ChainState>) -> Router {
    Router::new()
        .route("/auth/accounts/:address", get(account))
        .route("/txs", post(broadcast))
        .route("/blocks/latest", get(latest_block))
        .route("/blocks/:height", get(block))
        .route("/blocks_with_tx_results/:from", get(blocks_with_tx_results))
        .layer(middleware::from_fn_with_state(state.clone(), count_calls))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn produce_blocks(state: Arc<ChainState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and genesis already exists.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.produce_block();
    }
}

async fn count_calls(State(state): State<Arc<ChainState>>, req: Request, next: Next) -> Response {
    *lock(&state.calls)
        .entry(req.uri().path().to_string())
        .or_default() += 1;
    next.run(req).await
}

fn block_envelope(header: Header) -> Value {
    json!({
        "block_meta": { "header": &header },
        "block": { "header": header },
    })
}

async fn account(
    State(state): State<Arc<ChainState>>,
    Path(address): Path<String>,
) -> Json<Value> {
    let entry = lock(&state.accounts)
        .get(&address)
        .copied()
        .unwrap_or_default();
    Json(json!({
        "height": state.height().to_string(),
        "result": {
            "type": "auth/Account",
            "value": {
                "address": address,
                "account_number": entry.account_number.to_string(),
                "sequence": entry.sequence.to_string(),
            }
        }
    }))
}

/// Address that pays for `tx`: the sender of its first message.
fn signer(tx: &Value) -> Option<String> {
    let value = tx.get("msg")?.get(0)?.get("value")?;
    ["from_address", "from", "owner"]
        .iter()
        .find_map(|key| value.get(key))
        .or_else(|| value.get("inputs")?.get(0)?.get("address"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

async fn broadcast(State(state): State<Arc<ChainState>>, body: Json<Value>) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
        }
    }

    let Some(tx) = body.get("tx") else {
        return (StatusCode::BAD_REQUEST, "missing tx").into_response();
    };
    let Some(signer) = signer(tx) else {
        return (StatusCode::BAD_REQUEST, "no signer").into_response();
    };

    let txhash = format!("{:064X}", state.tx_counter.fetch_add(1, Ordering::Relaxed) + 1);
    if let Some((code, log)) = lock(&state.rejection).clone() {
        return Json(json!({ "height": "0", "txhash": txhash, "code": code, "raw_log": log }))
            .into_response();
    }

    {
        let mut accounts = lock(&state.accounts);
        let next_number = accounts.len() as u64 + 1;
        let entry = accounts.entry(signer).or_insert(AccountEntry {
            account_number: next_number,
            sequence: 0,
        });
        entry.sequence += 1;
    }
    state.pending_txs.fetch_add(1, Ordering::Relaxed);

    Json(json!({ "height": "0", "txhash": txhash, "raw_log": "[]" })).into_response()
}

async fn latest_block(State(state): State<Arc<ChainState>>) -> Response {
    match state.header(state.height()) {
        Some(header) => Json(block_envelope(header)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn block(State(state): State<Arc<ChainState>>, Path(height): Path<String>) -> Response {
    let Ok(height) = height.parse::<u64>() else {
        return (StatusCode::BAD_REQUEST, "height must be a number").into_response();
    };
    match state.header(height) {
        Some(header) => Json(block_envelope(header)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("requested height {height} is not available yet"),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct FetchSize {
    fetchsize: Option<u64>,
}

async fn blocks_with_tx_results(
    State(state): State<Arc<ChainState>>,
    Path(from): Path<u64>,
    Query(query): Query<FetchSize>,
) -> Json<Value> {
    let size = query.fetchsize.unwrap_or(1);
    let blocks: Vec<Value> = (from..from.saturating_add(size))
        .map_while(|height| state.header(height))
        .map(|header| json!({ "result_block": block_envelope(header), "result_block_results": {} }))
        .collect();
    Json(Value::Array(blocks))
}

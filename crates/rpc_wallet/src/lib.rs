use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
    time::Duration,
};

use async_trait::async_trait;
use client_core::wallet::{
    CallRequest, TransactionRequest, TxReceipt, WalletError, WalletEvent, WalletProvider,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::domain::{Address, NetworkId, TxHash};
use thiserror::Error;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use url::Url;

pub mod quantity;

use quantity::{encode_data, encode_quantity, parse_data, parse_u64_quantity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl RpcError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<RpcError> for WalletError {
    fn from(value: RpcError) -> Self {
        match value {
            RpcError::Http(err) => WalletError::Transport(err.to_string()),
            RpcError::Rpc { code, message } => WalletError::from_rpc(code, message),
            RpcError::Malformed(message) => WalletError::Rpc {
                code: -32700,
                message,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RpcWalletConfig {
    pub endpoint: Url,
    pub receipt_poll: Duration,
    pub watch_poll: Duration,
}

impl RpcWalletConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            receipt_poll: Duration::from_millis(1000),
            watch_poll: Duration::from_millis(2000),
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: Option<String>,
    #[serde(default)]
    status: Option<String>,
    gas_used: String,
    #[serde(default)]
    block_number: Option<String>,
}

pub struct JsonRpcWallet {
    http: Client,
    config: RpcWalletConfig,
    next_id: AtomicU64,
    events: broadcast::Sender<WalletEvent>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl JsonRpcWallet {
    pub fn new(config: RpcWalletConfig) -> Result<Arc<Self>, RpcError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (events, _) = broadcast::channel(64);
        Ok(Arc::new(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
            events,
            watcher: Mutex::new(None),
        }))
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, "rpc request");
        let response: RpcResponse = self
            .http
            .post(self.config.endpoint.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(response.result.unwrap_or(Value::Null))
            .map_err(|err| RpcError::malformed(format!("{method}: {err}")))
    }

    async fn account_list(&self, method: &str) -> Result<Vec<Address>, RpcError> {
        let raw: Vec<String> = self.request(method, json!([])).await?;
        raw.iter()
            .map(|account| {
                Address::parse(account)
                    .map_err(|err| RpcError::malformed(format!("account '{account}': {err}")))
            })
            .collect()
    }

    async fn chain_id(&self) -> Result<NetworkId, RpcError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        parse_u64_quantity(&raw).map(NetworkId)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, RpcError> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Some(reported) = raw.transaction_hash.as_deref().and_then(TxHash::parse) {
            if reported != tx_hash {
                return Err(RpcError::malformed(format!(
                    "receipt for {reported} returned for {tx_hash}"
                )));
            }
        }
        // Pre-byzantium receipts carry no status; treat them as successful.
        let success = match raw.status.as_deref() {
            Some(status) => parse_u64_quantity(status)? == 1,
            None => true,
        };
        Ok(Some(TxReceipt {
            tx_hash,
            success,
            gas_used: parse_u64_quantity(&raw.gas_used)?,
            block_number: raw
                .block_number
                .as_deref()
                .map(parse_u64_quantity)
                .transpose()?,
        }))
    }

    /// Polls accounts and chain id and broadcasts every change as a [`WalletEvent`].
    /// Calling it again while the watcher runs is a no-op.
    pub fn start_watching(self: &Arc<Self>) {
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if watcher.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let wallet: Weak<Self> = Arc::downgrade(self);
        let period = self.config.watch_poll;
        *watcher = Some(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_network: Option<NetworkId> = None;
            loop {
                ticker.tick().await;
                let Some(wallet) = wallet.upgrade() else {
                    break;
                };
                wallet.poll_once(&mut last_accounts, &mut last_network).await;
            }
            info!("wallet watcher stopped");
        }));
    }

    async fn poll_once(
        &self,
        last_accounts: &mut Option<Vec<Address>>,
        last_network: &mut Option<NetworkId>,
    ) {
        match self.account_list("eth_accounts").await {
            Ok(accounts) => {
                if last_accounts.as_ref().is_some_and(|last| *last != accounts) {
                    info!(count = accounts.len(), "wallet accounts changed");
                    let _ = self.events.send(WalletEvent::AccountsChanged(accounts.clone()));
                }
                *last_accounts = Some(accounts);
            }
            Err(err) => debug!("account poll failed: {err}"),
        }

        match self.chain_id().await {
            Ok(network) => {
                if last_network.is_some_and(|last| last != network) {
                    info!(%network, "wallet network changed");
                    let _ = self.events.send(WalletEvent::NetworkChanged(network));
                }
                *last_network = Some(network);
            }
            Err(err) => debug!("chain id poll failed: {err}"),
        }
    }
}

impl Drop for JsonRpcWallet {
    fn drop(&mut self) {
        if let Some(task) = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.account_list("eth_requestAccounts").await?)
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.account_list("eth_accounts").await?)
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        Ok(self.chain_id().await?)
    }

    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, WalletError> {
        let raw: String = self
            .request(
                "eth_call",
                json!([
                    {
                        "to": request.to.to_lower_hex(),
                        "data": encode_data(&request.data),
                    },
                    "latest"
                ]),
            )
            .await?;
        Ok(parse_data(&raw)?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError> {
        let raw: String = self
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": request.from.to_lower_hex(),
                    "to": request.to.to_lower_hex(),
                    "data": encode_data(&request.data),
                    "value": encode_quantity(request.value.base_units()),
                    "gas": encode_quantity(u128::from(request.gas_limit)),
                }]),
            )
            .await?;
        let tx_hash = TxHash::parse(&raw)
            .ok_or_else(|| RpcError::malformed(format!("invalid transaction hash '{raw}'")))?;
        info!(%tx_hash, "transaction accepted by node");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, WalletError> {
        loop {
            match self.receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                // A dropped poll is retried; the transaction is already in the pool.
                Err(RpcError::Http(err)) => warn!(%tx_hash, "receipt poll failed: {err}"),
                Err(err) => return Err(err.into()),
            }
            time::sleep(self.config.receipt_poll).await;
        }
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

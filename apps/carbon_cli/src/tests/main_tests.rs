use super::*;

use std::time::Duration;

use async_trait::async_trait;
use client_core::wallet::{
    CallRequest, TransactionRequest, TxReceipt, WalletError, WalletEvent, WalletProvider,
};
use shared::{
    domain::{Address, NetworkId, TxHash},
    error::ErrorCode,
    protocol::ClientEvent,
};
use tokio::sync::broadcast;

const CONTRACT: Address = Address::from_bytes([0xc0; 20]);

/// A wallet whose authorization prompt is never answered.
struct StalledWallet;

#[async_trait]
impl WalletProvider for StalledWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        std::future::pending().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(Vec::new())
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        Ok(NetworkId(1337))
    }

    async fn call(&self, _request: CallRequest) -> Result<Vec<u8>, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn send_transaction(&self, _request: TransactionRequest) -> Result<TxHash, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<TxReceipt, WalletError> {
        std::future::pending().await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
        broadcast::channel(1).1
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_command_does_not_hold_up_status_queries() {
    let client = CarbonMarketClient::new(Arc::new(StalledWallet), CONTRACT);

    let connect = spawn_dispatch(&client, ClientCommand::Connect);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let session = tokio::time::timeout(Duration::from_secs(1), client.session())
        .await
        .expect("status answered while connect is outstanding");
    assert!(!session.is_connected());
    assert!(client.transaction_state().is_idle());
    assert!(!connect.is_finished());
    connect.abort();
}

#[tokio::test]
async fn spawned_command_failures_reach_the_event_stream() {
    let client = CarbonMarketClient::without_wallet(CONTRACT);
    let mut events = client.subscribe_events();

    spawn_dispatch(&client, ClientCommand::Connect)
        .await
        .expect("dispatch task");
    assert!(matches!(
        events.try_recv(),
        Some(ClientEvent::Error(payload)) if payload.code == ErrorCode::ProviderUnavailable
    ));
}

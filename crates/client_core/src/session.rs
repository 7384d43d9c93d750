use std::sync::Arc;

use shared::{
    domain::{Address, NetworkId},
    error::ClientError,
    protocol::{ClientEvent, SessionSnapshot},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{event_bus::EventBus, gateway::ContractGateway, wallet::WalletProvider};

pub struct SessionManager {
    wallet: Arc<dyn WalletProvider>,
    gateway: Arc<ContractGateway>,
    events: Arc<EventBus>,
    state: RwLock<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        gateway: Arc<ContractGateway>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            wallet,
            gateway,
            events,
            state: RwLock::new(SessionSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        *self.state.read().await
    }

    pub async fn connect(&self) -> Result<SessionSnapshot, ClientError> {
        let accounts = self
            .wallet
            .request_accounts()
            .await
            .map_err(|err| err.into_connect_error())?;
        let address = accounts.first().copied().ok_or_else(|| {
            ClientError::AuthorizationDenied("wallet returned no authorized accounts".to_string())
        })?;
        let network = self
            .wallet
            .network_id()
            .await
            .map_err(|err| err.into_read_error())?;

        {
            let mut state = self.state.write().await;
            state.address = Some(address);
            state.network = Some(network);
            state.is_privileged = false;
        }
        info!(account = %address.short(), %network, "wallet connected");

        self.recompute_privilege().await;
        let snapshot = self.snapshot().await;
        self.events.emit(ClientEvent::SessionChanged(snapshot));
        Ok(snapshot)
    }

    /// Pushed by the wallet. An empty list means the user disconnected every account.
    pub async fn on_accounts_changed(&self, accounts: &[Address]) -> SessionSnapshot {
        match accounts.first().copied() {
            None => {
                {
                    let mut state = self.state.write().await;
                    state.address = None;
                    state.is_privileged = false;
                }
                info!("wallet disconnected");
            }
            Some(address) => {
                {
                    let mut state = self.state.write().await;
                    state.address = Some(address);
                    state.is_privileged = false;
                }
                info!(account = %address.short(), "wallet account changed");
                self.recompute_privilege().await;
            }
        }

        let snapshot = self.snapshot().await;
        self.events.emit(ClientEvent::SessionChanged(snapshot));
        snapshot
    }

    pub async fn on_network_changed(&self, network: NetworkId) -> SessionSnapshot {
        let connected = {
            let mut state = self.state.write().await;
            state.network = Some(network);
            state.is_privileged = false;
            state.address.is_some()
        };
        info!(%network, "wallet network changed");
        if connected {
            self.recompute_privilege().await;
        }

        let snapshot = self.snapshot().await;
        self.events.emit(ClientEvent::SessionChanged(snapshot));
        snapshot
    }

    /// Reads the contract owner once and compares it with the connected account. If the
    /// account changed while the read was in flight the result is discarded; the change
    /// that superseded it runs its own recomputation.
    async fn recompute_privilege(&self) {
        let Some(address) = self.state.read().await.address else {
            return;
        };

        match self.gateway.owner().await {
            Ok(owner) => {
                let mut state = self.state.write().await;
                if state.address == Some(address) {
                    state.is_privileged = owner == address;
                    if state.is_privileged {
                        info!(account = %address.short(), "connected account is the contract owner");
                    }
                }
            }
            Err(err) => {
                warn!("failed to read contract owner: {err}");
                self.events.emit(ClientEvent::Error(err.payload()));
            }
        }
    }
}

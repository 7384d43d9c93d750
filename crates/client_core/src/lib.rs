use std::sync::{Arc, Mutex, PoisonError, Weak};

use shared::{
    domain::{Address, Amount, MarketSnapshot, TransactionIntent, ValidatorRecord},
    error::ClientError,
    protocol::{ClientCommand, ClientEvent, SessionSnapshot},
};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, info, warn};

pub mod abi;
pub mod event_bus;
pub mod gateway;
pub mod market_view;
pub mod orchestrator;
pub mod session;
pub mod wallet;

pub use event_bus::{EventBus, EventSubscription};
pub use gateway::{ContractGateway, TransactionHandle};
pub use market_view::{MarketView, RefreshScope};
pub use orchestrator::{TransactionOrchestrator, TransactionState};
pub use session::SessionManager;
pub use wallet::{MissingWalletProvider, TxReceipt, WalletError, WalletEvent, WalletProvider};

/// Entry point for the presentation layer. Owns the session, the market cache and the
/// transaction slot; the presentation layer only gets read views and events.
pub struct CarbonMarketClient {
    wallet: Arc<dyn WalletProvider>,
    events: Arc<EventBus>,
    session: Arc<SessionManager>,
    market: Arc<MarketView>,
    orchestrator: TransactionOrchestrator,
    wallet_listener: Mutex<Option<JoinHandle<()>>>,
}

impl CarbonMarketClient {
    pub fn new(wallet: Arc<dyn WalletProvider>, contract: Address) -> Arc<Self> {
        let events = Arc::new(EventBus::new());
        let gateway = Arc::new(ContractGateway::new(Arc::clone(&wallet), contract));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&wallet),
            Arc::clone(&gateway),
            Arc::clone(&events),
        ));
        let market = Arc::new(MarketView::new(Arc::clone(&gateway), Arc::clone(&events)));
        let orchestrator = TransactionOrchestrator::new(
            gateway,
            Arc::clone(&session),
            Arc::clone(&market),
            Arc::clone(&events),
        );
        Arc::new(Self {
            wallet,
            events,
            session,
            market,
            orchestrator,
            wallet_listener: Mutex::new(None),
        })
    }

    pub fn without_wallet(contract: Address) -> Arc<Self> {
        Self::new(Arc::new(MissingWalletProvider), contract)
    }

    pub fn subscribe_events(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub async fn session(&self) -> SessionSnapshot {
        self.session.snapshot().await
    }

    pub async fn market_snapshot(&self) -> Option<MarketSnapshot> {
        self.market.snapshot().await
    }

    pub async fn validator_record(&self) -> Option<ValidatorRecord> {
        self.market.validator().await
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.orchestrator.state()
    }

    pub async fn quote(&self, credits: u64) -> Option<Amount> {
        self.market.snapshot().await?.quote(credits)
    }

    /// Local rejections are returned to the caller and also surfaced as an error event.
    fn surface_local(&self, err: ClientError) -> ClientError {
        if err.is_local() {
            self.events.emit(ClientEvent::Error(err.payload()));
        }
        err
    }

    pub async fn connect(self: &Arc<Self>) -> Result<SessionSnapshot, ClientError> {
        let session = match self.session.connect().await {
            Ok(session) => session,
            Err(err) => {
                warn!("wallet connect failed: {err}");
                self.events.emit(ClientEvent::Error(err.payload()));
                return Err(err);
            }
        };
        self.start_wallet_listener();
        let _ = self.market.refresh_market().await;
        Ok(session)
    }

    pub async fn register_validator(
        &self,
        stake_display: &str,
        score: u64,
    ) -> Result<TxReceipt, ClientError> {
        self.orchestrator
            .ensure_idle()
            .map_err(|err| self.surface_local(err))?;
        let stake = if stake_display.trim().is_empty() {
            Err(ClientError::validation("Please fill in all fields"))
        } else {
            Amount::parse_display(stake_display).map_err(ClientError::from)
        }
        .map_err(|err| self.surface_local(err))?;
        self.write(TransactionIntent::RegisterValidator { stake, score })
            .await
    }

    pub async fn purchase_offset(&self, credits: u64) -> Result<TxReceipt, ClientError> {
        self.write(TransactionIntent::PurchaseOffset { credits })
            .await
    }

    pub async fn distribute_rewards(&self) -> Result<TxReceipt, ClientError> {
        self.write(TransactionIntent::DistributeRewards).await
    }

    async fn write(&self, intent: TransactionIntent) -> Result<TxReceipt, ClientError> {
        self.orchestrator
            .execute(intent)
            .await
            .map_err(|err| self.surface_local(err))
    }

    /// A blank address clears the cached record without contacting the contract.
    pub async fn fetch_validator_info(
        &self,
        raw_address: &str,
    ) -> Result<Option<ValidatorRecord>, ClientError> {
        self.market
            .refresh_validator(raw_address)
            .await
            .map_err(|err| self.surface_local(err))
    }

    pub async fn fetch_own_validator_info(&self) -> Result<ValidatorRecord, ClientError> {
        let address = self
            .session
            .snapshot()
            .await
            .address
            .ok_or_else(|| self.surface_local(ClientError::unauthorized("no connected account")))?;
        self.market.refresh_validator_address(address).await
    }

    /// Re-reads the market and, if one is cached, the displayed validator record.
    pub async fn refresh_all(&self) -> Result<MarketSnapshot, ClientError> {
        match self.market.validator().await {
            Some(record) => {
                let (market, _) = futures::join!(
                    self.market.refresh_market(),
                    self.market.refresh_validator_address(record.address)
                );
                market
            }
            None => self.market.refresh_market().await,
        }
    }

    pub async fn dispatch(self: &Arc<Self>, command: ClientCommand) -> Result<(), ClientError> {
        debug!(command = command.name(), "dispatching command");
        match command {
            ClientCommand::Connect => self.connect().await.map(drop),
            ClientCommand::RegisterValidator { stake, score } => {
                self.register_validator(&stake, score).await.map(drop)
            }
            ClientCommand::PurchaseOffset { credits } => {
                self.purchase_offset(credits).await.map(drop)
            }
            ClientCommand::FetchValidatorInfo { address } => {
                self.fetch_validator_info(&address).await.map(drop)
            }
            ClientCommand::FetchOwnValidatorInfo => {
                self.fetch_own_validator_info().await.map(drop)
            }
            ClientCommand::DistributeRewards => self.distribute_rewards().await.map(drop),
            ClientCommand::RefreshAll => self.refresh_all().await.map(drop),
        }
    }

    /// Applies one wallet push notification, then refreshes the market.
    pub async fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                self.session.on_accounts_changed(&accounts).await;
            }
            WalletEvent::NetworkChanged(network) => {
                self.session.on_network_changed(network).await;
            }
        }
        let _ = self.market.refresh_market().await;
    }

    fn start_wallet_listener(self: &Arc<Self>) {
        let mut listener = self
            .wallet_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let mut wallet_events = self.wallet.subscribe_events();
        let client: Weak<Self> = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            loop {
                match wallet_events.recv().await {
                    Ok(event) => {
                        let Some(client) = client.upgrade() else {
                            break;
                        };
                        client.handle_wallet_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "wallet notifications lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("wallet listener stopped");
        }));
    }
}

impl Drop for CarbonMarketClient {
    fn drop(&mut self) {
        if let Some(task) = self
            .wallet_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/fake_wallet.rs"]
pub(crate) mod fake_wallet;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::{
    domain::{Address, MarketSnapshot, ValidatorRecord},
    error::ClientError,
    protocol::ClientEvent,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    event_bus::EventBus,
    gateway::{parse_address, ContractGateway},
};

/// Which part of the market data a refresh re-reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    Full,
    /// Validator count, total stake and reward pool only. Falls back to `Full` when
    /// nothing is cached yet.
    NetworkStats,
}

pub struct MarketView {
    gateway: Arc<ContractGateway>,
    events: Arc<EventBus>,
    snapshot: RwLock<Option<MarketSnapshot>>,
    validator: RwLock<Option<ValidatorRecord>>,
    // Held for a whole refresh cycle; scoped refreshes read the cached offset under it.
    refresh_gate: Mutex<()>,
}

impl MarketView {
    pub fn new(gateway: Arc<ContractGateway>, events: Arc<EventBus>) -> Self {
        Self {
            gateway,
            events,
            snapshot: RwLock::new(None),
            validator: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Option<MarketSnapshot> {
        *self.snapshot.read().await
    }

    pub async fn validator(&self) -> Option<ValidatorRecord> {
        self.validator.read().await.clone()
    }

    pub async fn refresh_market(&self) -> Result<MarketSnapshot, ClientError> {
        self.refresh(RefreshScope::Full).await
    }

    /// All reads of one refresh run concurrently; the cached snapshot is replaced only if
    /// every one of them succeeded.
    pub async fn refresh(&self, scope: RefreshScope) -> Result<MarketSnapshot, ClientError> {
        let _cycle = self.refresh_gate.lock().await;
        let cached_offset = match scope {
            RefreshScope::Full => None,
            RefreshScope::NetworkStats => self.snapshot().await.map(|s| s.offset_info()),
        };

        let fetched = match cached_offset {
            Some(offset) => self
                .gateway
                .network_stats()
                .await
                .map(|stats| MarketSnapshot::from_parts(offset, stats)),
            None => futures::try_join!(
                self.gateway.get_carbon_offset_info(),
                self.gateway.network_stats()
            )
            .map(|(offset, stats)| MarketSnapshot::from_parts(offset, stats)),
        };

        match fetched {
            Ok(next) => {
                let mut slot = self.snapshot.write().await;
                *slot = Some(next);
                self.events.emit(ClientEvent::MarketUpdated(next));
                debug!(?scope, "market snapshot refreshed");
                Ok(next)
            }
            Err(err) => {
                warn!(?scope, "market refresh failed, keeping previous snapshot: {err}");
                self.events.emit(ClientEvent::Error(err.payload()));
                Err(err)
            }
        }
    }

    /// A blank address clears the cached record without any remote call.
    pub async fn refresh_validator(
        &self,
        raw_address: &str,
    ) -> Result<Option<ValidatorRecord>, ClientError> {
        if raw_address.trim().is_empty() {
            self.clear_validator().await;
            return Ok(None);
        }
        let address = parse_address(raw_address)?;
        self.refresh_validator_address(address).await.map(Some)
    }

    pub async fn refresh_validator_address(
        &self,
        address: Address,
    ) -> Result<ValidatorRecord, ClientError> {
        match self.gateway.get_validator_info(address).await {
            Ok(record) => {
                let mut slot = self.validator.write().await;
                *slot = Some(record.clone());
                self.events
                    .emit(ClientEvent::ValidatorUpdated(Some(record.clone())));
                Ok(record)
            }
            Err(err) => {
                warn!(validator = %address.short(), "validator fetch failed: {err}");
                self.events.emit(ClientEvent::Error(err.payload()));
                Err(err)
            }
        }
    }

    pub async fn clear_validator(&self) {
        let mut slot = self.validator.write().await;
        *slot = None;
        self.events.emit(ClientEvent::ValidatorUpdated(None));
    }
}

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use shared::{
    domain::{Address, Amount, IntentKind, TransactionIntent},
    error::{ClientError, ErrorPayload},
    protocol::{ClientEvent, TransactionPhase, TransactionUpdate},
};
use tracing::{error, info, warn};

use crate::{
    event_bus::EventBus,
    gateway::{ContractGateway, TransactionHandle},
    market_view::{MarketView, RefreshScope},
    session::SessionManager,
    wallet::TxReceipt,
};

pub const MIN_EFFICIENCY_SCORE: u64 = 50;
pub const MAX_EFFICIENCY_SCORE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    Submitting {
        kind: IntentKind,
    },
    Pending {
        kind: IntentKind,
        handle: TransactionHandle,
    },
    Confirmed {
        kind: IntentKind,
        receipt: TxReceipt,
    },
    Failed {
        kind: IntentKind,
        reason: ErrorPayload,
    },
}

impl TransactionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Local checks that must pass before a write may enter `Submitting`.
pub fn validate_intent(intent: &TransactionIntent) -> Result<(), ClientError> {
    match *intent {
        TransactionIntent::RegisterValidator { stake, score } => {
            if stake < Amount::ONE {
                return Err(ClientError::validation("Minimum stake amount is 1 ETH"));
            }
            if !(MIN_EFFICIENCY_SCORE..=MAX_EFFICIENCY_SCORE).contains(&score) {
                return Err(ClientError::validation(
                    "Energy efficiency score must be between 50 and 100",
                ));
            }
            Ok(())
        }
        TransactionIntent::PurchaseOffset { credits } => {
            if credits == 0 {
                return Err(ClientError::validation("Please enter a valid credit amount"));
            }
            Ok(())
        }
        TransactionIntent::DistributeRewards => Ok(()),
    }
}

/// Owns the non-idle slot for the duration of one write and returns it to `Idle` when
/// dropped, whichever way the write ended.
struct SlotGuard {
    driver: Arc<WriteDriver>,
}

impl SlotGuard {
    fn set(&self, state: TransactionState) {
        *self
            .driver
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.set(TransactionState::Idle);
    }
}

struct WriteDriver {
    gateway: Arc<ContractGateway>,
    market: Arc<MarketView>,
    events: Arc<EventBus>,
    slot: Mutex<TransactionState>,
}

/// Single-slot lifecycle of contract writes:
/// `Idle -> Submitting -> Pending -> Confirmed | Failed -> Idle`.
pub struct TransactionOrchestrator {
    session: Arc<SessionManager>,
    driver: Arc<WriteDriver>,
}

impl TransactionOrchestrator {
    pub fn new(
        gateway: Arc<ContractGateway>,
        session: Arc<SessionManager>,
        market: Arc<MarketView>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            session,
            driver: Arc::new(WriteDriver {
                gateway,
                market,
                events,
                slot: Mutex::new(TransactionState::Idle),
            }),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.driver
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ensure_idle(&self) -> Result<(), ClientError> {
        if self.state().is_idle() {
            Ok(())
        } else {
            Err(ClientError::Busy)
        }
    }

    fn claim(&self, kind: IntentKind) -> Result<SlotGuard, ClientError> {
        let mut state = self
            .driver
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.is_idle() {
            return Err(ClientError::Busy);
        }
        *state = TransactionState::Submitting { kind };
        Ok(SlotGuard {
            driver: Arc::clone(&self.driver),
        })
    }

    async fn authorize(&self, intent: &TransactionIntent) -> Result<Address, ClientError> {
        let session = self.session.snapshot().await;
        let from = session
            .address
            .ok_or_else(|| ClientError::unauthorized("no connected account"))?;
        if matches!(intent, TransactionIntent::DistributeRewards) && !session.is_privileged {
            return Err(ClientError::unauthorized(
                "Only the contract owner can distribute rewards",
            ));
        }
        Ok(from)
    }

    /// Drives one write to a terminal state. Local rejections (`Busy`, validation,
    /// `Unauthorized`) return before the slot is claimed and leave it untouched.
    ///
    /// Once claimed, the write runs on its own task: a caller that stops waiting does not
    /// release the slot while the transaction is still in flight.
    pub async fn execute(&self, intent: TransactionIntent) -> Result<TxReceipt, ClientError> {
        self.ensure_idle()?;
        validate_intent(&intent)?;
        let from = self.authorize(&intent).await?;

        let guard = self.claim(intent.kind())?;
        let driver = Arc::clone(&self.driver);
        tokio::spawn(async move { driver.drive(guard, from, intent).await })
            .await
            .map_err(|err| {
                error!("transaction task aborted: {err}");
                ClientError::Unknown(format!("transaction task aborted: {err}"))
            })?
    }
}

impl WriteDriver {
    fn publish(&self, kind: IntentKind, description: String, phase: TransactionPhase) {
        self.events
            .emit(ClientEvent::TransactionLifecycle(TransactionUpdate {
                kind,
                description,
                phase,
                at: Utc::now(),
            }));
    }

    async fn drive(
        &self,
        guard: SlotGuard,
        from: Address,
        intent: TransactionIntent,
    ) -> Result<TxReceipt, ClientError> {
        let kind = intent.kind();
        info!(?kind, account = %from.short(), "transaction submitting");
        self.publish(
            kind,
            kind.pending_message().to_string(),
            TransactionPhase::Submitting,
        );

        let handle = match self.submit(from, intent).await {
            Ok(handle) => handle,
            Err(err) => return Err(self.fail(&guard, kind, err)),
        };

        guard.set(TransactionState::Pending { kind, handle });
        info!(?kind, tx_hash = %handle.tx_hash, "transaction pending");
        self.publish(
            kind,
            kind.pending_message().to_string(),
            TransactionPhase::Pending {
                tx_hash: handle.tx_hash.to_string(),
            },
        );

        let receipt = match self.gateway.await_finality(handle).await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(&guard, kind, err)),
        };

        self.refresh_after(kind, from).await;

        guard.set(TransactionState::Confirmed {
            kind,
            receipt: receipt.clone(),
        });
        info!(?kind, tx_hash = %receipt.tx_hash, "transaction confirmed");
        self.publish(
            kind,
            kind.confirmed_message().to_string(),
            TransactionPhase::Confirmed {
                tx_hash: receipt.tx_hash.to_string(),
            },
        );
        Ok(receipt)
    }

    async fn submit(
        &self,
        from: Address,
        intent: TransactionIntent,
    ) -> Result<TransactionHandle, ClientError> {
        match intent {
            TransactionIntent::RegisterValidator { stake, score } => {
                self.gateway.register_validator(from, score, stake).await
            }
            TransactionIntent::PurchaseOffset { credits } => {
                // Pay the live price, not whatever the cached snapshot last saw.
                let offset = self.gateway.get_carbon_offset_info().await?;
                let value = offset
                    .price_per_credit
                    .checked_mul(u128::from(credits))
                    .ok_or_else(|| ClientError::Unknown("purchase cost overflows".into()))?;
                info!(credits, cost = %value, "purchase priced");
                self.gateway
                    .purchase_carbon_offset(from, credits, value)
                    .await
            }
            TransactionIntent::DistributeRewards => {
                self.gateway.distribute_sustainability_rewards(from).await
            }
        }
    }

    /// Re-reads whatever the confirmed write could have changed. Refresh failures are
    /// already surfaced as error events and do not fail the transaction.
    async fn refresh_after(&self, kind: IntentKind, from: Address) {
        match kind {
            IntentKind::RegisterValidator => {
                let _ = futures::join!(
                    self.market.refresh_validator_address(from),
                    self.market.refresh(RefreshScope::NetworkStats)
                );
            }
            IntentKind::PurchaseOffset => {
                let _ = self.market.refresh(RefreshScope::Full).await;
            }
            IntentKind::DistributeRewards => {
                let _ = self.market.refresh(RefreshScope::NetworkStats).await;
            }
        }
    }

    fn fail(&self, guard: &SlotGuard, kind: IntentKind, err: ClientError) -> ClientError {
        let reason = err.payload();
        warn!(?kind, code = ?reason.code, "transaction failed: {}", reason.message);
        guard.set(TransactionState::Failed {
            kind,
            reason: reason.clone(),
        });
        self.publish(
            kind,
            format!("{}: {}", kind.failure_prefix(), reason.message),
            TransactionPhase::Failed { reason },
        );
        err
    }
}

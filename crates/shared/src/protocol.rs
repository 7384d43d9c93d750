use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Address, IntentKind, MarketSnapshot, NetworkId, ValidatorRecord},
    error::ErrorPayload,
};

/// Read view of the wallet session handed to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkId>,
    pub is_privileged: bool,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn status_line(&self) -> String {
        match self.address {
            Some(address) => format!("Connected: {}", address.short()),
            None => "Not Connected".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TransactionPhase {
    Submitting,
    Pending { tx_hash: String },
    Confirmed { tx_hash: String },
    Failed { reason: ErrorPayload },
}

impl TransactionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub kind: IntentKind,
    pub description: String,
    #[serde(flatten)]
    pub phase: TransactionPhase,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    SessionChanged(SessionSnapshot),
    MarketUpdated(MarketSnapshot),
    ValidatorUpdated(Option<ValidatorRecord>),
    TransactionLifecycle(TransactionUpdate),
    Error(ErrorPayload),
}

/// Commands issued by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    Connect,
    RegisterValidator { stake: String, score: u64 },
    PurchaseOffset { credits: u64 },
    FetchValidatorInfo { address: String },
    FetchOwnValidatorInfo,
    DistributeRewards,
    RefreshAll,
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::RegisterValidator { .. } => "register_validator",
            Self::PurchaseOffset { .. } => "purchase_offset",
            Self::FetchValidatorInfo { .. } => "fetch_validator_info",
            Self::FetchOwnValidatorInfo => "fetch_own_validator_info",
            Self::DistributeRewards => "distribute_rewards",
            Self::RefreshAll => "refresh_all",
        }
    }
}

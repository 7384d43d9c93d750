use async_trait::async_trait;
use shared::{
    domain::{Address, Amount, NetworkId, TxHash},
    error::ClientError,
};
use thiserror::Error;
use tokio::sync::broadcast;

/// EIP-1193 code for a request the user declined in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet provider unavailable")]
    Unavailable,
    #[error("user rejected the request")]
    UserRejected,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl WalletError {
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            Self::UserRejected
        } else {
            Self::Rpc {
                code,
                message: message.into(),
            }
        }
    }

    pub fn into_connect_error(self) -> ClientError {
        let message = self.to_string();
        match self {
            Self::Unavailable => ClientError::ProviderUnavailable,
            Self::UserRejected => ClientError::AuthorizationDenied(message),
            Self::Transport(_) => ClientError::RemoteUnavailable(message),
            Self::Rpc { .. } => ClientError::Unknown(message),
        }
    }

    /// Reads are side-effect free, so every provider failure is reported as unavailability.
    pub fn into_read_error(self) -> ClientError {
        ClientError::RemoteUnavailable(self.to_string())
    }

    pub fn into_write_error(self) -> ClientError {
        let display = self.to_string();
        match self {
            Self::Unavailable => ClientError::ProviderUnavailable,
            Self::Transport(_) => ClientError::RemoteUnavailable(display),
            Self::UserRejected => ClientError::RemoteRejected(display),
            Self::Rpc { message, .. } => ClientError::RemoteRejected(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: Amount,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    NetworkChanged(NetworkId),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;
    async fn network_id(&self) -> Result<NetworkId, WalletError>;
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, WalletError>;
    /// Signs and submits; resolves once the network accepted the transaction into its
    /// pending pool.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, WalletError>;
    /// Resolves once the transaction is final, whether it succeeded or reverted.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, WalletError>;
    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent>;
}

pub struct MissingWalletProvider;

#[async_trait]
impl WalletProvider for MissingWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn call(&self, _request: CallRequest) -> Result<Vec<u8>, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn send_transaction(&self, _request: TransactionRequest) -> Result<TxHash, WalletError> {
        Err(WalletError::Unavailable)
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<TxReceipt, WalletError> {
        Err(WalletError::Unavailable)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
        broadcast::channel(1).1
    }
}

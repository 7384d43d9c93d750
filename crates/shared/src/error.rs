use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AddressError, AmountError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProviderUnavailable,
    AuthorizationDenied,
    InvalidAddress,
    Validation,
    Unauthorized,
    Busy,
    RemoteUnavailable,
    RemoteRejected,
    Unknown,
}

/// Display-safe error form carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("no wallet provider available; install or configure a wallet")]
    ProviderUnavailable,
    #[error("wallet authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("another transaction is still in flight")]
    Busy,
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("{0}")]
    RemoteRejected(String),
    #[error("{0}")]
    Unknown(String),
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProviderUnavailable => ErrorCode::ProviderUnavailable,
            Self::AuthorizationDenied(_) => ErrorCode::AuthorizationDenied,
            Self::InvalidAddress(_) => ErrorCode::InvalidAddress,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Busy => ErrorCode::Busy,
            Self::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            Self::RemoteRejected(_) => ErrorCode::RemoteRejected,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// True for failures raised before anything reached the remote service.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_) | Self::Validation(_) | Self::Unauthorized(_) | Self::Busy
        )
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.code(), self.to_string())
    }
}

impl From<AddressError> for ClientError {
    fn from(value: AddressError) -> Self {
        Self::InvalidAddress(value.to_string())
    }
}

impl From<AmountError> for ClientError {
    fn from(value: AmountError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<&ClientError> for ErrorPayload {
    fn from(value: &ClientError) -> Self {
        value.payload()
    }
}

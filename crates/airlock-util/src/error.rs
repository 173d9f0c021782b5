//! Error types for airlockd

use thiserror::Error;

/// Core error type for airlock session operations
#[derive(Debug, Error)]
pub enum AirlockError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Session already active")]
    SessionAlreadyActive,

    /// Raised when a session directory could not be isolated.
    /// A directory in this state is never handed out.
    #[error("Security policy enforcement failed: {0}")]
    SecurityPolicy(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AirlockError {
    pub fn security_policy(msg: impl Into<String>) -> Self {
        Self::SecurityPolicy(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors raised because a precondition on session state failed
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoActiveSession | Self::SessionAlreadyActive)
    }
}

pub type Result<T> = std::result::Result<T, AirlockError>;

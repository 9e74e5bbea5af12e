use thiserror::Error;

use consensus_decisions::DecisionError;
use consensus_staking::StakingError;
use consensus_store::StoreError;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket server error: {0}")]
    WebSocket(String),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

impl NodeError {
    /// Stable machine-readable code for API responses and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            NodeError::Staking(e) => e.code(),
            NodeError::Decision(e) => e.code(),
            NodeError::Registry(e) => e.code(),
            NodeError::Store(StoreError::NotFound(_)) => "not_found",
            NodeError::Store(_) => "store_error",
            NodeError::Config(_) => "config_error",
            NodeError::Snapshot(_) => "snapshot_error",
            NodeError::Io(_) => "io_error",
            NodeError::WebSocket(_) => "websocket_error",
            NodeError::ShutdownTimeout => "shutdown_timeout",
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            NodeError::Staking(e) => e.is_retriable(),
            NodeError::Decision(e) => e.is_retriable(),
            _ => false,
        }
    }

    /// Caller-correctable rejection, as opposed to an internal failure.
    pub fn is_precondition(&self) -> bool {
        match self {
            NodeError::Staking(e) => e.is_precondition(),
            NodeError::Decision(_) | NodeError::Registry(_) => true,
            NodeError::Store(StoreError::NotFound(_)) => true,
            _ => false,
        }
    }
}

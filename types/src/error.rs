//! Parsing errors for the shared types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid agent address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("content reference must not be empty")]
    EmptyContentRef,
}

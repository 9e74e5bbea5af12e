//! HTTP API for the consensus node.
//!
//! Provides endpoints for:
//! - Agent registration and lookup
//! - Claim submission, the claim feed and verification rounds
//! - Stake-backed votes and round resolution
//! - Decision requests and answers
//! - Withdrawable balances
//! - Engine parameters, health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::{RpcServer, RpcState};

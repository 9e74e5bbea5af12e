//! Consensus node: orchestrates the staking and decision engines.
//!
//! The node is the central coordinator that:
//! - Hosts the agent registry and the claim ledger the engines consult
//! - Serialises access to the round and decision engines
//! - Fans engine events out to WebSocket subscribers and metrics
//! - Optionally sweeps expired rounds and decision requests
//! - Persists and restores a whole-state snapshot

pub mod claims;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod node;
pub mod persistence;
pub mod registry;
pub mod shutdown;

pub use claims::ClaimLedger;
pub use config::NodeConfig;
pub use error::NodeError;
pub use events::EventBus;
pub use metrics::NodeMetrics;
pub use node::{ConsensusNode, SweepReport};
pub use persistence::{state_digest, NodeSnapshot};
pub use registry::{AgentRegistry, RegistryError, RegistrySnapshot};
pub use shutdown::{ShutdownController, ShutdownListener};

//! Fundamental types for the Consensus staking engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! agent addresses, wei amounts, timestamps and clocks, claim and decision
//! identifiers, engine parameters, outcomes, and the typed events the engine emits.

pub mod address;
pub mod agent;
pub mod amount;
pub mod claim;
pub mod error;
pub mod event;
pub mod ids;
pub mod outcome;
pub mod params;
pub mod time;

pub use address::AgentAddress;
pub use agent::Agent;
pub use amount::{Wei, WEI_PER_ETHER};
pub use claim::{Category, Claim, ContentRef};
pub use error::TypeError;
pub use event::{EngineEvent, EventKind};
pub use ids::{ClaimId, DecisionId};
pub use outcome::Outcome;
pub use params::EngineParams;
pub use time::{Clock, SystemClock, Timestamp};

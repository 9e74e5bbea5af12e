//! Identity directory capabilities.

use crate::ReputationError;
use consensus_types::{Agent, AgentAddress};

/// Read side of the identity directory: who is a registered agent.
pub trait IdentityDirectory: Send + Sync {
    fn is_registered(&self, address: &AgentAddress) -> bool;

    /// Full agent record, if the directory knows the address.
    fn get_agent(&self, address: &AgentAddress) -> Option<Agent>;
}

/// Write capability for reputation. Injected into settlement so the engine
/// can be exercised without a real identity service.
///
/// Implementations must apply a delta at most once per successful call; a
/// returned error means nothing was applied.
pub trait ReputationAdjuster: Send + Sync {
    fn adjust_reputation(&self, address: &AgentAddress, delta: i64) -> Result<(), ReputationError>;
}

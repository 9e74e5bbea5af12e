//! Agent records as held by the identity directory.

use crate::address::AgentAddress;
use serde::{Deserialize, Serialize};

/// A registered agent. The engine only reads `registered` and pushes
/// reputation deltas; the record itself belongs to the identity directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub address: AgentAddress,
    /// Free-form identifier chosen at registration, typically a 32-byte hex id.
    pub agent_id: String,
    pub reputation_score: u64,
    pub registered: bool,
}

impl Agent {
    /// Apply a signed reputation delta, saturating at zero.
    pub fn apply_delta(&mut self, delta: i64) {
        self.reputation_score = if delta >= 0 {
            self.reputation_score.saturating_add(delta.unsigned_abs())
        } else {
            self.reputation_score.saturating_sub(delta.unsigned_abs())
        };
    }
}

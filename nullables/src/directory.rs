//! Nullable identity directory with a switchable outage.

use consensus_store::{IdentityDirectory, ReputationAdjuster, ReputationError};
use consensus_types::{Agent, AgentAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory identity directory for tests.
///
/// `set_unavailable(true)` makes every reputation adjustment fail with
/// [`ReputationError::Unavailable`] without touching any record, which is how
/// tests exercise the deferred-reputation path.
#[derive(Default)]
pub struct NullDirectory {
    agents: Mutex<HashMap<AgentAddress, Agent>>,
    adjustments: Mutex<Vec<(AgentAddress, i64)>>,
    unavailable: AtomicBool,
}

impl NullDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent with zero reputation.
    pub fn register(&self, address: &AgentAddress) {
        self.agents.lock().unwrap().insert(
            address.clone(),
            Agent {
                address: address.clone(),
                agent_id: format!("agent-{}", address),
                reputation_score: 0,
                registered: true,
            },
        );
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current reputation of an agent (0 for unknown agents).
    pub fn reputation(&self, address: &AgentAddress) -> u64 {
        self.agents
            .lock()
            .unwrap()
            .get(address)
            .map(|a| a.reputation_score)
            .unwrap_or(0)
    }

    /// Every successfully applied adjustment, in order.
    pub fn adjustments(&self) -> Vec<(AgentAddress, i64)> {
        self.adjustments.lock().unwrap().clone()
    }
}

impl IdentityDirectory for NullDirectory {
    fn is_registered(&self, address: &AgentAddress) -> bool {
        self.agents
            .lock()
            .unwrap()
            .get(address)
            .is_some_and(|a| a.registered)
    }

    fn get_agent(&self, address: &AgentAddress) -> Option<Agent> {
        self.agents.lock().unwrap().get(address).cloned()
    }
}

impl ReputationAdjuster for NullDirectory {
    fn adjust_reputation(&self, address: &AgentAddress, delta: i64) -> Result<(), ReputationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReputationError::Unavailable("null directory offline".into()));
        }
        let mut agents = self.agents.lock().unwrap();
        let agent = agents
            .get_mut(address)
            .ok_or_else(|| ReputationError::UnknownAgent(address.to_string()))?;
        agent.apply_delta(delta);
        self.adjustments.lock().unwrap().push((address.clone(), delta));
        Ok(())
    }
}

//! In-memory agent registry backing the identity directory capabilities.

use consensus_store::{IdentityDirectory, ReputationAdjuster, ReputationError};
use consensus_types::{Agent, AgentAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("agent {0} is already registered")]
    AlreadyRegistered(AgentAddress),

    #[error("agent {0} is not registered")]
    UnknownAgent(AgentAddress),

    #[error("agent id must not be empty")]
    EmptyAgentId,
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered(_) => "already_registered",
            RegistryError::UnknownAgent(_) => "unknown_agent",
            RegistryError::EmptyAgentId => "empty_agent_id",
        }
    }
}

/// Registered agents keyed by address. Reputation starts at zero and only
/// changes through [`ReputationAdjuster`].
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<AgentAddress, Agent>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_agent(
        &self,
        address: &AgentAddress,
        agent_id: &str,
    ) -> Result<Agent, RegistryError> {
        if agent_id.trim().is_empty() {
            return Err(RegistryError::EmptyAgentId);
        }
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.contains_key(address) {
            return Err(RegistryError::AlreadyRegistered(address.clone()));
        }
        let agent = Agent {
            address: address.clone(),
            agent_id: agent_id.to_string(),
            reputation_score: 0,
            registered: true,
        };
        agents.insert(address.clone(), agent.clone());
        tracing::info!(address = %address, agent_id, "agent registered");
        Ok(agent)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            agents: agents.values().cloned().collect(),
        }
    }

    pub fn restore(snapshot: RegistrySnapshot) -> Self {
        let agents = snapshot
            .agents
            .into_iter()
            .map(|agent| (agent.address.clone(), agent))
            .collect();
        Self {
            agents: RwLock::new(agents),
        }
    }
}

impl IdentityDirectory for AgentRegistry {
    fn is_registered(&self, address: &AgentAddress) -> bool {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .is_some_and(|a| a.registered)
    }

    fn get_agent(&self, address: &AgentAddress) -> Option<Agent> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }
}

impl ReputationAdjuster for AgentRegistry {
    fn adjust_reputation(&self, address: &AgentAddress, delta: i64) -> Result<(), ReputationError> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        let agent = agents
            .get_mut(address)
            .ok_or_else(|| ReputationError::UnknownAgent(address.to_string()))?;
        agent.apply_delta(delta);
        tracing::debug!(address = %address, delta, score = agent.reputation_score, "reputation adjusted");
        Ok(())
    }
}

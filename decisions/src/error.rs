use consensus_types::{AgentAddress, DecisionId, Timestamp};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("unknown decision request {0}")]
    UnknownDecision(DecisionId),

    #[error("agent {0} is not registered")]
    NotRegistered(AgentAddress),

    #[error("{0} is already resolved")]
    AlreadyResolved(DecisionId),

    #[error("answers to {decision_id} closed at {end_time}")]
    VotingClosed {
        decision_id: DecisionId,
        end_time: Timestamp,
    },

    #[error("{agent} has already answered {decision_id}")]
    AlreadyAnswered {
        decision_id: DecisionId,
        agent: AgentAddress,
    },

    #[error("{decision_id} cannot be resolved before {end_time}")]
    TooEarly {
        decision_id: DecisionId,
        end_time: Timestamp,
    },
}

impl DecisionError {
    pub fn code(&self) -> &'static str {
        match self {
            DecisionError::UnknownDecision(_) => "unknown_decision",
            DecisionError::NotRegistered(_) => "not_registered",
            DecisionError::AlreadyResolved(_) => "already_resolved",
            DecisionError::VotingClosed { .. } => "voting_closed",
            DecisionError::AlreadyAnswered { .. } => "already_answered",
            DecisionError::TooEarly { .. } => "too_early",
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, DecisionError::TooEarly { .. })
    }
}

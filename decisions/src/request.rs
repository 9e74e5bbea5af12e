//! Decision request state.

use consensus_types::{AgentAddress, ContentRef, DecisionId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub agent: AgentAddress,
    pub answer_ref: ContentRef,
    pub submitted_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub id: DecisionId,
    pub question_ref: ContentRef,
    pub created_at: Timestamp,
    pub end_time: Timestamp,
    pub resolved: bool,
    /// One entry per agent, in submission order.
    pub answers: Vec<Answer>,
    /// Chosen at resolution; `None` if nobody answered.
    pub accepted: Option<Answer>,
}

impl DecisionRequest {
    pub fn open(id: DecisionId, question_ref: ContentRef, now: Timestamp, period_secs: u64) -> Self {
        Self {
            id,
            question_ref,
            created_at: now,
            end_time: now.plus_secs(period_secs),
            resolved: false,
            answers: Vec::new(),
            accepted: None,
        }
    }

    pub fn has_answered(&self, agent: &AgentAddress) -> bool {
        self.answers.iter().any(|a| &a.agent == agent)
    }

    pub fn answer_of(&self, agent: &AgentAddress) -> Option<&Answer> {
        self.answers.iter().find(|a| &a.agent == agent)
    }

    pub fn is_resolvable(&self, now: Timestamp) -> bool {
        !self.resolved && now >= self.end_time
    }
}

/// Summary returned by a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResolution {
    pub decision_id: DecisionId,
    pub accepted: Option<Answer>,
    pub participants: u32,
    /// Name of the policy that picked the answer.
    pub policy: String,
}

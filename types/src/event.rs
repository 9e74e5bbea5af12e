//! Typed notifications emitted by the engines for external watchers.
//!
//! Agents never get called by the engine; they subscribe to these events (or
//! poll the read API) and react in their own process.

use crate::address::AgentAddress;
use crate::amount::Wei;
use crate::claim::{Category, ContentRef};
use crate::ids::{ClaimId, DecisionId};
use crate::outcome::Outcome;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A claim was stored and its verification round opened.
    ClaimSubmitted {
        claim_id: ClaimId,
        author: AgentAddress,
        content_ref: ContentRef,
        category: Category,
        fee: Wei,
        end_time: Timestamp,
    },
    /// A stake-backed vote was accepted.
    VoteCast {
        claim_id: ClaimId,
        voter: AgentAddress,
        support: bool,
        amount: Wei,
    },
    /// A round was settled.
    RoundResolved {
        claim_id: ClaimId,
        outcome: Outcome,
        total_valid_stake: Wei,
        total_invalid_stake: Wei,
        remainder: Wei,
    },
    /// A reputation adjustment could not be delivered and was queued for retry.
    ReputationDeferred { agent: AgentAddress, delta: i64 },
    /// A decision request opened for answers.
    DecisionPosted {
        decision_id: DecisionId,
        question_ref: ContentRef,
        end_time: Timestamp,
    },
    /// An agent answered a decision request.
    AnswerSubmitted {
        decision_id: DecisionId,
        agent: AgentAddress,
        answer_ref: ContentRef,
    },
    /// A decision request closed.
    DecisionResolved {
        decision_id: DecisionId,
        accepted_agent: Option<AgentAddress>,
        accepted_answer: Option<ContentRef>,
        participants: u32,
    },
}

/// Coarse topic an event belongs to, used for subscription routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Claims,
    Votes,
    Rounds,
    Decisions,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Claims => "claims",
            EventKind::Votes => "votes",
            EventKind::Rounds => "rounds",
            EventKind::Decisions => "decisions",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::ClaimSubmitted { .. } => EventKind::Claims,
            EngineEvent::VoteCast { .. } => EventKind::Votes,
            EngineEvent::RoundResolved { .. } | EngineEvent::ReputationDeferred { .. } => {
                EventKind::Rounds
            }
            EngineEvent::DecisionPosted { .. }
            | EngineEvent::AnswerSubmitted { .. }
            | EngineEvent::DecisionResolved { .. } => EventKind::Decisions,
        }
    }

    /// Snake-case event name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::ClaimSubmitted { .. } => "claim_submitted",
            EngineEvent::VoteCast { .. } => "vote_cast",
            EngineEvent::RoundResolved { .. } => "round_resolved",
            EngineEvent::ReputationDeferred { .. } => "reputation_deferred",
            EngineEvent::DecisionPosted { .. } => "decision_posted",
            EngineEvent::AnswerSubmitted { .. } => "answer_submitted",
            EngineEvent::DecisionResolved { .. } => "decision_resolved",
        }
    }

    /// The agent directly named by this event, if any.
    pub fn agent(&self) -> Option<&AgentAddress> {
        match self {
            EngineEvent::ClaimSubmitted { author, .. } => Some(author),
            EngineEvent::VoteCast { voter, .. } => Some(voter),
            EngineEvent::ReputationDeferred { agent, .. } => Some(agent),
            EngineEvent::AnswerSubmitted { agent, .. } => Some(agent),
            EngineEvent::DecisionResolved { accepted_agent, .. } => accepted_agent.as_ref(),
            EngineEvent::RoundResolved { .. } | EngineEvent::DecisionPosted { .. } => None,
        }
    }
}

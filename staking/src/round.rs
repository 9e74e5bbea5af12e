//! Per-claim round state.

use consensus_types::{AgentAddress, ClaimId, Outcome, Timestamp, Wei};
use serde::{Deserialize, Serialize};

/// Bookkeeping for the single verification round attached to a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRound {
    pub claim_id: ClaimId,
    pub author: AgentAddress,
    /// Entry fee escrowed at submission.
    pub entry_fee: Wei,
    pub total_valid_stake: Wei,
    pub total_invalid_stake: Wei,
    pub valid_votes: u32,
    pub invalid_votes: u32,
    pub created_at: Timestamp,
    /// Votes are accepted strictly before this instant; resolution at or after it.
    pub end_time: Timestamp,
    pub resolved: bool,
    /// Set together with `resolved`.
    pub outcome: Option<Outcome>,
}

/// Where a round is in its lifecycle relative to a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Accepting votes.
    Open,
    /// Window elapsed, waiting for someone to resolve it.
    AwaitingResolution,
    Resolved,
}

impl VerificationRound {
    pub fn open(
        claim_id: ClaimId,
        author: AgentAddress,
        entry_fee: Wei,
        created_at: Timestamp,
        voting_period_secs: u64,
    ) -> Self {
        Self {
            claim_id,
            author,
            entry_fee,
            total_valid_stake: Wei::ZERO,
            total_invalid_stake: Wei::ZERO,
            valid_votes: 0,
            invalid_votes: 0,
            created_at,
            end_time: created_at.plus_secs(voting_period_secs),
            resolved: false,
            outcome: None,
        }
    }

    pub fn phase(&self, now: Timestamp) -> RoundPhase {
        if self.resolved {
            RoundPhase::Resolved
        } else if now < self.end_time {
            RoundPhase::Open
        } else {
            RoundPhase::AwaitingResolution
        }
    }

    pub fn accepts_votes(&self, now: Timestamp) -> bool {
        self.phase(now) == RoundPhase::Open
    }

    pub fn is_resolvable(&self, now: Timestamp) -> bool {
        self.phase(now) == RoundPhase::AwaitingResolution
    }

    /// Everything currently escrowed for this round.
    pub fn total_contributed(&self) -> Wei {
        self.entry_fee + self.total_valid_stake + self.total_invalid_stake
    }
}

/// A stake-backed vote. At most one per (claim, voter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub claim_id: ClaimId,
    pub voter: AgentAddress,
    /// `true` backs the claim as valid.
    pub support: bool,
    pub amount: Wei,
    pub cast_at: Timestamp,
}

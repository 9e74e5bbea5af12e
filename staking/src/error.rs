use consensus_store::StoreError;
use consensus_types::{AgentAddress, ClaimId, Timestamp, Wei};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    #[error("agent {0} is not registered")]
    NotRegistered(AgentAddress),

    #[error("incorrect entry fee: expected {expected}, paid {paid}")]
    IncorrectFee { expected: Wei, paid: Wei },

    #[error("authors cannot vote on their own claim")]
    SelfVoteForbidden,

    #[error("voting on {claim_id} closed at {end_time}")]
    VotingClosed { claim_id: ClaimId, end_time: Timestamp },

    #[error("{0} is already resolved")]
    AlreadyResolved(ClaimId),

    #[error("{voter} has already voted on {claim_id}")]
    DuplicateVote { claim_id: ClaimId, voter: AgentAddress },

    #[error("stake too low: minimum {min}, provided {provided}")]
    StakeTooLow { min: Wei, provided: Wei },

    #[error("{claim_id} cannot be resolved before {end_time}")]
    TooEarly { claim_id: ClaimId, end_time: Timestamp },

    #[error("unknown claim {0}")]
    UnknownClaim(ClaimId),

    #[error("amount would overflow the funds held by the engine")]
    AmountOverflow,

    #[error("nothing to withdraw for {0}")]
    NothingToWithdraw(AgentAddress),

    #[error("claim store error: {0}")]
    Store(#[from] StoreError),
}

impl StakingError {
    /// Stable machine-readable code, used on the wire and in metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            StakingError::NotRegistered(_) => "not_registered",
            StakingError::IncorrectFee { .. } => "incorrect_fee",
            StakingError::SelfVoteForbidden => "self_vote_forbidden",
            StakingError::VotingClosed { .. } => "voting_closed",
            StakingError::AlreadyResolved(_) => "already_resolved",
            StakingError::DuplicateVote { .. } => "duplicate_vote",
            StakingError::StakeTooLow { .. } => "stake_too_low",
            StakingError::TooEarly { .. } => "too_early",
            StakingError::UnknownClaim(_) => "unknown_claim",
            StakingError::AmountOverflow => "amount_overflow",
            StakingError::NothingToWithdraw(_) => "nothing_to_withdraw",
            StakingError::Store(_) => "store_error",
        }
    }

    /// True when the same call may succeed later without changing its input.
    pub fn is_retriable(&self) -> bool {
        matches!(self, StakingError::TooEarly { .. })
    }

    /// Caller-correctable rejection (as opposed to a collaborator failure).
    pub fn is_precondition(&self) -> bool {
        !matches!(self, StakingError::Store(_))
    }
}

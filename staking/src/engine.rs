//! Round engine: the state machine behind submit / vote / resolve.
//!
//! All state is key-addressed by [`ClaimId`] and owned here. Every mutating
//! method checks all of its preconditions before touching anything, so a
//! rejected call leaves the engine exactly as it was.

use crate::error::StakingError;
use crate::escrow::FundsLedger;
use crate::reputation::ReputationQueue;
use crate::round::{VerificationRound, Vote};
use crate::settlement::{settle, Settlement};
use consensus_store::Collaborators;
use consensus_types::{
    AgentAddress, Category, ClaimId, ContentRef, EngineEvent, EngineParams, Outcome, Timestamp,
    Wei,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub struct RoundEngine {
    params: EngineParams,
    collaborators: Collaborators,
    rounds: BTreeMap<ClaimId, VerificationRound>,
    /// Votes per claim in the order they were cast.
    votes: BTreeMap<ClaimId, Vec<Vote>>,
    /// Settlements of resolved rounds, kept for audit and payout queries.
    settlements: BTreeMap<ClaimId, Settlement>,
    funds: FundsLedger,
    reputation: ReputationQueue,
}

/// Serializable state of a [`RoundEngine`] for persistence across restarts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEngineSnapshot {
    pub rounds: BTreeMap<ClaimId, VerificationRound>,
    pub votes: BTreeMap<ClaimId, Vec<Vote>>,
    pub settlements: BTreeMap<ClaimId, Settlement>,
    pub funds: FundsLedger,
    pub pending_reputation: ReputationQueue,
}

impl RoundEngine {
    pub fn new(params: EngineParams, collaborators: Collaborators) -> Self {
        Self::restore(RoundEngineSnapshot::default(), params, collaborators)
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Submit a claim, paying exactly the entry fee, and open its round.
    pub fn submit_claim(
        &mut self,
        author: &AgentAddress,
        content_ref: ContentRef,
        category: Category,
        fee_paid: Wei,
    ) -> Result<ClaimId, StakingError> {
        if !self.collaborators.directory.is_registered(author) {
            return Err(StakingError::NotRegistered(author.clone()));
        }
        if fee_paid != self.params.entry_fee {
            return Err(StakingError::IncorrectFee {
                expected: self.params.entry_fee,
                paid: fee_paid,
            });
        }
        if !self.funds.can_accept(fee_paid) {
            return Err(StakingError::AmountOverflow);
        }

        let now = self.collaborators.clock.now();
        let claim = self
            .collaborators
            .claims
            .create_claim(author, &content_ref, category, now)?;
        let claim_id = claim.id;
        assert!(
            !self.rounds.contains_key(&claim_id),
            "claim store reissued {claim_id}"
        );

        let round = VerificationRound::open(
            claim_id,
            author.clone(),
            fee_paid,
            now,
            self.params.voting_period_secs,
        );
        let end_time = round.end_time;
        self.funds.deposit(claim_id, fee_paid)?;
        self.rounds.insert(claim_id, round);

        tracing::debug!(
            claim_id = claim_id.get(),
            author = %author,
            category = %category,
            end_time = end_time.as_secs(),
            "claim submitted"
        );
        self.collaborators
            .notifier
            .notify(&EngineEvent::ClaimSubmitted {
                claim_id,
                author: author.clone(),
                content_ref,
                category,
                fee: fee_paid,
                end_time,
            });
        Ok(claim_id)
    }

    /// Lock `stake` for (`support = true`) or against a claim.
    pub fn cast_vote(
        &mut self,
        claim_id: ClaimId,
        voter: &AgentAddress,
        support: bool,
        stake: Wei,
    ) -> Result<(), StakingError> {
        let now = self.collaborators.clock.now();
        let round = self
            .rounds
            .get_mut(&claim_id)
            .ok_or(StakingError::UnknownClaim(claim_id))?;

        if !self.collaborators.directory.is_registered(voter) {
            return Err(StakingError::NotRegistered(voter.clone()));
        }
        if *voter == round.author {
            return Err(StakingError::SelfVoteForbidden);
        }
        if round.resolved {
            return Err(StakingError::AlreadyResolved(claim_id));
        }
        if !round.accepts_votes(now) {
            return Err(StakingError::VotingClosed {
                claim_id,
                end_time: round.end_time,
            });
        }
        let already_voted = self
            .votes
            .get(&claim_id)
            .is_some_and(|votes| votes.iter().any(|v| &v.voter == voter));
        if already_voted {
            return Err(StakingError::DuplicateVote {
                claim_id,
                voter: voter.clone(),
            });
        }
        if stake < self.params.min_stake {
            return Err(StakingError::StakeTooLow {
                min: self.params.min_stake,
                provided: stake,
            });
        }
        // Side totals never exceed the funds held, so this bounds them too.
        self.funds.deposit(claim_id, stake)?;

        if support {
            round.total_valid_stake += stake;
            round.valid_votes += 1;
        } else {
            round.total_invalid_stake += stake;
            round.invalid_votes += 1;
        }
        self.votes.entry(claim_id).or_default().push(Vote {
            claim_id,
            voter: voter.clone(),
            support,
            amount: stake,
            cast_at: now,
        });

        tracing::debug!(
            claim_id = claim_id.get(),
            voter = %voter,
            support,
            stake = %stake,
            "vote cast"
        );
        self.collaborators.notifier.notify(&EngineEvent::VoteCast {
            claim_id,
            voter: voter.clone(),
            support,
            amount: stake,
        });
        Ok(())
    }

    /// Close a round whose window has elapsed and settle it. Succeeds once.
    pub fn resolve_round(&mut self, claim_id: ClaimId) -> Result<Outcome, StakingError> {
        let now = self.collaborators.clock.now();
        let round = self
            .rounds
            .get_mut(&claim_id)
            .ok_or(StakingError::UnknownClaim(claim_id))?;

        if round.resolved {
            return Err(StakingError::AlreadyResolved(claim_id));
        }
        if now < round.end_time {
            return Err(StakingError::TooEarly {
                claim_id,
                end_time: round.end_time,
            });
        }

        let votes = self.votes.get(&claim_id).map(Vec::as_slice).unwrap_or(&[]);
        let settlement = settle(
            &round.author,
            round.entry_fee,
            votes,
            round.total_valid_stake,
            round.total_invalid_stake,
            &self.params,
        );
        let outcome = settlement.outcome;
        self.funds.release(claim_id, &settlement)?;
        round.resolved = true;
        round.outcome = Some(outcome);

        tracing::info!(
            claim_id = claim_id.get(),
            outcome = %outcome,
            valid = %round.total_valid_stake,
            invalid = %round.total_invalid_stake,
            remainder = %settlement.remainder,
            "round resolved"
        );
        self.collaborators
            .notifier
            .notify(&EngineEvent::RoundResolved {
                claim_id,
                outcome,
                total_valid_stake: round.total_valid_stake,
                total_invalid_stake: round.total_invalid_stake,
                remainder: settlement.remainder,
            });

        let deferred = self.reputation.apply(
            self.collaborators.reputation.as_ref(),
            settlement.reputation.iter().cloned(),
        );
        for delta in deferred {
            self.collaborators
                .notifier
                .notify(&EngineEvent::ReputationDeferred {
                    agent: delta.agent,
                    delta: delta.delta,
                });
        }

        self.settlements.insert(claim_id, settlement);
        Ok(outcome)
    }

    pub fn get_round(&self, claim_id: ClaimId) -> Result<&VerificationRound, StakingError> {
        self.rounds
            .get(&claim_id)
            .ok_or(StakingError::UnknownClaim(claim_id))
    }

    /// Votes on a claim in cast order.
    pub fn votes(&self, claim_id: ClaimId) -> Result<&[Vote], StakingError> {
        self.get_round(claim_id)?;
        Ok(self.votes.get(&claim_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn vote_of(&self, claim_id: ClaimId, voter: &AgentAddress) -> Option<&Vote> {
        self.votes
            .get(&claim_id)?
            .iter()
            .find(|v| &v.voter == voter)
    }

    /// Settlement of a resolved round.
    pub fn settlement(&self, claim_id: ClaimId) -> Option<&Settlement> {
        self.settlements.get(&claim_id)
    }

    pub fn escrow_balance(&self, claim_id: ClaimId) -> Wei {
        self.funds.escrow_balance(claim_id)
    }

    pub fn total_escrowed(&self) -> Wei {
        self.funds.total_escrowed()
    }

    /// Escrow, withdrawable balances and remainder together.
    pub fn total_held(&self) -> Wei {
        self.funds.total_held()
    }

    pub fn balance_of(&self, address: &AgentAddress) -> Wei {
        self.funds.balance_of(address)
    }

    /// Pay out an address's whole withdrawable balance.
    pub fn withdraw(&mut self, address: &AgentAddress) -> Result<Wei, StakingError> {
        let amount = self.funds.take_balance(address);
        if amount.is_zero() {
            return Err(StakingError::NothingToWithdraw(address.clone()));
        }
        tracing::info!(address = %address, amount = %amount, "balance withdrawn");
        Ok(amount)
    }

    pub fn remainder_balance(&self) -> Wei {
        self.funds.remainder()
    }

    /// Unresolved rounds whose window has elapsed at `now`, in id order.
    pub fn resolvable_rounds(&self, now: Timestamp) -> Vec<ClaimId> {
        self.rounds
            .values()
            .filter(|r| r.is_resolvable(now))
            .map(|r| r.claim_id)
            .collect()
    }

    /// Rounds not yet resolved, whether or not their window has elapsed.
    pub fn open_round_count(&self) -> usize {
        self.rounds.values().filter(|r| !r.resolved).count()
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn pending_reputation(&self) -> usize {
        self.reputation.len()
    }

    /// Retry queued reputation deltas. Returns how many were applied.
    pub fn retry_reputation(&mut self) -> usize {
        self.reputation
            .retry(self.collaborators.reputation.as_ref())
    }

    pub fn now(&self) -> Timestamp {
        self.collaborators.clock.now()
    }

    pub fn snapshot(&self) -> RoundEngineSnapshot {
        RoundEngineSnapshot {
            rounds: self.rounds.clone(),
            votes: self.votes.clone(),
            settlements: self.settlements.clone(),
            funds: self.funds.clone(),
            pending_reputation: self.reputation.clone(),
        }
    }

    /// Rebuild an engine from a persisted snapshot.
    pub fn restore(
        snapshot: RoundEngineSnapshot,
        params: EngineParams,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            params,
            collaborators,
            rounds: snapshot.rounds,
            votes: snapshot.votes,
            settlements: snapshot.settlements,
            funds: snapshot.funds,
            reputation: snapshot.pending_reputation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_nullables::Nulls;

    const FEE: u128 = 1_000_000_000_000_000;
    const MIN: u128 = 100_000_000_000_000;
    const DAY: u64 = 24 * 3600;

    fn addr(n: u8) -> AgentAddress {
        AgentAddress::new(format!("0x{:040x}", n))
    }

    struct Fixture {
        nulls: Nulls,
        engine: RoundEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let nulls = Nulls::default();
            for n in 1..=5 {
                nulls.directory.register(&addr(n));
            }
            let engine = RoundEngine::new(EngineParams::default(), nulls.collaborators());
            Self { nulls, engine }
        }

        fn submit(&mut self) -> ClaimId {
            self.engine
                .submit_claim(
                    &addr(1),
                    ContentRef::new("QmClaim").unwrap(),
                    Category::News,
                    Wei::new(FEE),
                )
                .unwrap()
        }
    }

    #[test]
    fn submit_opens_round_and_escrows_fee() {
        let mut f = Fixture::new();
        let id = f.submit();
        assert_eq!(id, ClaimId::new(0));

        let round = f.engine.get_round(id).unwrap();
        assert_eq!(round.end_time.as_secs() - round.created_at.as_secs(), DAY);
        assert!(!round.resolved);
        assert_eq!(f.engine.escrow_balance(id), Wei::new(FEE));
        assert_eq!(f.nulls.notifier.event_names(), vec!["claim_submitted"]);
    }

    #[test]
    fn submit_rejects_unregistered_and_wrong_fee() {
        let mut f = Fixture::new();
        let err = f
            .engine
            .submit_claim(&addr(9), ContentRef::new("x").unwrap(), Category::News, Wei::new(FEE))
            .unwrap_err();
        assert_eq!(err, StakingError::NotRegistered(addr(9)));

        for paid in [FEE - 1, FEE + 1, 0] {
            let err = f
                .engine
                .submit_claim(&addr(1), ContentRef::new("x").unwrap(), Category::News, Wei::new(paid))
                .unwrap_err();
            assert!(matches!(err, StakingError::IncorrectFee { .. }));
        }
        assert_eq!(f.engine.round_count(), 0);
        assert_eq!(f.engine.total_escrowed(), Wei::ZERO);
    }

    #[test]
    fn store_failure_leaves_nothing_escrowed() {
        let mut f = Fixture::new();
        f.nulls.claims.fail_writes(true);
        let err = f
            .engine
            .submit_claim(&addr(1), ContentRef::new("x").unwrap(), Category::News, Wei::new(FEE))
            .unwrap_err();
        assert_eq!(err.code(), "store_error");
        assert_eq!(f.engine.round_count(), 0);
        assert_eq!(f.engine.total_escrowed(), Wei::ZERO);
        assert!(f.nulls.notifier.events().is_empty());
    }

    #[test]
    fn vote_preconditions() {
        let mut f = Fixture::new();
        let id = f.submit();

        assert_eq!(
            f.engine.cast_vote(ClaimId::new(42), &addr(2), true, Wei::new(MIN)),
            Err(StakingError::UnknownClaim(ClaimId::new(42)))
        );
        assert_eq!(
            f.engine.cast_vote(id, &addr(9), true, Wei::new(MIN)),
            Err(StakingError::NotRegistered(addr(9)))
        );
        assert_eq!(
            f.engine.cast_vote(id, &addr(1), true, Wei::new(MIN)),
            Err(StakingError::SelfVoteForbidden)
        );
        assert!(matches!(
            f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN - 1)),
            Err(StakingError::StakeTooLow { .. })
        ));

        f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)).unwrap();
        // different side and amount still counts as a duplicate
        assert!(matches!(
            f.engine.cast_vote(id, &addr(2), false, Wei::new(5 * MIN)),
            Err(StakingError::DuplicateVote { .. })
        ));

        let round = f.engine.get_round(id).unwrap();
        assert_eq!(round.total_valid_stake, Wei::new(MIN));
        assert_eq!(round.total_invalid_stake, Wei::ZERO);
        assert_eq!(f.engine.escrow_balance(id), Wei::new(FEE + MIN));
    }

    #[test]
    fn voting_closes_at_end_time() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.nulls.clock.advance(DAY - 1);
        f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)).unwrap();
        f.nulls.clock.advance(1);
        assert!(matches!(
            f.engine.cast_vote(id, &addr(3), true, Wei::new(MIN)),
            Err(StakingError::VotingClosed { .. })
        ));
        // the author is still told self-voting is forbidden after close
        assert_eq!(
            f.engine.cast_vote(id, &addr(1), true, Wei::new(MIN)),
            Err(StakingError::SelfVoteForbidden)
        );
    }

    #[test]
    fn resolve_before_deadline_is_too_early_and_changes_nothing() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)).unwrap();
        let before = f.engine.snapshot();

        f.nulls.clock.advance(DAY - 1);
        let err = f.engine.resolve_round(id).unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(f.engine.snapshot(), before);
    }

    #[test]
    fn valid_outcome_pays_winner_the_losing_stake() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.engine.cast_vote(id, &addr(2), true, Wei::new(2 * MIN)).unwrap();
        f.engine.cast_vote(id, &addr(3), false, Wei::new(MIN)).unwrap();

        f.nulls.clock.advance(DAY);
        assert_eq!(f.engine.resolve_round(id), Ok(Outcome::Valid));

        assert_eq!(f.engine.escrow_balance(id), Wei::ZERO);
        assert_eq!(f.engine.balance_of(&addr(1)), Wei::new(FEE));
        assert_eq!(f.engine.balance_of(&addr(2)), Wei::new(3 * MIN));
        assert_eq!(f.engine.balance_of(&addr(3)), Wei::ZERO);
        assert_eq!(f.nulls.directory.reputation(&addr(1)), 10);
        assert_eq!(f.nulls.directory.reputation(&addr(2)), 5);
        // saturates at zero
        assert_eq!(f.nulls.directory.reputation(&addr(3)), 0);
    }

    #[test]
    fn second_resolution_is_rejected_and_state_is_unchanged() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.engine.cast_vote(id, &addr(2), false, Wei::new(MIN)).unwrap();
        f.nulls.clock.advance(DAY);

        assert_eq!(f.engine.resolve_round(id), Ok(Outcome::Invalid));
        let after_first = f.engine.snapshot();
        let adjustments = f.nulls.directory.adjustments();

        assert_eq!(
            f.engine.resolve_round(id),
            Err(StakingError::AlreadyResolved(id))
        );
        assert_eq!(f.engine.snapshot(), after_first);
        assert_eq!(f.nulls.directory.adjustments(), adjustments);
    }

    #[test]
    fn votes_after_resolution_report_already_resolved() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.nulls.clock.advance(DAY);
        f.engine.resolve_round(id).unwrap();
        assert_eq!(
            f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)),
            Err(StakingError::AlreadyResolved(id))
        );
    }

    #[test]
    fn reputation_outage_does_not_block_settlement() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)).unwrap();
        f.nulls.directory.set_unavailable(true);
        f.nulls.clock.advance(DAY);

        assert_eq!(f.engine.resolve_round(id), Ok(Outcome::Valid));
        assert_eq!(f.engine.escrow_balance(id), Wei::ZERO);
        assert_eq!(f.engine.pending_reputation(), 2);
        assert!(f
            .nulls
            .notifier
            .event_names()
            .contains(&"reputation_deferred"));

        f.nulls.directory.set_unavailable(false);
        assert_eq!(f.engine.retry_reputation(), 2);
        assert_eq!(f.engine.pending_reputation(), 0);
        assert_eq!(f.nulls.directory.reputation(&addr(1)), 10);
        assert_eq!(f.nulls.directory.reputation(&addr(2)), 5);
    }

    #[test]
    fn withdraw_drains_balance_once() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.nulls.clock.advance(DAY);
        f.engine.resolve_round(id).unwrap();

        assert_eq!(f.engine.withdraw(&addr(1)), Ok(Wei::new(FEE)));
        assert_eq!(
            f.engine.withdraw(&addr(1)),
            Err(StakingError::NothingToWithdraw(addr(1)))
        );
    }

    #[test]
    fn resolvable_rounds_lists_only_elapsed_unresolved() {
        let mut f = Fixture::new();
        let first = f.submit();
        f.nulls.clock.advance(DAY / 2);
        let second = f.submit();
        f.nulls.clock.advance(DAY / 2);

        let now = f.engine.now();
        assert_eq!(f.engine.resolvable_rounds(now), vec![first]);
        f.engine.resolve_round(first).unwrap();
        assert!(f.engine.resolvable_rounds(now).is_empty());
        assert_eq!(f.engine.open_round_count(), 1);

        f.nulls.clock.advance(DAY);
        assert_eq!(f.engine.resolvable_rounds(f.engine.now()), vec![second]);
    }

    #[test]
    fn snapshot_restore_round_trips_through_bincode() {
        let mut f = Fixture::new();
        let id = f.submit();
        f.engine.cast_vote(id, &addr(2), true, Wei::new(MIN)).unwrap();

        let bytes = bincode::serialize(&f.engine.snapshot()).unwrap();
        let snapshot: RoundEngineSnapshot = bincode::deserialize(&bytes).unwrap();
        let restored = RoundEngine::restore(snapshot, EngineParams::default(), f.nulls.collaborators());

        assert_eq!(restored.get_round(id), f.engine.get_round(id));
        assert_eq!(restored.escrow_balance(id), Wei::new(FEE + MIN));
        assert!(restored.vote_of(id, &addr(2)).is_some());
    }
}

use proptest::prelude::*;

use consensus_nullables::Nulls;
use consensus_staking::{RoundEngine, StakingError};
use consensus_types::{AgentAddress, Category, ClaimId, ContentRef, EngineParams, Outcome, Wei};

fn addr(n: usize) -> AgentAddress {
    AgentAddress::new(format!("0x{:040x}", n))
}

fn engine_with_agents(count: usize) -> (Nulls, RoundEngine) {
    let nulls = Nulls::default();
    for n in 0..=count {
        nulls.directory.register(&addr(n));
    }
    let params = EngineParams {
        min_stake: Wei::new(1),
        ..EngineParams::default()
    };
    let engine = RoundEngine::new(params, nulls.collaborators());
    (nulls, engine)
}

proptest! {
    /// Whatever the votes, resolution empties escrow and every wei put in
    /// comes out as a balance or as remainder.
    #[test]
    fn resolution_conserves_funds(
        votes in prop::collection::vec((any::<bool>(), 1u128..1_000_000_000_000_000_000), 0..12),
    ) {
        let (nulls, mut engine) = engine_with_agents(votes.len());
        let fee = engine.params().entry_fee;
        let id = engine
            .submit_claim(&addr(0), ContentRef::new("QmProp").unwrap(), Category::Timeline, fee)
            .unwrap();
        for (i, (support, stake)) in votes.iter().enumerate() {
            engine.cast_vote(id, &addr(i + 1), *support, Wei::new(*stake)).unwrap();
        }
        let put_in = fee + votes.iter().map(|(_, s)| Wei::new(*s)).sum::<Wei>();
        prop_assert_eq!(engine.escrow_balance(id), put_in);

        nulls.clock.advance(engine.params().voting_period_secs);
        engine.resolve_round(id).unwrap();

        prop_assert_eq!(engine.escrow_balance(id), Wei::ZERO);
        let paid_out: Wei = (0..=votes.len()).map(|n| engine.balance_of(&addr(n))).sum();
        prop_assert_eq!(paid_out + engine.remainder_balance(), put_in);
    }

    /// On a tie every participant gets back exactly what they put in.
    #[test]
    fn ties_refund_exact_contributions(stakes in prop::collection::vec(1u128..1_000_000, 1..6)) {
        let (nulls, mut engine) = engine_with_agents(stakes.len() * 2);
        let fee = engine.params().entry_fee;
        let id = engine
            .submit_claim(&addr(0), ContentRef::new("QmTie").unwrap(), Category::News, fee)
            .unwrap();
        // mirror every supporting stake with an equal opposing one
        for (i, stake) in stakes.iter().enumerate() {
            engine.cast_vote(id, &addr(2 * i + 1), true, Wei::new(*stake)).unwrap();
            engine.cast_vote(id, &addr(2 * i + 2), false, Wei::new(*stake)).unwrap();
        }

        nulls.clock.advance(engine.params().voting_period_secs);
        prop_assert_eq!(engine.resolve_round(id).unwrap(), Outcome::Tie);

        prop_assert_eq!(engine.balance_of(&addr(0)), fee);
        for (i, stake) in stakes.iter().enumerate() {
            prop_assert_eq!(engine.balance_of(&addr(2 * i + 1)), Wei::new(*stake));
            prop_assert_eq!(engine.balance_of(&addr(2 * i + 2)), Wei::new(*stake));
        }
        prop_assert_eq!(engine.remainder_balance(), Wei::ZERO);
        prop_assert!(nulls.directory.adjustments().is_empty());
    }

    /// Stakes up to `u128::MAX` spread over several claims. A vote that
    /// would overflow the engine's holdings is refused without side effects,
    /// and every accepted wei is accounted for after all rounds resolve.
    #[test]
    fn huge_stakes_across_claims_never_leak(
        votes in prop::collection::vec(
            (
                0usize..3,
                any::<bool>(),
                prop_oneof![1u128..1_000_000_000_000_000_000, (u128::MAX / 4)..=u128::MAX],
            ),
            0..16,
        ),
    ) {
        const VOTERS: usize = 4;
        let (nulls, mut engine) = engine_with_agents(VOTERS);
        let fee = engine.params().entry_fee;
        let ids: Vec<ClaimId> = (0..3)
            .map(|_| {
                engine
                    .submit_claim(&addr(0), ContentRef::new("QmBig").unwrap(), Category::Timeline, fee)
                    .unwrap()
            })
            .collect();
        let mut put_in = Wei::new(fee.raw() * 3);

        for (i, (claim, support, stake)) in votes.iter().enumerate() {
            let before = engine.snapshot();
            let voter = addr(1 + i % VOTERS);
            match engine.cast_vote(ids[*claim], &voter, *support, Wei::new(*stake)) {
                Ok(()) => put_in = put_in + Wei::new(*stake),
                Err(StakingError::AmountOverflow) | Err(StakingError::DuplicateVote { .. }) => {
                    prop_assert_eq!(engine.snapshot(), before);
                }
                Err(other) => prop_assert!(false, "unexpected rejection: {other}"),
            }
            prop_assert_eq!(engine.total_held(), put_in);
        }

        nulls.clock.advance(engine.params().voting_period_secs);
        for id in &ids {
            engine.resolve_round(*id).unwrap();
        }

        prop_assert_eq!(engine.total_escrowed(), Wei::ZERO);
        let paid_out = (0..=VOTERS)
            .map(|n| engine.balance_of(&addr(n)))
            .fold(Some(Wei::ZERO), |acc, b| acc?.checked_add(b));
        prop_assert_eq!(
            paid_out.and_then(|p| p.checked_add(engine.remainder_balance())),
            Some(put_in)
        );
    }
}

/// A voter whose balance is already near the cap cannot push a second
/// round's settlement past it: the vote is refused and the round settles.
#[test]
fn oversized_vote_is_refused_and_later_rounds_settle() {
    let (nulls, mut engine) = engine_with_agents(2);
    let fee = engine.params().entry_fee;
    let half = Wei::new(u128::MAX / 2);
    let first = engine
        .submit_claim(&addr(0), ContentRef::new("QmFirst").unwrap(), Category::News, fee)
        .unwrap();
    engine.cast_vote(first, &addr(1), true, half).unwrap();
    nulls.clock.advance(engine.params().voting_period_secs);
    assert_eq!(engine.resolve_round(first).unwrap(), Outcome::Valid);
    assert_eq!(engine.balance_of(&addr(1)), half);

    let second = engine
        .submit_claim(&addr(0), ContentRef::new("QmSecond").unwrap(), Category::News, fee)
        .unwrap();
    engine.cast_vote(second, &addr(2), false, Wei::new(1 << 100)).unwrap();
    let before = engine.snapshot();
    assert_eq!(
        engine.cast_vote(second, &addr(1), true, half),
        Err(StakingError::AmountOverflow)
    );
    assert_eq!(engine.snapshot(), before);

    nulls.clock.advance(engine.params().voting_period_secs);
    assert_eq!(engine.resolve_round(second).unwrap(), Outcome::Invalid);
    assert!(engine.get_round(second).unwrap().resolved);
    assert_eq!(engine.escrow_balance(second), Wei::ZERO);
    assert_eq!(engine.total_escrowed(), Wei::ZERO);

    let fees = Wei::new(fee.raw() * 2);
    let put_in = fees + half + Wei::new(1 << 100);
    let paid_out: Wei = (0..=2).map(|n| engine.balance_of(&addr(n))).sum();
    assert_eq!(paid_out + engine.remainder_balance(), put_in);
    assert_eq!(engine.total_held(), put_in);
}

//! Property-based fuzz tests for the snapshot boundary.
//!
//! Snapshots are read back from disk at startup, so decoding must reject
//! garbage cleanly, and any state the node can reach must survive a
//! save → restore cycle bit for bit.

use std::sync::Arc;

use proptest::prelude::*;

use consensus_node::{ConsensusNode, NodeConfig, NodeSnapshot};
use consensus_nullables::NullClock;
use consensus_types::{AgentAddress, Category, ClaimId, ContentRef, Wei};

const FEE: u128 = 1_000_000_000_000_000;
const MIN_STAKE: u128 = 100_000_000_000_000;

#[derive(Clone, Debug)]
enum Op {
    Submit { author: u8 },
    Vote { claim: u64, voter: u8, support: bool, stake: u128 },
    Advance { secs: u64 },
    Resolve { claim: u64 },
    Withdraw { agent: u8 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..=4).prop_map(|author| Op::Submit { author }),
        (0u64..4, 1u8..=4, any::<bool>(), MIN_STAKE..MIN_STAKE * 50).prop_map(
            |(claim, voter, support, stake)| Op::Vote { claim, voter, support, stake }
        ),
        (0u64..=2 * 24 * 3600).prop_map(|secs| Op::Advance { secs }),
        (0u64..4).prop_map(|claim| Op::Resolve { claim }),
        (1u8..=4).prop_map(|agent| Op::Withdraw { agent }),
    ]
}

fn addr(n: u8) -> AgentAddress {
    AgentAddress::new(format!("0x{:040x}", n))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = NodeSnapshot::from_bytes(&bytes);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn reachable_state_survives_restart(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let config = NodeConfig {
                data_dir: dir.path().to_path_buf(),
                ..NodeConfig::default()
            };
            let clock = Arc::new(NullClock::new(1_700_000_000));
            let node = ConsensusNode::with_clock(config.clone(), clock.clone()).unwrap();
            for n in 1..=4 {
                node.register_agent(&addr(n), &format!("agent-{n}")).unwrap();
            }

            // rejected operations are part of the exercise
            for op in ops {
                match op {
                    Op::Submit { author } => {
                        let _ = node
                            .submit_claim(
                                &addr(author),
                                ContentRef::new("QmFuzz").unwrap(),
                                Category::Timeline,
                                Wei::new(FEE),
                            )
                            .await;
                    }
                    Op::Vote { claim, voter, support, stake } => {
                        let _ = node
                            .cast_vote(ClaimId::new(claim), &addr(voter), support, Wei::new(stake))
                            .await;
                    }
                    Op::Advance { secs } => clock.advance(secs),
                    Op::Resolve { claim } => {
                        let _ = node.resolve_round(ClaimId::new(claim)).await;
                    }
                    Op::Withdraw { agent } => {
                        let _ = node.withdraw(&addr(agent)).await;
                    }
                }
            }

            node.save_snapshot().await.unwrap();
            let digest = node.state_digest().await.unwrap();
            let restored = ConsensusNode::with_clock(config, clock).unwrap();
            assert_eq!(restored.state_digest().await.unwrap(), digest);
        });
    }
}

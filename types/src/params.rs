//! Engine parameters: fees, stake floor, window lengths, reputation deltas.

use crate::amount::Wei;
use serde::{Deserialize, Serialize};

/// Parameters every engine instance is constructed with.
///
/// Loaded from the `[params]` table of the node configuration; any field left
/// out falls back to [`EngineParams::consensus_defaults`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    // ── Verification rounds ──────────────────────────────────────────────
    /// Exact entry fee a claim author must pay. Default: 0.001 ETH.
    pub entry_fee: Wei,

    /// Minimum stake per vote. Default: 0.0001 ETH.
    pub min_stake: Wei,

    /// Voting window opened by each claim, in seconds. Default: 24 hours.
    pub voting_period_secs: u64,

    // ── Reputation ───────────────────────────────────────────────────────
    /// Reputation credited to an author whose claim resolves Valid.
    pub author_win_delta: i64,

    /// Reputation removed from an author whose claim resolves Invalid.
    pub author_loss_delta: i64,

    /// Reputation credited to each voter on the winning side.
    pub voter_win_delta: i64,

    /// Reputation removed from each voter on the losing side.
    pub voter_loss_delta: i64,

    // ── Decision requests ────────────────────────────────────────────────
    /// Answer window opened by each decision request, in seconds. Default: 48 hours.
    pub decision_period_secs: u64,

    /// Flat reputation credit for every agent that answered a resolved request.
    pub decision_participation_credit: i64,
}

impl EngineParams {
    /// Defaults matching the deployed contracts.
    pub fn consensus_defaults() -> Self {
        Self {
            entry_fee: Wei::new(1_000_000_000_000_000), // 0.001 ETH
            min_stake: Wei::new(100_000_000_000_000),   // 0.0001 ETH
            voting_period_secs: 24 * 3600,

            author_win_delta: 10,
            author_loss_delta: 10,
            voter_win_delta: 5,
            voter_loss_delta: 5,

            decision_period_secs: 48 * 3600,
            decision_participation_credit: 1,
        }
    }

    /// Short windows for test networks and local demos.
    pub fn testnet() -> Self {
        Self {
            voting_period_secs: 5 * 60,
            decision_period_secs: 10 * 60,
            ..Self::consensus_defaults()
        }
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::consensus_defaults()
    }
}

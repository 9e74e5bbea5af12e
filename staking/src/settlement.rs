//! Settlement: turns a closed round into payouts and reputation deltas.
//!
//! - **Valid wins**: the author gets the entry fee back, supporting voters get
//!   their stake back plus a pro-rata share of the forfeited opposing stake.
//! - **Invalid wins**: the entry fee and all supporting stake form the pool,
//!   opposing voters get their stake back plus a pro-rata share of it.
//! - **Tie**: everyone gets back exactly what they put in.
//!
//! Shares are floored; whatever floor division leaves over is the remainder,
//! credited to the protocol account. Settlement never creates or loses funds:
//! `Σ payouts + remainder == entry fee + Σ stakes`.

use crate::reputation::ReputationDelta;
use crate::round::Vote;
use consensus_types::{AgentAddress, EngineParams, Outcome, Wei};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    EntryFeeRefund,
    StakeRefund,
    /// Pro-rata share of the losing side's pool.
    Reward,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: AgentAddress,
    pub amount: Wei,
    pub kind: PayoutKind,
}

/// Result of settling one round. Zero-value payouts are omitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: Outcome,
    pub payouts: Vec<Payout>,
    pub reputation: Vec<ReputationDelta>,
    /// Rounding dust owed to the protocol remainder account.
    pub remainder: Wei,
}

impl Settlement {
    pub fn total_paid(&self) -> Wei {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    /// Everything an address receives from this settlement.
    pub fn paid_to(&self, recipient: &AgentAddress) -> Wei {
        self.payouts
            .iter()
            .filter(|p| &p.recipient == recipient)
            .map(|p| p.amount)
            .sum()
    }
}

/// Settle a round. Pure and deterministic; payouts follow vote order.
pub fn settle(
    author: &AgentAddress,
    entry_fee: Wei,
    votes: &[Vote],
    total_valid: Wei,
    total_invalid: Wei,
    params: &EngineParams,
) -> Settlement {
    let outcome = Outcome::from_totals(total_valid, total_invalid);
    let mut payouts = Vec::new();
    let mut reputation = Vec::new();
    let mut remainder = Wei::ZERO;

    match outcome {
        Outcome::Tie => {
            push_payout(&mut payouts, author, entry_fee, PayoutKind::EntryFeeRefund);
            for vote in votes {
                push_payout(&mut payouts, &vote.voter, vote.amount, PayoutKind::StakeRefund);
            }
        }
        Outcome::Valid | Outcome::Invalid => {
            let valid_won = outcome == Outcome::Valid;
            let (pool, winning_total) = if valid_won {
                (total_invalid, total_valid)
            } else {
                (entry_fee + total_valid, total_invalid)
            };

            if valid_won {
                push_payout(&mut payouts, author, entry_fee, PayoutKind::EntryFeeRefund);
                push_delta(&mut reputation, author, params.author_win_delta);
            } else {
                push_delta(&mut reputation, author, -params.author_loss_delta);
            }

            let mut distributed = Wei::ZERO;
            for vote in votes {
                if vote.support == valid_won {
                    let share = pro_rata(pool, vote.amount, winning_total);
                    distributed += share;
                    push_payout(&mut payouts, &vote.voter, vote.amount, PayoutKind::StakeRefund);
                    push_payout(&mut payouts, &vote.voter, share, PayoutKind::Reward);
                    push_delta(&mut reputation, &vote.voter, params.voter_win_delta);
                } else {
                    push_delta(&mut reputation, &vote.voter, -params.voter_loss_delta);
                }
            }
            remainder = pool - distributed;
        }
    }

    Settlement {
        outcome,
        payouts,
        reputation,
        remainder,
    }
}

/// `floor(pool * stake / total)`. The winning side always has positive stake
/// and `stake <= total`, so the share fits and never exceeds the pool.
fn pro_rata(pool: Wei, stake: Wei, total: Wei) -> Wei {
    assert!(stake <= total, "vote stake {stake} exceeds side total {total}");
    pool.mul_div_floor(stake, total)
        .unwrap_or_else(|| panic!("pro-rata share over zero total ({stake} of {pool})"))
}

fn push_payout(payouts: &mut Vec<Payout>, recipient: &AgentAddress, amount: Wei, kind: PayoutKind) {
    if !amount.is_zero() {
        payouts.push(Payout {
            recipient: recipient.clone(),
            amount,
            kind,
        });
    }
}

fn push_delta(deltas: &mut Vec<ReputationDelta>, agent: &AgentAddress, delta: i64) {
    if delta != 0 {
        deltas.push(ReputationDelta {
            agent: agent.clone(),
            delta,
        });
    }
}

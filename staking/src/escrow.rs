//! Fund custody: per-claim escrow, withdrawable balances, remainder account.

use crate::error::StakingError;
use crate::settlement::Settlement;
use consensus_types::{AgentAddress, ClaimId, Wei};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every wei the engine holds is in exactly one of three places: a round's
/// escrow, an agent's withdrawable balance, or the protocol remainder.
///
/// `held` is the sum of all three. Deposits are refused once it would pass
/// `u128::MAX`, which bounds every escrow, balance and the remainder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsLedger {
    escrow: BTreeMap<ClaimId, Wei>,
    balances: BTreeMap<AgentAddress, Wei>,
    remainder: Wei,
    held: Wei,
}

impl FundsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `amount` more can be taken in without overflowing any account.
    pub fn can_accept(&self, amount: Wei) -> bool {
        self.held.checked_add(amount).is_some()
    }

    /// Lock funds under a round.
    pub fn deposit(&mut self, claim_id: ClaimId, amount: Wei) -> Result<(), StakingError> {
        let held = self
            .held
            .checked_add(amount)
            .ok_or(StakingError::AmountOverflow)?;
        let escrow = self
            .escrow_balance(claim_id)
            .checked_add(amount)
            .ok_or(StakingError::AmountOverflow)?;
        self.escrow.insert(claim_id, escrow);
        self.held = held;
        Ok(())
    }

    pub fn escrow_balance(&self, claim_id: ClaimId) -> Wei {
        self.escrow.get(&claim_id).copied().unwrap_or_default()
    }

    /// Total held across all unresolved rounds.
    pub fn total_escrowed(&self) -> Wei {
        self.escrow
            .values()
            .fold(Wei::ZERO, |acc, held| acc.saturating_add(*held))
    }

    /// Everything the engine holds: escrow, balances and remainder.
    pub fn total_held(&self) -> Wei {
        self.held
    }

    /// Move a round's entire escrow out according to its settlement.
    ///
    /// All credits are computed before anything moves, so on error the
    /// ledger is unchanged. Panics if the settlement does not account for
    /// every escrowed wei.
    pub fn release(&mut self, claim_id: ClaimId, settlement: &Settlement) -> Result<(), StakingError> {
        let held = self.escrow_balance(claim_id);
        let owed = settlement
            .payouts
            .iter()
            .try_fold(settlement.remainder, |acc, p| acc.checked_add(p.amount));
        assert_eq!(
            owed,
            Some(held),
            "conservation violated on {claim_id}: escrow holds {held}"
        );

        let mut credited: BTreeMap<AgentAddress, Wei> = BTreeMap::new();
        for payout in &settlement.payouts {
            let current = match credited.get(&payout.recipient) {
                Some(amount) => *amount,
                None => self.balance_of(&payout.recipient),
            };
            let updated = current
                .checked_add(payout.amount)
                .ok_or(StakingError::AmountOverflow)?;
            credited.insert(payout.recipient.clone(), updated);
        }
        let remainder = self
            .remainder
            .checked_add(settlement.remainder)
            .ok_or(StakingError::AmountOverflow)?;

        self.escrow.remove(&claim_id);
        self.balances.extend(credited);
        self.remainder = remainder;
        Ok(())
    }

    pub fn balance_of(&self, address: &AgentAddress) -> Wei {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// Zero out and return an address's withdrawable balance.
    pub fn take_balance(&mut self, address: &AgentAddress) -> Wei {
        let amount = self.balances.remove(address).unwrap_or_default();
        self.held = self.held.saturating_sub(amount);
        amount
    }

    pub fn remainder(&self) -> Wei {
        self.remainder
    }
}

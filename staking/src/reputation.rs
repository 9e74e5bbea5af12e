//! Best-effort reputation delivery with a retry queue.
//!
//! Fund settlement never waits on the identity directory. Deltas that cannot
//! be applied are kept here, in order, until a later retry succeeds.

use consensus_store::ReputationAdjuster;
use consensus_types::AgentAddress;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationDelta {
    pub agent: AgentAddress,
    pub delta: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationQueue {
    pending: VecDeque<ReputationDelta>,
}

impl ReputationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push each delta to the adjuster; queue and return the ones that failed.
    pub fn apply(
        &mut self,
        adjuster: &dyn ReputationAdjuster,
        deltas: impl IntoIterator<Item = ReputationDelta>,
    ) -> Vec<ReputationDelta> {
        let mut deferred = Vec::new();
        for delta in deltas {
            if let Err(e) = adjuster.adjust_reputation(&delta.agent, delta.delta) {
                tracing::warn!(
                    agent = %delta.agent,
                    delta = delta.delta,
                    error = %e,
                    "reputation adjustment deferred"
                );
                self.pending.push_back(delta.clone());
                deferred.push(delta);
            }
        }
        deferred
    }

    /// Retry every pending delta once. Returns how many were applied.
    pub fn retry(&mut self, adjuster: &dyn ReputationAdjuster) -> usize {
        let mut applied = 0;
        let mut still_pending = VecDeque::with_capacity(self.pending.len());
        while let Some(delta) = self.pending.pop_front() {
            match adjuster.adjust_reputation(&delta.agent, delta.delta) {
                Ok(()) => applied += 1,
                Err(_) => still_pending.push_back(delta),
            }
        }
        self.pending = still_pending;
        if applied > 0 {
            tracing::debug!(applied, remaining = self.pending.len(), "retried pending reputation");
        }
        applied
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReputationDelta> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_nullables::NullDirectory;

    fn addr(n: u8) -> AgentAddress {
        AgentAddress::new(format!("0x{:040x}", n))
    }

    #[test]
    fn failures_are_queued_then_retried_once() {
        let dir = NullDirectory::new();
        dir.register(&addr(1));
        dir.set_unavailable(true);

        let mut queue = ReputationQueue::new();
        let deferred = queue.apply(
            &dir,
            vec![ReputationDelta { agent: addr(1), delta: 7 }],
        );
        assert_eq!(deferred.len(), 1);
        assert_eq!(queue.len(), 1);

        // still down: nothing applied, nothing dropped
        assert_eq!(queue.retry(&dir), 0);
        assert_eq!(queue.len(), 1);

        dir.set_unavailable(false);
        assert_eq!(queue.retry(&dir), 1);
        assert!(queue.is_empty());
        assert_eq!(dir.reputation(&addr(1)), 7);

        // a second retry applies nothing again
        assert_eq!(queue.retry(&dir), 0);
        assert_eq!(dir.reputation(&addr(1)), 7);
    }
}

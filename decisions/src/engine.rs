//! Decision engine: open / answer / resolve.

use crate::error::DecisionError;
use crate::policy::{PolicyKind, SelectionPolicy};
use crate::request::{Answer, DecisionRequest, DecisionResolution};
use consensus_staking::{ReputationDelta, ReputationQueue};
use consensus_store::Collaborators;
use consensus_types::{AgentAddress, ContentRef, DecisionId, EngineEvent, EngineParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub struct DecisionEngine {
    params: EngineParams,
    collaborators: Collaborators,
    policy: Box<dyn SelectionPolicy>,
    requests: BTreeMap<DecisionId, DecisionRequest>,
    next_id: DecisionId,
    reputation: ReputationQueue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEngineSnapshot {
    pub requests: BTreeMap<DecisionId, DecisionRequest>,
    pub next_id: DecisionId,
    pub pending_reputation: ReputationQueue,
}

impl Default for DecisionEngineSnapshot {
    fn default() -> Self {
        Self {
            requests: BTreeMap::new(),
            next_id: DecisionId::new(0),
            pending_reputation: ReputationQueue::new(),
        }
    }
}

impl DecisionEngine {
    pub fn new(params: EngineParams, collaborators: Collaborators) -> Self {
        Self::with_policy(params, collaborators, PolicyKind::default().build())
    }

    pub fn with_policy(
        params: EngineParams,
        collaborators: Collaborators,
        policy: Box<dyn SelectionPolicy>,
    ) -> Self {
        Self::restore(DecisionEngineSnapshot::default(), params, collaborators, policy)
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Open a request for answers and announce it.
    pub fn open_decision_request(&mut self, question_ref: ContentRef) -> DecisionId {
        let now = self.collaborators.clock.now();
        let id = self.next_id;
        self.next_id = id.next();

        let request =
            DecisionRequest::open(id, question_ref.clone(), now, self.params.decision_period_secs);
        let end_time = request.end_time;
        self.requests.insert(id, request);

        tracing::debug!(decision_id = id.get(), question = %question_ref, "decision request opened");
        self.collaborators
            .notifier
            .notify(&EngineEvent::DecisionPosted {
                decision_id: id,
                question_ref,
                end_time,
            });
        id
    }

    /// Record an agent's single answer. A second answer is rejected, never merged.
    pub fn submit_answer(
        &mut self,
        decision_id: DecisionId,
        agent: &AgentAddress,
        answer_ref: ContentRef,
    ) -> Result<(), DecisionError> {
        let now = self.collaborators.clock.now();
        let request = self
            .requests
            .get_mut(&decision_id)
            .ok_or(DecisionError::UnknownDecision(decision_id))?;

        if !self.collaborators.directory.is_registered(agent) {
            return Err(DecisionError::NotRegistered(agent.clone()));
        }
        if request.resolved {
            return Err(DecisionError::AlreadyResolved(decision_id));
        }
        if now >= request.end_time {
            return Err(DecisionError::VotingClosed {
                decision_id,
                end_time: request.end_time,
            });
        }
        if request.has_answered(agent) {
            return Err(DecisionError::AlreadyAnswered {
                decision_id,
                agent: agent.clone(),
            });
        }

        request.answers.push(Answer {
            agent: agent.clone(),
            answer_ref: answer_ref.clone(),
            submitted_at: now,
        });

        tracing::debug!(decision_id = decision_id.get(), agent = %agent, "answer submitted");
        self.collaborators
            .notifier
            .notify(&EngineEvent::AnswerSubmitted {
                decision_id,
                agent: agent.clone(),
                answer_ref,
            });
        Ok(())
    }

    /// Close a request after its deadline, pick the accepted answer and
    /// credit every participant.
    pub fn resolve_decision(
        &mut self,
        decision_id: DecisionId,
    ) -> Result<DecisionResolution, DecisionError> {
        let now = self.collaborators.clock.now();
        let request = self
            .requests
            .get_mut(&decision_id)
            .ok_or(DecisionError::UnknownDecision(decision_id))?;

        if request.resolved {
            return Err(DecisionError::AlreadyResolved(decision_id));
        }
        if now < request.end_time {
            return Err(DecisionError::TooEarly {
                decision_id,
                end_time: request.end_time,
            });
        }

        let accepted = self.policy.select(&request.answers).cloned();
        request.resolved = true;
        request.accepted = accepted.clone();
        let participants = request.answers.len() as u32;

        tracing::info!(
            decision_id = decision_id.get(),
            participants,
            accepted = ?accepted.as_ref().map(|a| a.agent.as_str()),
            policy = self.policy.name(),
            "decision resolved"
        );
        self.collaborators
            .notifier
            .notify(&EngineEvent::DecisionResolved {
                decision_id,
                accepted_agent: accepted.as_ref().map(|a| a.agent.clone()),
                accepted_answer: accepted.as_ref().map(|a| a.answer_ref.clone()),
                participants,
            });

        let credit = self.params.decision_participation_credit;
        if credit != 0 {
            let deltas: Vec<ReputationDelta> = request
                .answers
                .iter()
                .map(|a| ReputationDelta {
                    agent: a.agent.clone(),
                    delta: credit,
                })
                .collect();
            let deferred = self
                .reputation
                .apply(self.collaborators.reputation.as_ref(), deltas);
            for delta in deferred {
                self.collaborators
                    .notifier
                    .notify(&EngineEvent::ReputationDeferred {
                        agent: delta.agent,
                        delta: delta.delta,
                    });
            }
        }

        Ok(DecisionResolution {
            decision_id,
            accepted,
            participants,
            policy: self.policy.name().to_string(),
        })
    }

    pub fn get_decision(&self, decision_id: DecisionId) -> Result<&DecisionRequest, DecisionError> {
        self.requests
            .get(&decision_id)
            .ok_or(DecisionError::UnknownDecision(decision_id))
    }

    pub fn answers(&self, decision_id: DecisionId) -> Result<&[Answer], DecisionError> {
        Ok(&self.get_decision(decision_id)?.answers)
    }

    pub fn resolvable_decisions(&self, now: Timestamp) -> Vec<DecisionId> {
        self.requests
            .values()
            .filter(|r| r.is_resolvable(now))
            .map(|r| r.id)
            .collect()
    }

    pub fn open_decision_count(&self) -> usize {
        self.requests.values().filter(|r| !r.resolved).count()
    }

    pub fn pending_reputation(&self) -> usize {
        self.reputation.len()
    }

    pub fn retry_reputation(&mut self) -> usize {
        self.reputation
            .retry(self.collaborators.reputation.as_ref())
    }

    pub fn snapshot(&self) -> DecisionEngineSnapshot {
        DecisionEngineSnapshot {
            requests: self.requests.clone(),
            next_id: self.next_id,
            pending_reputation: self.reputation.clone(),
        }
    }

    pub fn restore(
        snapshot: DecisionEngineSnapshot,
        params: EngineParams,
        collaborators: Collaborators,
        policy: Box<dyn SelectionPolicy>,
    ) -> Self {
        Self {
            params,
            collaborators,
            policy,
            requests: snapshot.requests,
            next_id: snapshot.next_id,
            reputation: snapshot.pending_reputation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MajorityAnswer;
    use consensus_nullables::Nulls;

    const PERIOD: u64 = 48 * 3600;

    fn addr(n: u8) -> AgentAddress {
        AgentAddress::new(format!("0x{:040x}", n))
    }

    fn cref(s: &str) -> ContentRef {
        ContentRef::new(s).unwrap()
    }

    fn setup() -> (Nulls, DecisionEngine) {
        let nulls = Nulls::default();
        for n in 1..=4 {
            nulls.directory.register(&addr(n));
        }
        let engine = DecisionEngine::new(EngineParams::default(), nulls.collaborators());
        (nulls, engine)
    }

    #[test]
    fn open_assigns_sequential_ids_and_announces() {
        let (nulls, mut engine) = setup();
        let first = engine.open_decision_request(cref("QmQ1"));
        let second = engine.open_decision_request(cref("QmQ2"));
        assert_eq!(first, DecisionId::new(0));
        assert_eq!(second, DecisionId::new(1));

        let request = engine.get_decision(first).unwrap();
        assert_eq!(request.end_time.as_secs() - request.created_at.as_secs(), PERIOD);
        assert_eq!(
            nulls.notifier.event_names(),
            vec!["decision_posted", "decision_posted"]
        );
    }

    #[test]
    fn answer_preconditions() {
        let (nulls, mut engine) = setup();
        let id = engine.open_decision_request(cref("QmQ"));

        assert_eq!(
            engine.submit_answer(DecisionId::new(7), &addr(1), cref("a")),
            Err(DecisionError::UnknownDecision(DecisionId::new(7)))
        );
        assert_eq!(
            engine.submit_answer(id, &addr(9), cref("a")),
            Err(DecisionError::NotRegistered(addr(9)))
        );

        engine.submit_answer(id, &addr(1), cref("a")).unwrap();
        assert!(matches!(
            engine.submit_answer(id, &addr(1), cref("b")),
            Err(DecisionError::AlreadyAnswered { .. })
        ));
        // the first answer is kept as submitted
        let kept = engine.get_decision(id).unwrap().answer_of(&addr(1)).unwrap();
        assert_eq!(kept.answer_ref, cref("a"));

        nulls.clock.advance(PERIOD);
        assert!(matches!(
            engine.submit_answer(id, &addr(2), cref("c")),
            Err(DecisionError::VotingClosed { .. })
        ));
    }

    #[test]
    fn resolve_picks_first_answer_and_credits_everyone() {
        let (nulls, mut engine) = setup();
        let id = engine.open_decision_request(cref("QmQ"));
        engine.submit_answer(id, &addr(2), cref("first")).unwrap();
        engine.submit_answer(id, &addr(3), cref("second")).unwrap();

        let early = engine.resolve_decision(id).unwrap_err();
        assert!(early.is_retriable());

        nulls.clock.advance(PERIOD);
        let resolution = engine.resolve_decision(id).unwrap();
        assert_eq!(resolution.participants, 2);
        assert_eq!(resolution.policy, "first_accepted");
        assert_eq!(resolution.accepted.unwrap().agent, addr(2));
        assert_eq!(nulls.directory.reputation(&addr(2)), 1);
        assert_eq!(nulls.directory.reputation(&addr(3)), 1);

        assert_eq!(
            engine.resolve_decision(id),
            Err(DecisionError::AlreadyResolved(id))
        );
        assert_eq!(nulls.directory.reputation(&addr(2)), 1);
        assert_eq!(
            engine.submit_answer(id, &addr(4), cref("late")),
            Err(DecisionError::AlreadyResolved(id))
        );
    }

    #[test]
    fn resolving_without_answers_accepts_nothing() {
        let (nulls, mut engine) = setup();
        let id = engine.open_decision_request(cref("QmQ"));
        nulls.clock.advance(PERIOD);
        let resolution = engine.resolve_decision(id).unwrap();
        assert!(resolution.accepted.is_none());
        assert_eq!(resolution.participants, 0);
        assert!(engine.get_decision(id).unwrap().resolved);
    }

    #[test]
    fn majority_policy_can_be_plugged_in() {
        let nulls = Nulls::default();
        for n in 1..=3 {
            nulls.directory.register(&addr(n));
        }
        let mut engine = DecisionEngine::with_policy(
            EngineParams::default(),
            nulls.collaborators(),
            Box::new(MajorityAnswer),
        );
        let id = engine.open_decision_request(cref("QmQ"));
        engine.submit_answer(id, &addr(1), cref("x")).unwrap();
        engine.submit_answer(id, &addr(2), cref("y")).unwrap();
        engine.submit_answer(id, &addr(3), cref("y")).unwrap();
        nulls.clock.advance(PERIOD);

        let resolution = engine.resolve_decision(id).unwrap();
        assert_eq!(resolution.accepted.unwrap().agent, addr(2));
    }

    #[test]
    fn credit_is_queued_while_directory_is_down() {
        let (nulls, mut engine) = setup();
        let id = engine.open_decision_request(cref("QmQ"));
        engine.submit_answer(id, &addr(1), cref("a")).unwrap();
        nulls.directory.set_unavailable(true);
        nulls.clock.advance(PERIOD);

        engine.resolve_decision(id).unwrap();
        assert_eq!(engine.pending_reputation(), 1);

        nulls.directory.set_unavailable(false);
        assert_eq!(engine.retry_reputation(), 1);
        assert_eq!(nulls.directory.reputation(&addr(1)), 1);
    }

    #[test]
    fn snapshot_round_trips() {
        let (nulls, mut engine) = setup();
        let id = engine.open_decision_request(cref("QmQ"));
        engine.submit_answer(id, &addr(1), cref("a")).unwrap();

        let bytes = bincode::serialize(&engine.snapshot()).unwrap();
        let snapshot: DecisionEngineSnapshot = bincode::deserialize(&bytes).unwrap();
        let mut restored = DecisionEngine::restore(
            snapshot,
            EngineParams::default(),
            nulls.collaborators(),
            PolicyKind::FirstAccepted.build(),
        );
        assert_eq!(restored.answers(id).unwrap().len(), 1);
        // id counter survives the restart
        assert_eq!(restored.open_decision_request(cref("QmNext")), DecisionId::new(1));
    }
}

//! Prometheus metrics for the consensus node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the HTTP `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use consensus_types::{EngineEvent, Wei};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub claims_submitted: IntCounter,
    pub votes_cast: IntCounter,
    pub rounds_resolved: IntCounter,
    pub decisions_opened: IntCounter,
    pub answers_submitted: IntCounter,
    pub decisions_resolved: IntCounter,
    /// Reputation adjustments that failed and were queued for retry.
    pub reputation_deferred: IntCounter,
    /// Rejected operations, labelled by error code.
    pub precondition_rejections: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub open_rounds: IntGauge,
    pub open_decisions: IntGauge,
    /// Total stake and fees held in escrow, saturating at `i64::MAX`.
    pub escrowed_wei: IntGauge,
    pub pending_reputation: IntGauge,
    pub registered_agents: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let claims_submitted = register_int_counter_with_registry!(
            Opts::new("consensus_claims_submitted_total", "Claims accepted for verification"),
            registry
        )
        .expect("failed to register claims_submitted counter");

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("consensus_votes_cast_total", "Stake-backed votes accepted"),
            registry
        )
        .expect("failed to register votes_cast counter");

        let rounds_resolved = register_int_counter_with_registry!(
            Opts::new("consensus_rounds_resolved_total", "Verification rounds settled"),
            registry
        )
        .expect("failed to register rounds_resolved counter");

        let decisions_opened = register_int_counter_with_registry!(
            Opts::new("consensus_decisions_opened_total", "Decision requests opened"),
            registry
        )
        .expect("failed to register decisions_opened counter");

        let answers_submitted = register_int_counter_with_registry!(
            Opts::new("consensus_answers_submitted_total", "Answers recorded on decision requests"),
            registry
        )
        .expect("failed to register answers_submitted counter");

        let decisions_resolved = register_int_counter_with_registry!(
            Opts::new("consensus_decisions_resolved_total", "Decision requests closed"),
            registry
        )
        .expect("failed to register decisions_resolved counter");

        let reputation_deferred = register_int_counter_with_registry!(
            Opts::new(
                "consensus_reputation_deferred_total",
                "Reputation adjustments queued after a delivery failure"
            ),
            registry
        )
        .expect("failed to register reputation_deferred counter");

        let precondition_rejections = register_int_counter_vec_with_registry!(
            Opts::new(
                "consensus_precondition_rejections_total",
                "Operations rejected by a precondition check"
            ),
            &["code"],
            registry
        )
        .expect("failed to register precondition_rejections counter");

        let open_rounds = register_int_gauge_with_registry!(
            Opts::new("consensus_open_rounds", "Rounds not yet resolved"),
            registry
        )
        .expect("failed to register open_rounds gauge");

        let open_decisions = register_int_gauge_with_registry!(
            Opts::new("consensus_open_decisions", "Decision requests not yet resolved"),
            registry
        )
        .expect("failed to register open_decisions gauge");

        let escrowed_wei = register_int_gauge_with_registry!(
            Opts::new("consensus_escrowed_wei", "Fees and stakes held in escrow"),
            registry
        )
        .expect("failed to register escrowed_wei gauge");

        let pending_reputation = register_int_gauge_with_registry!(
            Opts::new(
                "consensus_pending_reputation",
                "Reputation adjustments waiting for retry"
            ),
            registry
        )
        .expect("failed to register pending_reputation gauge");

        let registered_agents = register_int_gauge_with_registry!(
            Opts::new("consensus_registered_agents", "Agents in the registry"),
            registry
        )
        .expect("failed to register registered_agents gauge");

        Self {
            registry,
            claims_submitted,
            votes_cast,
            rounds_resolved,
            decisions_opened,
            answers_submitted,
            decisions_resolved,
            reputation_deferred,
            precondition_rejections,
            open_rounds,
            open_decisions,
            escrowed_wei,
            pending_reputation,
            registered_agents,
        }
    }

    /// Bump the counter matching an emitted engine event.
    pub fn observe_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::ClaimSubmitted { .. } => self.claims_submitted.inc(),
            EngineEvent::VoteCast { .. } => self.votes_cast.inc(),
            EngineEvent::RoundResolved { .. } => self.rounds_resolved.inc(),
            EngineEvent::ReputationDeferred { .. } => self.reputation_deferred.inc(),
            EngineEvent::DecisionPosted { .. } => self.decisions_opened.inc(),
            EngineEvent::AnswerSubmitted { .. } => self.answers_submitted.inc(),
            EngineEvent::DecisionResolved { .. } => self.decisions_resolved.inc(),
        }
    }

    pub fn record_rejection(&self, code: &str) {
        self.precondition_rejections.with_label_values(&[code]).inc();
    }

    pub fn set_escrowed(&self, total: Wei) {
        self.escrowed_wei
            .set(i64::try_from(total.raw()).unwrap_or(i64::MAX));
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

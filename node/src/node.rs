//! The consensus node: hosts both engines and the in-memory collaborators,
//! fans engine events out, runs background tasks and persists state.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use consensus_decisions::{DecisionEngine, DecisionError, DecisionRequest, DecisionResolution};
use consensus_staking::{RoundEngine, Settlement, StakingError, VerificationRound, Vote};
use consensus_store::{ClaimStore, Collaborators, IdentityDirectory};
use consensus_types::{
    Agent, AgentAddress, Category, Claim, ClaimId, Clock, ContentRef, DecisionId, EngineParams,
    Outcome, SystemClock, Timestamp, Wei,
};
use consensus_websocket::{WebSocketServer, WsState};

use crate::claims::ClaimLedger;
use crate::config::NodeConfig;
use crate::events::EventBus;
use crate::metrics::NodeMetrics;
use crate::persistence::NodeSnapshot;
use crate::registry::{AgentRegistry, RegistryError};
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// How long `stop` waits for background tasks before giving up on them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What one sweeper pass resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rounds_resolved: usize,
    pub decisions_resolved: usize,
}

/// A running consensus node.
///
/// Engines sit behind their own async mutex. When both are needed the round
/// engine is locked first.
pub struct ConsensusNode {
    pub config: NodeConfig,
    pub rounds: Arc<Mutex<RoundEngine>>,
    pub decisions: Arc<Mutex<DecisionEngine>>,
    pub registry: Arc<AgentRegistry>,
    pub claims: Arc<ClaimLedger>,
    pub metrics: Arc<NodeMetrics>,
    pub ws_state: Arc<WsState>,
    pub shutdown: Arc<ShutdownController>,
    clock: Arc<dyn Clock>,
    task_handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl ConsensusNode {
    /// Build a node on the wall clock, restoring `<data_dir>/state.bin` if present.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        let snapshot_path = config.snapshot_path();
        let snapshot = match NodeSnapshot::load(&snapshot_path)? {
            Some(snapshot) => {
                tracing::info!(path = %snapshot_path.display(), "restoring state snapshot");
                snapshot
            }
            None => NodeSnapshot::default(),
        };

        let registry = Arc::new(AgentRegistry::restore(snapshot.registry));
        let claims = Arc::new(ClaimLedger::restore(snapshot.claims)?);
        let metrics = Arc::new(NodeMetrics::new());
        let ws_state = Arc::new(WsState::default());

        let mut bus = EventBus::new();
        {
            let ws_state = Arc::clone(&ws_state);
            bus.subscribe(Box::new(move |event| {
                ws_state.publish(event);
            }));
        }
        {
            let metrics = Arc::clone(&metrics);
            bus.subscribe(Box::new(move |event| metrics.observe_event(event)));
        }

        let collaborators = Collaborators {
            directory: registry.clone(),
            reputation: registry.clone(),
            claims: claims.clone(),
            notifier: Arc::new(bus),
            clock: Arc::clone(&clock),
        };

        let rounds = RoundEngine::restore(
            snapshot.rounds,
            config.params.clone(),
            collaborators.clone(),
        );
        let decisions = DecisionEngine::restore(
            snapshot.decisions,
            config.params.clone(),
            collaborators,
            config.decision_policy.build(),
        );

        metrics.open_rounds.set(rounds.open_round_count() as i64);
        metrics.set_escrowed(rounds.total_escrowed());
        metrics.open_decisions.set(decisions.open_decision_count() as i64);
        metrics
            .pending_reputation
            .set((rounds.pending_reputation() + decisions.pending_reputation()) as i64);
        metrics.registered_agents.set(registry.agent_count() as i64);

        tracing::info!(
            rounds = rounds.round_count(),
            agents = registry.agent_count(),
            policy = decisions.policy_name(),
            "consensus node initialised"
        );

        Ok(Self {
            config,
            rounds: Arc::new(Mutex::new(rounds)),
            decisions: Arc::new(Mutex::new(decisions)),
            registry,
            claims,
            metrics,
            ws_state,
            shutdown: Arc::new(ShutdownController::new()),
            clock,
            task_handles: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn params(&self) -> &EngineParams {
        &self.config.params
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Count caller-correctable failures by code before handing them back.
    fn track<T>(&self, result: Result<T, NodeError>) -> Result<T, NodeError> {
        if let Err(e) = &result {
            if e.is_precondition() {
                self.metrics.record_rejection(e.code());
            }
        }
        result
    }

    fn refresh_round_gauges(&self, rounds: &RoundEngine) {
        self.metrics.open_rounds.set(rounds.open_round_count() as i64);
        self.metrics.set_escrowed(rounds.total_escrowed());
    }

    async fn refresh_pending_gauge(&self) {
        let rounds = self.rounds.lock().await.pending_reputation();
        let decisions = self.decisions.lock().await.pending_reputation();
        self.metrics.pending_reputation.set((rounds + decisions) as i64);
    }

    // ── Agents ─────────────────────────────────────────────────────────

    pub fn register_agent(&self, address: &AgentAddress, agent_id: &str) -> Result<Agent, NodeError> {
        let result = self.registry.register_agent(address, agent_id).map_err(NodeError::from);
        if result.is_ok() {
            self.metrics.registered_agents.set(self.registry.agent_count() as i64);
        }
        self.track(result)
    }

    pub fn get_agent(&self, address: &AgentAddress) -> Result<Agent, NodeError> {
        self.registry
            .get_agent(address)
            .ok_or_else(|| RegistryError::UnknownAgent(address.clone()).into())
    }

    // ── Claims and rounds ──────────────────────────────────────────────

    pub async fn submit_claim(
        &self,
        author: &AgentAddress,
        content_ref: ContentRef,
        category: Category,
        fee_paid: Wei,
    ) -> Result<ClaimId, NodeError> {
        let mut rounds = self.rounds.lock().await;
        let result = rounds
            .submit_claim(author, content_ref, category, fee_paid)
            .map_err(NodeError::from);
        self.refresh_round_gauges(&rounds);
        self.track(result)
    }

    pub async fn cast_vote(
        &self,
        claim_id: ClaimId,
        voter: &AgentAddress,
        support: bool,
        stake: Wei,
    ) -> Result<(), NodeError> {
        let mut rounds = self.rounds.lock().await;
        let result = rounds
            .cast_vote(claim_id, voter, support, stake)
            .map_err(NodeError::from);
        self.refresh_round_gauges(&rounds);
        self.track(result)
    }

    pub async fn resolve_round(&self, claim_id: ClaimId) -> Result<Outcome, NodeError> {
        let result = {
            let mut rounds = self.rounds.lock().await;
            let result = rounds.resolve_round(claim_id).map_err(NodeError::from);
            self.refresh_round_gauges(&rounds);
            result
        };
        self.refresh_pending_gauge().await;
        self.track(result)
    }

    pub async fn get_round(&self, claim_id: ClaimId) -> Result<VerificationRound, NodeError> {
        let rounds = self.rounds.lock().await;
        let result = rounds.get_round(claim_id).cloned().map_err(NodeError::from);
        self.track(result)
    }

    pub async fn votes(&self, claim_id: ClaimId) -> Result<Vec<Vote>, NodeError> {
        let rounds = self.rounds.lock().await;
        let result = rounds.votes(claim_id).map(<[Vote]>::to_vec).map_err(NodeError::from);
        self.track(result)
    }

    pub async fn settlement(&self, claim_id: ClaimId) -> Option<Settlement> {
        self.rounds.lock().await.settlement(claim_id).cloned()
    }

    pub fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, NodeError> {
        self.track(self.claims.get_claim(claim_id).map_err(NodeError::from))
    }

    pub fn claim_count(&self) -> Result<u64, NodeError> {
        Ok(self.claims.claim_count()?)
    }

    pub fn list_claims(&self, offset: u64, limit: usize) -> Result<Vec<Claim>, NodeError> {
        Ok(self.claims.list_claims(offset, limit)?)
    }

    // ── Balances ───────────────────────────────────────────────────────

    pub async fn balance_of(&self, address: &AgentAddress) -> Wei {
        self.rounds.lock().await.balance_of(address)
    }

    pub async fn withdraw(&self, address: &AgentAddress) -> Result<Wei, NodeError> {
        let result = self
            .rounds
            .lock()
            .await
            .withdraw(address)
            .map_err(NodeError::from);
        self.track(result)
    }

    pub async fn remainder_balance(&self) -> Wei {
        self.rounds.lock().await.remainder_balance()
    }

    // ── Decisions ──────────────────────────────────────────────────────

    pub async fn open_decision_request(&self, question_ref: ContentRef) -> DecisionId {
        let mut decisions = self.decisions.lock().await;
        let id = decisions.open_decision_request(question_ref);
        self.metrics.open_decisions.set(decisions.open_decision_count() as i64);
        id
    }

    pub async fn submit_answer(
        &self,
        decision_id: DecisionId,
        agent: &AgentAddress,
        answer_ref: ContentRef,
    ) -> Result<(), NodeError> {
        let result = self
            .decisions
            .lock()
            .await
            .submit_answer(decision_id, agent, answer_ref)
            .map_err(NodeError::from);
        self.track(result)
    }

    pub async fn resolve_decision(
        &self,
        decision_id: DecisionId,
    ) -> Result<DecisionResolution, NodeError> {
        let result = {
            let mut decisions = self.decisions.lock().await;
            let result = decisions.resolve_decision(decision_id).map_err(NodeError::from);
            self.metrics.open_decisions.set(decisions.open_decision_count() as i64);
            result
        };
        self.refresh_pending_gauge().await;
        self.track(result)
    }

    pub async fn get_decision(&self, decision_id: DecisionId) -> Result<DecisionRequest, NodeError> {
        let decisions = self.decisions.lock().await;
        let result = decisions.get_decision(decision_id).cloned().map_err(NodeError::from);
        self.track(result)
    }

    // ── Maintenance ────────────────────────────────────────────────────

    /// Resolve every round and decision request whose deadline has passed.
    /// Requests resolved concurrently by someone else are skipped.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        {
            let mut rounds = self.rounds.lock().await;
            for claim_id in rounds.resolvable_rounds(self.now()) {
                match rounds.resolve_round(claim_id) {
                    Ok(outcome) => {
                        report.rounds_resolved += 1;
                        tracing::debug!(%claim_id, %outcome, "sweeper resolved round");
                    }
                    Err(StakingError::AlreadyResolved(_)) => {}
                    Err(e) => tracing::warn!(%claim_id, error = %e, "sweeper failed to resolve round"),
                }
            }
            self.refresh_round_gauges(&rounds);
        }

        {
            let mut decisions = self.decisions.lock().await;
            for decision_id in decisions.resolvable_decisions(self.now()) {
                match decisions.resolve_decision(decision_id) {
                    Ok(_) => report.decisions_resolved += 1,
                    Err(DecisionError::AlreadyResolved(_)) => {}
                    Err(e) => {
                        tracing::warn!(%decision_id, error = %e, "sweeper failed to resolve decision")
                    }
                }
            }
            self.metrics.open_decisions.set(decisions.open_decision_count() as i64);
        }

        self.refresh_pending_gauge().await;
        if report != SweepReport::default() {
            tracing::info!(
                rounds = report.rounds_resolved,
                decisions = report.decisions_resolved,
                "sweep complete"
            );
        }
        report
    }

    /// Re-deliver queued reputation adjustments. Returns how many landed.
    pub async fn retry_reputation(&self) -> usize {
        let delivered = self.rounds.lock().await.retry_reputation()
            + self.decisions.lock().await.retry_reputation();
        self.refresh_pending_gauge().await;
        if delivered > 0 {
            tracing::info!(delivered, "deferred reputation adjustments delivered");
        }
        delivered
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        let rounds = self.rounds.lock().await;
        let decisions = self.decisions.lock().await;
        NodeSnapshot {
            rounds: rounds.snapshot(),
            decisions: decisions.snapshot(),
            registry: self.registry.snapshot(),
            claims: self.claims.snapshot(),
        }
    }

    pub async fn state_digest(&self) -> Result<String, NodeError> {
        self.snapshot().await.digest()
    }

    pub async fn save_snapshot(&self) -> Result<(), NodeError> {
        let path = self.config.snapshot_path();
        self.snapshot().await.save(&path)?;
        tracing::info!(path = %path.display(), "state snapshot saved");
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Spawn the background tasks and, if enabled, the WebSocket server.
    pub async fn start(self: &Arc<Self>) -> Result<(), NodeError> {
        tracing::info!(
            data_dir = %self.config.data_dir.display(),
            auto_resolve = self.config.auto_resolve,
            "consensus node starting"
        );
        let mut handles = Vec::new();

        let sweep_every = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        if self.config.auto_resolve {
            let node = Arc::clone(self);
            handles.push(self.spawn_periodic("sweeper", sweep_every, move || {
                let node = Arc::clone(&node);
                async move {
                    node.sweep().await;
                }
            }));
        }

        {
            let node = Arc::clone(self);
            handles.push(self.spawn_periodic("reputation retry", sweep_every, move || {
                let node = Arc::clone(&node);
                async move {
                    node.retry_reputation().await;
                }
            }));
        }

        if self.config.snapshot_interval_secs > 0 {
            let node = Arc::clone(self);
            let every = Duration::from_secs(self.config.snapshot_interval_secs);
            handles.push(self.spawn_periodic("snapshot", every, move || {
                let node = Arc::clone(&node);
                async move {
                    if let Err(e) = node.save_snapshot().await {
                        tracing::error!(error = %e, "periodic snapshot failed");
                    }
                }
            }));
        }

        if self.config.enable_websocket {
            let addr = format!("0.0.0.0:{}", self.config.websocket_port);
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|e| NodeError::WebSocket(format!("{addr}: {e}")))?;
            tracing::info!("WebSocket server listening on {}", addr);
            let server = WebSocketServer::with_state(self.config.websocket_port, Arc::clone(&self.ws_state));
            let mut shutdown_rx = self.shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => {}
                    result = server.serve(listener) => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "WebSocket server stopped");
                        }
                    }
                }
            }));
        }

        self.task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(handles);
        Ok(())
    }

    fn spawn_periodic<F, Fut>(&self, name: &'static str, every: Duration, mut tick: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("{} task shutting down", name);
                        break;
                    }
                    _ = interval.tick() => tick().await,
                }
            }
        })
    }

    /// Signal every task, wait for them, then write a final snapshot.
    pub async fn stop(&self) -> Result<(), NodeError> {
        tracing::info!("consensus node stopping");
        self.shutdown.shutdown();

        let handles: Vec<_> = self
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
            for handle in handles {
                let _ = handle.await;
            }
        })
        .await;

        self.save_snapshot().await?;
        if joined.is_err() {
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("consensus node stopped");
        Ok(())
    }
}

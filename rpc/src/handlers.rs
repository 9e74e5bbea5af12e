//! HTTP request handlers and their wire types.
//!
//! Amounts travel as decimal wei strings in both directions.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use consensus_decisions::{DecisionRequest, DecisionResolution};
use consensus_staking::{RoundPhase, Settlement, VerificationRound, Vote};
use consensus_types::{
    Agent, AgentAddress, Category, Claim, ClaimId, ContentRef, DecisionId, EngineParams, Outcome,
    Timestamp, Wei,
};

use crate::error::RpcError;
use crate::pagination::{Page, PaginationParams};
use crate::server::RpcState;

type RpcResult<T> = Result<T, RpcError>;

// ── Agents ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub address: String,
    pub agent_id: String,
}

pub async fn register_agent(
    State(state): State<RpcState>,
    Json(req): Json<RegisterAgentRequest>,
) -> RpcResult<(StatusCode, Json<Agent>)> {
    let address = AgentAddress::parse(&req.address)?;
    let agent = state.node.register_agent(&address, &req.agent_id)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    State(state): State<RpcState>,
    Path(address): Path<String>,
) -> RpcResult<Json<Agent>> {
    let address = AgentAddress::parse(&address)?;
    Ok(Json(state.node.get_agent(&address)?))
}

// ── Claims and rounds ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub author: String,
    pub content_ref: String,
    pub category: Category,
    /// Entry fee paid, in wei.
    pub fee: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitClaimResponse {
    pub claim_id: ClaimId,
    pub end_time: Timestamp,
}

pub async fn submit_claim(
    State(state): State<RpcState>,
    Json(req): Json<SubmitClaimRequest>,
) -> RpcResult<(StatusCode, Json<SubmitClaimResponse>)> {
    let author = AgentAddress::parse(&req.author)?;
    let content_ref = ContentRef::new(req.content_ref)?;
    let fee: Wei = req.fee.parse()?;
    let claim_id = state
        .node
        .submit_claim(&author, content_ref, req.category, fee)
        .await?;
    let end_time = state.node.get_round(claim_id).await?.end_time;
    Ok((
        StatusCode::CREATED,
        Json(SubmitClaimResponse { claim_id, end_time }),
    ))
}

pub async fn list_claims(
    State(state): State<RpcState>,
    Query(params): Query<PaginationParams>,
) -> RpcResult<Json<Page<Claim>>> {
    let offset = params
        .offset()
        .ok_or_else(|| RpcError::InvalidRequest("malformed cursor".into()))?;
    let count = params.effective_count();
    let claims = state.node.list_claims(offset, count as usize)?;
    let total = state.node.claim_count()?;
    Ok(Json(Page::new(claims, offset, count, total)))
}

pub async fn get_claim(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<Claim>> {
    Ok(Json(state.node.get_claim(ClaimId::new(id))?))
}

#[derive(Debug, Serialize)]
pub struct RoundView {
    #[serde(flatten)]
    pub round: VerificationRound,
    pub phase: RoundPhase,
}

pub async fn get_round(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<RoundView>> {
    let round = state.node.get_round(ClaimId::new(id)).await?;
    let phase = round.phase(state.node.now());
    Ok(Json(RoundView { round, phase }))
}

pub async fn list_votes(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<Vec<Vote>>> {
    Ok(Json(state.node.votes(ClaimId::new(id)).await?))
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter: String,
    pub support: bool,
    /// Stake locked with the vote, in wei.
    pub stake: String,
}

pub async fn cast_vote(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
    Json(req): Json<CastVoteRequest>,
) -> RpcResult<(StatusCode, Json<Vote>)> {
    let claim_id = ClaimId::new(id);
    let voter = AgentAddress::parse(&req.voter)?;
    let stake: Wei = req.stake.parse()?;
    state.node.cast_vote(claim_id, &voter, req.support, stake).await?;
    let votes = state.node.votes(claim_id).await?;
    let vote = votes
        .into_iter()
        .find(|v| v.voter == voter)
        .ok_or_else(|| RpcError::InvalidRequest(format!("vote by {voter} not recorded")))?;
    Ok((StatusCode::CREATED, Json(vote)))
}

#[derive(Debug, Serialize)]
pub struct ResolveRoundResponse {
    pub claim_id: ClaimId,
    pub outcome: Outcome,
    pub settlement: Option<Settlement>,
}

pub async fn resolve_round(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<ResolveRoundResponse>> {
    let claim_id = ClaimId::new(id);
    let outcome = state.node.resolve_round(claim_id).await?;
    let settlement = state.node.settlement(claim_id).await;
    Ok(Json(ResolveRoundResponse {
        claim_id,
        outcome,
        settlement,
    }))
}

// ── Decisions ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenDecisionRequest {
    pub question_ref: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenDecisionResponse {
    pub decision_id: DecisionId,
    pub end_time: Timestamp,
}

pub async fn open_decision(
    State(state): State<RpcState>,
    Json(req): Json<OpenDecisionRequest>,
) -> RpcResult<(StatusCode, Json<OpenDecisionResponse>)> {
    let question_ref = ContentRef::new(req.question_ref)?;
    let decision_id = state.node.open_decision_request(question_ref).await;
    let end_time = state.node.get_decision(decision_id).await?.end_time;
    Ok((
        StatusCode::CREATED,
        Json(OpenDecisionResponse {
            decision_id,
            end_time,
        }),
    ))
}

pub async fn get_decision(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<DecisionRequest>> {
    Ok(Json(state.node.get_decision(DecisionId::new(id)).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub agent: String,
    pub answer_ref: String,
}

pub async fn submit_answer(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> RpcResult<StatusCode> {
    let agent = AgentAddress::parse(&req.agent)?;
    let answer_ref = ContentRef::new(req.answer_ref)?;
    state
        .node
        .submit_answer(DecisionId::new(id), &agent, answer_ref)
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn resolve_decision(
    State(state): State<RpcState>,
    Path(id): Path<u64>,
) -> RpcResult<Json<DecisionResolution>> {
    Ok(Json(state.node.resolve_decision(DecisionId::new(id)).await?))
}

// ── Balances ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: AgentAddress,
    pub balance: Wei,
}

pub async fn get_balance(
    State(state): State<RpcState>,
    Path(address): Path<String>,
) -> RpcResult<Json<BalanceResponse>> {
    let address = AgentAddress::parse(&address)?;
    let balance = state.node.balance_of(&address).await;
    Ok(Json(BalanceResponse { address, balance }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub address: AgentAddress,
    pub amount: Wei,
}

pub async fn withdraw(
    State(state): State<RpcState>,
    Path(address): Path<String>,
) -> RpcResult<Json<WithdrawResponse>> {
    let address = AgentAddress::parse(&address)?;
    let amount = state.node.withdraw(&address).await?;
    Ok(Json(WithdrawResponse { address, amount }))
}

// ── Node ─────────────────────────────────────────────────────────────────

pub async fn get_params(State(state): State<RpcState>) -> Json<EngineParams> {
    Json(state.node.params().clone())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub now: Timestamp,
    pub claims: u64,
    pub open_rounds: i64,
    pub open_decisions: i64,
    pub pending_reputation: i64,
    pub remainder_balance: Wei,
}

pub async fn health(State(state): State<RpcState>) -> RpcResult<Json<HealthResponse>> {
    let node = &state.node;
    Ok(Json(HealthResponse {
        status: "ok",
        now: node.now(),
        claims: node.claim_count()?,
        open_rounds: node.metrics.open_rounds.get(),
        open_decisions: node.metrics.open_decisions.get(),
        pending_reputation: node.metrics.pending_reputation.get(),
        remainder_balance: node.remainder_balance().await,
    }))
}

pub async fn metrics(State(state): State<RpcState>) -> RpcResult<impl IntoResponse> {
    if !state.node.config.enable_metrics {
        return Err(RpcError::MetricsDisabled);
    }
    let body = state
        .node
        .metrics
        .encode_text()
        .map_err(|e| RpcError::Metrics(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

//! End-to-end tests of the HTTP API, driving the axum router in-process.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use consensus_node::{ConsensusNode, NodeConfig};
use consensus_nullables::NullClock;
use consensus_rpc::{RpcServer, RpcState};

const DAY: u64 = 24 * 3600;
const AUTHOR: &str = "0x00000000000000000000000000000000000000a1";
const ALICE: &str = "0x00000000000000000000000000000000000000a2";
const BOB: &str = "0x00000000000000000000000000000000000000a3";

struct Harness {
    router: Router,
    clock: Arc<NullClock>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(enable_metrics: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            enable_metrics,
            ..NodeConfig::default()
        };
        let clock = Arc::new(NullClock::new(1_700_000_000));
        let node = Arc::new(ConsensusNode::with_clock(config, clock.clone()).unwrap());
        Self {
            router: RpcServer::router(RpcState { node }),
            clock,
            _dir: dir,
        }
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, address: &str, agent_id: &str) {
        let (status, _) = self
            .call(
                "POST",
                "/agents",
                Some(json!({ "address": address, "agent_id": agent_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn submit_claim(&self) -> u64 {
        let (status, body) = self
            .call(
                "POST",
                "/claims",
                Some(json!({
                    "author": AUTHOR,
                    "content_ref": "QmClaim",
                    "category": "news",
                    "fee": "1000000000000000",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["claim_id"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn full_round_over_http() {
    let h = Harness::new(false);
    h.register(AUTHOR, "author").await;
    h.register(ALICE, "alice").await;
    h.register(BOB, "bob").await;

    let id = h.submit_claim().await;
    assert_eq!(id, 0);

    let (status, vote) = h
        .call(
            "POST",
            &format!("/claims/{id}/votes"),
            Some(json!({ "voter": ALICE, "support": true, "stake": "200000000000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(vote["amount"], "200000000000000");

    let (status, _) = h
        .call(
            "POST",
            &format!("/claims/{id}/votes"),
            Some(json!({ "voter": BOB, "support": false, "stake": "100000000000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, round) = h.call("GET", &format!("/claims/{id}/round"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round["phase"], "open");
    assert_eq!(round["total_valid_stake"], "200000000000000");

    h.clock.advance(DAY);
    let (status, resolved) = h.call("POST", &format!("/claims/{id}/resolve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["outcome"], "valid");

    let (_, balance) = h.call("GET", &format!("/balances/{ALICE}"), None).await;
    assert_eq!(balance["balance"], "300000000000000");

    let (status, withdrawn) = h
        .call("POST", &format!("/balances/{ALICE}/withdraw"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(withdrawn["amount"], "300000000000000");

    let (_, agent) = h.call("GET", &format!("/agents/{ALICE}"), None).await;
    assert_eq!(agent["reputation_score"], 5);
}

#[tokio::test]
async fn precondition_errors_carry_code_and_retry_hint() {
    let h = Harness::new(false);
    h.register(AUTHOR, "author").await;
    let id = h.submit_claim().await;

    let (status, body) = h.call("POST", &format!("/claims/{id}/resolve"), None).await;
    assert_eq!(status, StatusCode::TOO_EARLY);
    assert_eq!(body["code"], "too_early");
    assert_eq!(body["retriable"], true);

    let (status, body) = h
        .call(
            "POST",
            &format!("/claims/{id}/votes"),
            Some(json!({ "voter": AUTHOR, "support": true, "stake": "100000000000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "self_vote_forbidden");
    assert_eq!(body["retriable"], false);

    let (status, body) = h.call("GET", "/claims/99/round", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "unknown_claim");

    let (status, body) = h
        .call(
            "POST",
            "/claims",
            Some(json!({
                "author": AUTHOR,
                "content_ref": "QmClaim",
                "category": "news",
                "fee": "1",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "incorrect_fee");

    let (status, body) = h.call("GET", "/agents/not-an-address", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn claims_feed_paginates() {
    let h = Harness::new(false);
    h.register(AUTHOR, "author").await;
    for _ in 0..3 {
        h.submit_claim().await;
    }

    let (status, page) = h.call("GET", "/claims?count=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 3);
    let cursor = page["next_cursor"].as_str().unwrap().to_string();

    let (_, page) = h
        .call("GET", &format!("/claims?count=2&cursor={cursor}"), None)
        .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["id"], 2);
    assert!(page.get("next_cursor").is_none());
}

#[tokio::test]
async fn decision_flow_over_http() {
    let h = Harness::new(false);
    h.register(ALICE, "alice").await;

    let (status, opened) = h
        .call("POST", "/decisions", Some(json!({ "question_ref": "QmQuestion" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = opened["decision_id"].as_u64().unwrap();

    let answer = json!({ "agent": ALICE, "answer_ref": "QmAnswer" });
    let (status, _) = h
        .call("POST", &format!("/decisions/{id}/answers"), Some(answer.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = h
        .call("POST", &format!("/decisions/{id}/answers"), Some(answer))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_answered");

    h.clock.advance(2 * DAY);
    let (status, resolution) = h
        .call("POST", &format!("/decisions/{id}/resolve"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["participants"], 1);

    let (_, request) = h.call("GET", &format!("/decisions/{id}"), None).await;
    assert_eq!(request["resolved"], true);
}

#[tokio::test]
async fn params_health_and_metrics() {
    let h = Harness::new(true);
    let (status, params) = h.call("GET", "/params", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(params["entry_fee"], "1000000000000000");

    let (status, health) = h.call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("consensus_open_rounds"));

    let disabled = Harness::new(false);
    let (status, body) = disabled.call("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "metrics_disabled");
}

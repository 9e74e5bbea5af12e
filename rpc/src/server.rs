//! Axum-based HTTP server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use consensus_node::ConsensusNode;

use crate::error::RpcError;
use crate::handlers;

/// State shared by every handler.
#[derive(Clone)]
pub struct RpcState {
    pub node: Arc<ConsensusNode>,
}

pub struct RpcServer {
    pub port: u16,
    state: RpcState,
}

impl RpcServer {
    pub fn new(port: u16, node: Arc<ConsensusNode>) -> Self {
        Self {
            port,
            state: RpcState { node },
        }
    }

    pub fn router(state: RpcState) -> Router {
        Router::new()
            .route("/agents", post(handlers::register_agent))
            .route("/agents/:address", get(handlers::get_agent))
            .route(
                "/claims",
                get(handlers::list_claims).post(handlers::submit_claim),
            )
            .route("/claims/:id", get(handlers::get_claim))
            .route("/claims/:id/round", get(handlers::get_round))
            .route(
                "/claims/:id/votes",
                get(handlers::list_votes).post(handlers::cast_vote),
            )
            .route("/claims/:id/resolve", post(handlers::resolve_round))
            .route("/decisions", post(handlers::open_decision))
            .route("/decisions/:id", get(handlers::get_decision))
            .route("/decisions/:id/answers", post(handlers::submit_answer))
            .route("/decisions/:id/resolve", post(handlers::resolve_decision))
            .route("/balances/:address", get(handlers::get_balance))
            .route("/balances/:address/withdraw", post(handlers::withdraw))
            .route("/params", get(handlers::get_params))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured port and serve until the node shuts down.
    pub async fn start(&self) -> Result<(), RpcError> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RpcError::Bind {
                addr: addr.clone(),
                source,
            })?;
        tracing::info!("HTTP API listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener until the node shuts down.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RpcError> {
        let mut shutdown_rx = self.state.node.shutdown.subscribe();
        axum::serve(listener, Self::router(self.state.clone()))
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await;
            })
            .await?;
        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

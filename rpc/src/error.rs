//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use consensus_node::NodeError;
use consensus_types::TypeError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error("metrics encoding failed: {0}")]
    Metrics(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<TypeError> for RpcError {
    fn from(e: TypeError) -> Self {
        RpcError::InvalidRequest(e.to_string())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

impl RpcError {
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Node(e) => e.code(),
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::MetricsDisabled => "metrics_disabled",
            RpcError::Metrics(_) => "metrics_error",
            RpcError::Bind { .. } | RpcError::Server(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "unknown_claim" | "unknown_decision" | "unknown_agent" | "not_found"
            | "metrics_disabled" => StatusCode::NOT_FOUND,
            "not_registered" | "self_vote_forbidden" => StatusCode::FORBIDDEN,
            "already_resolved" | "already_registered" | "duplicate_vote"
            | "already_answered" | "voting_closed" | "nothing_to_withdraw" => {
                StatusCode::CONFLICT
            }
            "too_early" => StatusCode::TOO_EARLY,
            "incorrect_fee" | "stake_too_low" | "amount_overflow" | "empty_agent_id"
            | "invalid_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retriable(&self) -> bool {
        match self {
            RpcError::Node(e) => e.is_retriable(),
            _ => false,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            retriable: self.retriable(),
        };
        (status, Json(body)).into_response()
    }
}

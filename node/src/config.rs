//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use consensus_decisions::PolicyKind;
use consensus_types::EngineParams;
use consensus_utils::LogFormat;

use crate::NodeError;

/// Configuration for a consensus node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the state snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether to enable the HTTP API.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to enable the WebSocket event stream.
    #[serde(default)]
    pub enable_websocket: bool,

    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Resolve rounds and decision requests automatically once their deadline passes.
    #[serde(default)]
    pub auto_resolve: bool,

    /// Period of the resolution sweeper and the reputation retry task.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Period of background snapshot writes. Zero disables them; a snapshot
    /// is still written at shutdown.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    /// Whether to expose Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,

    /// How resolved decision requests pick their accepted answer.
    #[serde(default)]
    pub decision_policy: PolicyKind,

    /// Engine parameters (fees, windows, reputation deltas).
    #[serde(default)]
    pub params: EngineParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./consensus_data")
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    7077
}

fn default_ws_port() -> u16 {
    7078
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_snapshot_interval() -> u64 {
    300
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Where the state snapshot lives.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("state.bin")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enable_rpc: default_true(),
            rpc_port: default_rpc_port(),
            enable_websocket: false,
            websocket_port: default_ws_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            auto_resolve: false,
            sweep_interval_secs: default_sweep_interval(),
            snapshot_interval_secs: default_snapshot_interval(),
            enable_metrics: false,
            decision_policy: PolicyKind::default(),
            params: EngineParams::default(),
        }
    }
}

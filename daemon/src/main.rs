//! Consensus daemon: entry point for running a consensus node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use consensus_node::{ConsensusNode, NodeConfig};
use consensus_rpc::RpcServer;
use consensus_types::EngineParams;
use consensus_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "consensus-daemon", about = "Agent claim verification node")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "CONSENSUS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the state snapshot.
    #[arg(long, env = "CONSENSUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Disable the HTTP API.
    #[arg(long, env = "CONSENSUS_DISABLE_RPC")]
    no_rpc: bool,

    #[arg(long, env = "CONSENSUS_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable the WebSocket event stream.
    #[arg(long, env = "CONSENSUS_ENABLE_WEBSOCKET")]
    websocket: bool,

    #[arg(long, env = "CONSENSUS_WS_PORT")]
    websocket_port: Option<u16>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "CONSENSUS_ENABLE_METRICS")]
    metrics: bool,

    /// Resolve expired rounds and decision requests automatically.
    #[arg(long, env = "CONSENSUS_AUTO_RESOLVE")]
    auto_resolve: bool,

    /// Use short testnet voting and decision windows.
    #[arg(long, env = "CONSENSUS_TESTNET")]
    testnet: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CONSENSUS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CONSENSUS_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print the effective configuration as TOML.
    #[command(name = "config")]
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
}

impl Cli {
    /// Layer CLI flags and env vars over the file (or default) configuration.
    fn resolve_config(&self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => NodeConfig::default(),
        };

        let mut config = NodeConfig {
            data_dir: self.data_dir.clone().unwrap_or(base.data_dir.clone()),
            enable_rpc: base.enable_rpc && !self.no_rpc,
            rpc_port: self.rpc_port.unwrap_or(base.rpc_port),
            enable_websocket: base.enable_websocket || self.websocket,
            websocket_port: self.websocket_port.unwrap_or(base.websocket_port),
            enable_metrics: base.enable_metrics || self.metrics,
            auto_resolve: base.auto_resolve || self.auto_resolve,
            log_level: self.log_level.clone().unwrap_or(base.log_level.clone()),
            log_format: self
                .log_format
                .as_deref()
                .map(LogFormat::from_name)
                .unwrap_or(base.log_format),
            ..base
        };
        if self.testnet {
            config.params = EngineParams::testnet();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Command::Config => {
            println!("{}", config.to_toml_string()?);
        }
        Command::Node { action } => match action {
            NodeAction::Run => run(config).await?,
        },
    }

    Ok(())
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level);
    tracing::info!(
        "Starting consensus node (RPC:{}, WS:{}, auto-resolve:{})",
        if config.enable_rpc {
            config.rpc_port.to_string()
        } else {
            "off".into()
        },
        if config.enable_websocket {
            config.websocket_port.to_string()
        } else {
            "off".into()
        },
        config.auto_resolve,
    );
    tracing::info!(
        entry_fee = %config.params.entry_fee,
        min_stake = %config.params.min_stake,
        voting_period = %format_duration(config.params.voting_period_secs),
        decision_period = %format_duration(config.params.decision_period_secs),
        "engine parameters"
    );

    let node = Arc::new(ConsensusNode::new(config).context("building node")?);
    node.start().await.context("starting node")?;

    let rpc_handle = if node.config.enable_rpc {
        let server = RpcServer::new(node.config.rpc_port, Arc::clone(&node));
        Some(tokio::spawn(async move {
            if let Err(e) = server.start().await {
                tracing::error!(error = %e, "HTTP API failed");
            }
        }))
    } else {
        None
    };

    node.shutdown.wait_for_signal().await;
    tracing::info!("Shutdown signal received, stopping node");
    node.stop().await?;
    if let Some(handle) = rpc_handle {
        let _ = handle.await;
    }

    tracing::info!("consensus daemon exited cleanly");
    Ok(())
}

//! Node-wide stop flag.
//!
//! Backed by a `watch` channel holding `true` once stop was requested, so a
//! listener created after the fact (a server that binds late) still sees it.

use tokio::sync::watch;

pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Handle held by a background task; resolves once the node is stopping.
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Wait until stop is requested. Returns at once if it already was.
    pub async fn recv(&mut self) {
        // the sender lives as long as the node, an error only means it is gone
        let _ = self.rx.wait_for(|stopping| *stopping).await;
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Block until SIGINT or SIGTERM, then request stop.
    pub async fn wait_for_signal(&self) {
        let signal = tokio::select! {
            _ = tokio::signal::ctrl_c() => "SIGINT",
            _ = terminate() => "SIGTERM",
        };
        tracing::info!(signal, "stop requested");
        self.shutdown();
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, only SIGINT stops the node");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listeners_created_after_stop_still_see_it() {
        let controller = ShutdownController::new();
        let mut early = controller.subscribe();
        controller.shutdown();
        let mut late = controller.subscribe();

        tokio::time::timeout(Duration::from_secs(1), async {
            early.recv().await;
            late.recv().await;
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn listener_waits_while_running() {
        let controller = ShutdownController::new();
        let mut listener = controller.subscribe();
        let pending = tokio::time::timeout(Duration::from_millis(20), listener.recv()).await;
        assert!(pending.is_err());
    }
}

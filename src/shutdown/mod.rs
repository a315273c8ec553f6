use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Two-level stop request shared by the pacer and whoever handles signals.
///
/// The first level stops sending new tasks; the second additionally gives
/// up waiting for outstanding responses.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    stop_sending: CancellationToken,
    abandon_drain: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop_sending.cancel();
    }

    pub fn request_abandon(&self) {
        self.stop_sending.cancel();
        self.abandon_drain.cancel();
    }

    /// Moves one level further: stop sending first, then abandon the drain.
    pub fn escalate(&self) {
        if self.stop_sending.is_cancelled() {
            self.request_abandon();
        } else {
            self.request_stop();
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_sending.is_cancelled()
    }

    pub fn is_drain_abandoned(&self) -> bool {
        self.abandon_drain.is_cancelled()
    }

    pub async fn stop_requested(&self) {
        self.stop_sending.cancelled().await
    }

    pub async fn drain_abandoned(&self) {
        self.abandon_drain.cancelled().await
    }

    /// Escalates on every Ctrl+C until the drain is abandoned.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            while !shutdown.is_drain_abandoned() {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }

                if shutdown.is_stop_requested() {
                    warn!("Ctrl+C again: abandoning outstanding responses");
                } else {
                    info!("Ctrl+C: stopping now...");
                }
                shutdown.escalate();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn escalates_one_level_at_a_time() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_stop_requested());
        assert!(!shutdown.is_drain_abandoned());

        shutdown.escalate();
        assert!(shutdown.is_stop_requested());
        assert!(!shutdown.is_drain_abandoned());

        shutdown.escalate();
        assert!(shutdown.is_drain_abandoned());
    }

    #[test]
    fn abandoning_implies_stopping() {
        let shutdown = Shutdown::new();
        shutdown.request_abandon();
        assert!(shutdown.is_stop_requested());
        assert!(shutdown.is_drain_abandoned());
    }

    #[tokio::test]
    async fn clones_observe_the_same_request() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();

        let waiter = tokio::spawn(async move { observer.stop_requested().await });
        shutdown.request_stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}

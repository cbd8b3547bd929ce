//! Oracle relay.
//!
//! Periodically drains the oracle's queue and delivers every response to the
//! ledger through `dispatch_callback`. Decryption runs on the blocking pool;
//! the ledger lock is held only while a single callback is applied.

use std::sync::Arc;
use std::time::Duration;

use tessera_ledger::CallbackOutcome;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::DaemonState;

/// What one relay pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Responses the ledger accepted.
    pub delivered: usize,
    /// Responses the ledger rejected (late, replayed, bad proof, malformed).
    pub rejected: usize,
    /// Requests the oracle could not decrypt.
    pub failed: usize,
}

/// Fulfil everything currently queued and deliver the results.
pub async fn relay_once(state: &Arc<DaemonState>) -> anyhow::Result<RelayReport> {
    let oracle = Arc::clone(&state.oracle);
    let outcomes = tokio::task::spawn_blocking(move || oracle.fulfil_all()).await?;

    let mut report = RelayReport::default();
    for outcome in outcomes {
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "oracle could not fulfil request");
                report.failed += 1;
                continue;
            }
        };

        let result = state.ledger.lock().await.dispatch_callback(&response);
        match result {
            Ok(CallbackOutcome::Royalty { sale_id, .. }) => {
                debug!(request_id = response.request_id, sale_id, "royalty callback delivered");
                report.delivered += 1;
            }
            Ok(CallbackOutcome::ContentTotal(total)) => {
                debug!(
                    request_id = response.request_id,
                    content_id = %total.content_id,
                    "content total callback delivered"
                );
                report.delivered += 1;
            }
            Err(e) => {
                warn!(request_id = response.request_id, error = %e, "callback rejected");
                report.rejected += 1;
            }
        }
    }

    if report != RelayReport::default() {
        info!(
            delivered = report.delivered,
            rejected = report.rejected,
            failed = report.failed,
            "relay pass complete"
        );
    }
    Ok(report)
}

/// Run relay passes every `interval` until shutdown.
pub async fn run(state: Arc<DaemonState>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = relay_once(&state).await {
                    warn!(error = %e, "relay pass failed");
                }
            }
            _ = shutdown.recv() => {
                debug!("relay stopping");
                break;
            }
        }
    }
}

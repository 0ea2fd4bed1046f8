//! Periodic cleanup of stale shares.
//!
//! One task owned by the process lifecycle, not an ad hoc timer: it sweeps
//! once shortly after startup (recovering records that expired while the
//! process was down) and then on a fixed interval until shutdown. Runs are
//! sequential awaits on a single task, so a slow sweep can never overlap the
//! next one. The sweep logic itself lives on [`crate::ledger::Ledger::sweep`]
//! and is directly callable from tests.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ServiceState;

/// Delay before the recovery sweep at startup.
const STARTUP_SWEEP_DELAY: Duration = Duration::from_secs(5);

/// Spawn the sweeper task. It exits when the shutdown channel fires.
pub fn spawn_sweeper(
    state: ServiceState,
    period: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs(), "sweeper started");

        tokio::select! {
            _ = tokio::time::sleep(STARTUP_SWEEP_DELAY) => {}
            _ = shutdown_rx.changed() => return,
        }
        run_sweep(&state).await;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the startup sweep already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => run_sweep(&state).await,
                _ = shutdown_rx.changed() => {
                    tracing::debug!("sweeper shutting down");
                    return;
                }
            }
        }
    })
}

async fn run_sweep(state: &ServiceState) {
    match state.ledger().sweep().await {
        Ok(0) => {}
        Ok(count) => tracing::debug!(count, "sweep pass complete"),
        Err(e) => tracing::error!(error = %e, "sweep pass failed"),
    }
}

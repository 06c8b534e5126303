//! Reconciliation sweeper: finds completed checkout sessions the store has
//! no order for and backfills them. This is the safety net for webhook
//! deliveries that never arrived or died mid-flight.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::error::Result;
use crate::orders::{self, WriteOutcome};
use crate::payments::CheckoutSession;
use crate::state::AppState;

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Completed sessions returned by the processor for the window.
    pub listed: usize,
    /// Orders backfilled this sweep.
    pub created: usize,
    /// Sessions that already had an order.
    pub skipped: usize,
    /// Sessions that failed and were left for the next sweep.
    pub failed: usize,
}

/// Run one reconciliation sweep.
///
/// A failure to list sessions aborts the sweep; a failure on an individual
/// session is logged and counted without touching the others.
pub async fn reconcile_orders(state: &AppState) -> Result<ReconcileOutcome> {
    tracing::debug!("Running order reconciliation");

    let window_start = chrono::Utc::now().timestamp() - state.reconcile.window_secs;
    let sessions = state
        .stripe
        .list_completed_sessions(window_start, state.reconcile.limit)
        .await?;

    let mut outcome = ReconcileOutcome {
        listed: sessions.len(),
        ..Default::default()
    };

    for session in &sessions {
        match reconcile_session(state, session).await {
            Ok(true) => outcome.created += 1,
            Ok(false) => outcome.skipped += 1,
            Err(e) => {
                outcome.failed += 1;
                tracing::error!("Failed to reconcile session {}: {}", session.id, e);
            }
        }
    }

    if outcome.created > 0 || outcome.failed > 0 {
        tracing::info!(
            "Reconciliation done: {} listed, {} created, {} skipped, {} failed",
            outcome.listed,
            outcome.created,
            outcome.skipped,
            outcome.failed
        );
    } else {
        tracing::debug!("Reconciliation done: nothing to backfill");
    }

    Ok(outcome)
}

/// Returns true when an order was backfilled for the session.
async fn reconcile_session(state: &AppState, session: &CheckoutSession) -> Result<bool> {
    if state.store.find_order_by_session(&session.id).await?.is_some() {
        return Ok(false);
    }

    tracing::info!("Creating missing order for session {}", session.id);
    match orders::record_session(state, session).await? {
        WriteOutcome::Created(_) => Ok(true),
        // Lost a race against a concurrent webhook delivery. The order is
        // there, which is all that matters.
        WriteOutcome::AlreadyRecorded => Ok(false),
    }
}

/// Kick off one sweep in the background without waiting for it.
///
/// The webhook handler calls this on every verified event so a burst of
/// traffic also heals older gaps. Failures and panics are logged and never
/// reach the caller.
pub fn spawn_reconcile_sweep(state: AppState) {
    tokio::spawn(
        AssertUnwindSafe(async move {
            if let Err(e) = reconcile_orders(&state).await {
                tracing::warn!("Reconciliation sweep failed: {}", e);
            }
        })
        .catch_unwind()
        .map(|result| {
            if let Err(panic) = result {
                let panic_msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("Reconciliation sweep panicked: {}", panic_msg);
            }
        }),
    );
}

/// Spawn the periodic background sweep. A zero interval disables it.
pub fn spawn_reconcile_task(state: AppState) {
    let interval_secs = state.reconcile.interval_secs;
    if interval_secs == 0 {
        tracing::info!("Periodic reconciliation disabled");
        return;
    }

    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = reconcile_orders(&state).await {
                tracing::warn!("Periodic reconciliation failed: {}", e);
            }
        }
    });

    tracing::info!(
        "Background reconciliation task started (runs every {}s)",
        interval_secs
    );
}

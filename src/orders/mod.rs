//! Turning completed checkout sessions into store orders.
//!
//! Two paths feed this module: the webhook handler reacting to
//! `checkout.session.completed` events, and the reconciliation sweeper that
//! catches sessions whose webhook delivery was missed. Both converge on
//! [`record_session`], and the store's unique session id constraint keeps
//! the overlap harmless.

pub mod mapper;
pub mod reconcile;

use crate::error::{AppError, Result};
use crate::models::Order;
use crate::payments::CheckoutSession;
use crate::state::AppState;

/// What happened when a session was pushed into the store.
#[derive(Debug)]
pub enum WriteOutcome {
    Created(Order),
    /// The store already has an order for this session. Counts as success:
    /// the goal is one order per session, not one write per caller.
    AlreadyRecorded,
}

/// Expand a completed session's line items, map them to an order, and write
/// it to the store.
pub async fn record_session(state: &AppState, session: &CheckoutSession) -> Result<WriteOutcome> {
    let line_items = state.stripe.list_line_items(&session.id).await?;
    let order = mapper::map_session(session, &line_items)?;

    match state.store.create_order(&order).await {
        Ok(created) => {
            tracing::info!("Created order {} for session {}", created.id, session.id);
            Ok(WriteOutcome::Created(created))
        }
        Err(AppError::DuplicateOrder { .. }) => {
            tracing::info!("Order for session {} already recorded", session.id);
            Ok(WriteOutcome::AlreadyRecorded)
        }
        Err(e) => Err(e),
    }
}

//! Storefront - payment and order backend for a headless CMS shop
//!
//! This library wires a Stripe checkout flow to a CMS-owned order collection:
//! checkout session creation, webhook ingestion, and a reconciliation sweeper
//! that backfills orders for missed webhook deliveries.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod orders;
pub mod payments;
pub mod state;
pub mod store;

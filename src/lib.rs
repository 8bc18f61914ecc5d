//! Paywall Billing - Subscription reconciliation core
//!
//! Decides what a reader may buy next, prices it into an order, and
//! reconciles gateway payment confirmations into the reader's membership
//! exactly once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

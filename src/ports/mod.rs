//! Ports - Interfaces between the application core and the outside world.
//!
//! - `BillingStore` / `BillingTx` - orders, memberships, snapshots, add-ons
//! - `AccountLookup` - reader billing identity
//! - `PriceCatalog` - prices and discounts
//! - `OutboxWriter` - outbox relay side
//! - `EventPublisher` - destination for relayed events
//! - `Notifier` - email delivery

mod account_lookup;
mod billing_store;
mod event_publisher;
mod notifier;
mod outbox_writer;
mod price_catalog;

pub use account_lookup::AccountLookup;
pub use billing_store::{BillingStore, BillingTx};
pub use event_publisher::EventPublisher;
pub use notifier::{Notifier, Parcel};
pub use outbox_writer::{OutboxEntry, OutboxStatus, OutboxWriter};
pub use price_catalog::PriceCatalog;

//! PostgreSQL adapters.
//!
//! - `PostgresBillingStore` - orders, memberships, snapshots, add-ons
//! - `PostgresOutbox` - outbox relay side
//! - `PostgresPriceCatalog` / `PostgresAccountLookup` - read-only lookups
//!
//! Schema lives in `migrations/`.

mod billing_store;
mod catalog;
mod outbox;
mod rows;

pub use billing_store::{PostgresBillingStore, PostgresBillingTx};
pub use catalog::{PostgresAccountLookup, PostgresPriceCatalog};
pub use outbox::PostgresOutbox;

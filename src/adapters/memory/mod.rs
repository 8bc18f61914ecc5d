//! In-memory adapters for tests and local runs.

mod billing_store;
mod catalog;
mod outbox;

pub use billing_store::{InMemoryBillingStore, InMemoryBillingTx};
pub use catalog::{InMemoryAccountLookup, InMemoryPriceCatalog};
pub use outbox::InMemoryOutbox;

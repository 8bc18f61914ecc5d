//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - in-process store, outbox and lookups
//! - `postgres` - sqlx-backed store, outbox and lookups
//! - `events` - event bus and outbox relay
//! - `notification` - confirmation emails

pub mod events;
pub mod memory;
pub mod notification;
pub mod postgres;

pub use events::{InMemoryEventBus, OutboxPublisher, OutboxPublisherConfig};
pub use memory::{InMemoryAccountLookup, InMemoryBillingStore, InMemoryOutbox, InMemoryPriceCatalog};
pub use notification::{ConfirmationMailer, LoggingNotifier};
pub use postgres::{
    PostgresAccountLookup, PostgresBillingStore, PostgresOutbox, PostgresPriceCatalog,
};

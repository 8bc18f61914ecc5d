//! Event adapters.
//!
//! - `InMemoryEventBus` - in-process bus with per-type subscribers
//! - `OutboxPublisher` - background relay from the outbox to a publisher

mod in_memory;
mod outbox_publisher;

pub use in_memory::InMemoryEventBus;
pub use outbox_publisher::{OutboxPublisher, OutboxPublisherConfig};

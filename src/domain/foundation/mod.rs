//! Foundation module - Shared domain primitives.
//!
//! Identifiers, time and money value objects, error types and the event
//! envelope that the billing and membership modules build on.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{AddOnId, MemberId, OrderId, SnapshotId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

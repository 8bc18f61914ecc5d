//! Checkout handlers.
//!
//! ## Queries
//! - Resolve which transaction kinds a reader may start
//!
//! ## Commands
//! - Create an unconfirmed order ready for the gateway

mod create_order;
mod resolve_intents;

// Commands
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};

// Queries
pub use resolve_intents::{ResolveIntentsHandler, ResolveIntentsQuery};

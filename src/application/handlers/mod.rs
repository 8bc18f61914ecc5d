//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.
//!
//! - `checkout` - resolve intents, create orders
//! - `confirmation` - reconcile gateway payment results
//! - `wallet` - prorated balance query
//! - `membership` - membership removal

pub mod checkout;
pub mod confirmation;
pub mod membership;
pub mod wallet;

pub use checkout::{
    CreateOrderCommand, CreateOrderHandler, CreateOrderResult, ResolveIntentsHandler,
    ResolveIntentsQuery,
};
pub use confirmation::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use membership::{DeleteMembershipCommand, DeleteMembershipHandler, DeleteMembershipResult};
pub use wallet::{GetWalletHandler, GetWalletQuery};

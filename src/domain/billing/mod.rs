//! Billing domain module.
//!
//! Deciding, pricing and confirming purchases.
//!
//! # Module Structure
//!
//! - `intent` - checkout decision table and resolver
//! - `price` - prices, discounts, charge computation
//! - `order` - orders, order status, the order builder
//! - `confirmation` - the confirmation engine
//! - `projector` - folds confirmed orders onto memberships
//! - `wallet` - prorated balance of one-time purchases
//! - `errors` - `BillingError` and gateway acknowledgement mapping

mod account;
mod confirmation;
mod errors;
mod events;
mod intent;
mod kind;
mod order;
mod payment;
mod price;
mod projector;
mod rules;
mod wallet;

pub use account::BillingAccount;
pub use confirmation::{Confirmation, ConfirmationEngine};
pub use errors::{BillingError, GatewayAck};
pub use events::OrderConfirmed;
pub use intent::{
    CheckoutIntent, DecisionRow, IntentResolver, Movement, Offer, Source, Verdict, DECISION_TABLE,
};
pub use kind::OrderKind;
pub use order::{Order, OrderBuilder, OrderRequest, OrderStatus, PurchasedWindow};
pub use payment::{PaymentResult, PaymentState};
pub use price::{charge, Discount, Price};
pub use projector::project;
pub use rules::BillingRules;
pub use wallet::{compute_wallet, ProratedOrder, Wallet};

//! Billing domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, EventId, OrderId, Timestamp};
use crate::domain::membership::{Edition, PaymentMethod};

use super::{Order, OrderKind, PurchasedWindow};

/// An order was confirmed and the membership updated.
///
/// Drives the confirmation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub member_key: String,
    pub kind: OrderKind,
    pub edition: Edition,
    pub payment_method: PaymentMethod,
    pub amount_minor: i64,
    pub currency: String,
    pub window: Option<PurchasedWindow>,
    pub add_on_days: Option<u32>,
    pub confirmed_at: Timestamp,
}

domain_event!(
    OrderConfirmed,
    event_type = "order.confirmed.v1",
    schema_version = 1,
    aggregate_id = order_id,
    aggregate_type = "Order",
    occurred_at = confirmed_at,
    event_id = event_id
);

impl OrderConfirmed {
    /// Builds the event from a confirmed order. `None` if the order is not confirmed.
    pub fn from_order(order: &Order, add_on_days: Option<u32>) -> Option<Self> {
        Some(Self {
            event_id: EventId::new(),
            order_id: order.id.clone(),
            member_key: order.member_id.compound_key(),
            kind: order.kind,
            edition: order.edition,
            payment_method: order.payment_method,
            amount_minor: order.charge.amount_minor(),
            currency: order.charge.currency().as_str().to_string(),
            window: order.window,
            add_on_days,
            confirmed_at: order.confirmed_at?,
        })
    }
}

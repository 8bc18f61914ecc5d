//! Orders and the builder that prices a checkout intent into one.
//!
//! # Invariants
//!
//! - `charge` is never negative
//! - the purchased window is written once, on the first confirmation
//! - a confirmed order never changes again

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{MemberId, Money, OrderId, StateMachine, Timestamp, ValidationError};
use crate::domain::membership::{Edition, PaymentMethod};

use super::{
    charge, BillingAccount, BillingError, BillingRules, CheckoutIntent, Discount, OrderKind, Price,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Unconfirmed,
    Confirmed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unconfirmed => "unconfirmed",
            OrderStatus::Confirmed => "confirmed",
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Unconfirmed, OrderStatus::Confirmed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            OrderStatus::Unconfirmed => vec![OrderStatus::Confirmed],
            OrderStatus::Confirmed => vec![],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfirmed" => Ok(OrderStatus::Unconfirmed),
            "confirmed" => Ok(OrderStatus::Confirmed),
            other => Err(ValidationError::invalid_format(
                "order_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Half-open purchased period `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasedWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl PurchasedWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::invalid_format(
                "purchased_window",
                "end precedes start",
            ));
        }
        Ok(Self { start, end })
    }

    /// Whole calendar days in the window.
    pub fn total_days(&self) -> i64 {
        self.start.days_until(&self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub member_id: MemberId,
    pub edition: Edition,
    pub kind: OrderKind,
    pub payment_method: PaymentMethod,
    pub price_id: String,
    pub discount_id: Option<String>,
    pub charge: Money,
    pub cycle_count: u32,
    pub status: OrderStatus,
    pub window: Option<PurchasedWindow>,
    pub transaction_id: Option<String>,
    pub created_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
}

impl Order {
    pub fn is_confirmed(&self) -> bool {
        self.status == OrderStatus::Confirmed
    }

    /// Returns the confirmed form of this order.
    ///
    /// `kind` may differ from the original (an upgrade recast as renewal).
    /// Fails if the order is already confirmed, which keeps the window
    /// write-once.
    pub fn confirmed(
        &self,
        kind: OrderKind,
        window: Option<PurchasedWindow>,
        transaction_id: impl Into<String>,
        at: Timestamp,
    ) -> Result<Order, ValidationError> {
        let status = self.status.transition_to(OrderStatus::Confirmed)?;
        if kind.has_window() != window.is_some() {
            let reason = if kind.has_window() {
                format!("{} orders require a window", kind)
            } else {
                format!("{} orders cannot have a window", kind)
            };
            return Err(ValidationError::invalid_format("purchased_window", reason));
        }
        Ok(Order {
            kind,
            status,
            window,
            transaction_id: Some(transaction_id.into()),
            confirmed_at: Some(at),
            ..self.clone()
        })
    }
}

/// Prices checkout intents into unconfirmed orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBuilder {
    rules: BillingRules,
}

/// Inputs for one order.
#[derive(Debug, Clone)]
pub struct OrderRequest<'a> {
    pub intent: &'a CheckoutIntent,
    pub method: PaymentMethod,
    pub account: &'a BillingAccount,
    pub price: &'a Price,
    pub discount: Option<&'a Discount>,
    pub cycle_count: u32,
}

impl OrderBuilder {
    const MAX_CYCLES: u32 = 10;

    pub fn new(rules: BillingRules) -> Self {
        Self { rules }
    }

    pub fn build(&self, req: OrderRequest<'_>, now: Timestamp) -> Result<Order, BillingError> {
        if req.price.edition != req.intent.edition {
            return Err(ValidationError::invalid_format(
                "price",
                format!(
                    "price {} is for {}, not {}",
                    req.price.id, req.price.edition, req.intent.edition
                ),
            )
            .into());
        }
        if req.cycle_count == 0 || req.cycle_count > Self::MAX_CYCLES {
            return Err(ValidationError::out_of_range(
                "cycle_count",
                1,
                i64::from(Self::MAX_CYCLES),
                i64::from(req.cycle_count),
            )
            .into());
        }
        if !req.intent.accepts(req.method) {
            return Err(BillingError::rejected(format!(
                "payment method {} is not allowed for {}",
                req.method, req.intent.kind
            )));
        }

        let applied = req.discount.filter(|d| d.applies_to(req.price, now));
        let unit = charge(req.price, applied, now);
        let charge = if req.account.is_test {
            Money::new(self.rules.sandbox_charge_minor, unit.currency())?
        } else {
            let total = unit
                .amount_minor()
                .checked_mul(i64::from(req.cycle_count))
                .ok_or_else(|| {
                    ValidationError::out_of_range("charge", 0, i64::MAX, i64::MAX)
                })?;
            Money::new(total, unit.currency())?
        };

        Ok(Order {
            id: OrderId::new(),
            member_id: req.account.member_id.clone(),
            edition: req.intent.edition,
            kind: req.intent.kind,
            payment_method: req.method,
            price_id: req.price.id.clone(),
            discount_id: applied.map(|d| d.id.clone()),
            charge,
            cycle_count: req.cycle_count,
            status: OrderStatus::Unconfirmed,
            window: None,
            transaction_id: None,
            created_at: now,
            confirmed_at: None,
        })
    }
}

//! Confirmation engine.
//!
//! Turns a gateway payment result into a confirmed order, an optional
//! add-on and a snapshot of the membership about to be replaced. Pure: the
//! caller owns the transaction that persists the outcome.
//!
//! Preconditions are checked in a fixed order so a redelivered webhook
//! always reports `DuplicateConfirmation` before anything else:
//!
//! 1. the order is not already confirmed
//! 2. the gateway says the order is paid
//! 3. the paid amount equals the order charge
//! 4. an upgrade does not target a member who already has valid premium

use crate::domain::foundation::{Timestamp, ValidationError};
use crate::domain::membership::{AddOn, Membership, MembershipSnapshot, Tier};

use super::{BillingError, BillingRules, Order, OrderKind, PaymentResult, PaymentState, PurchasedWindow};

/// Everything a successful confirmation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub order: Order,
    pub add_on: Option<AddOn>,
    pub snapshot: Option<MembershipSnapshot>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationEngine {
    rules: BillingRules,
}

impl ConfirmationEngine {
    pub fn new(rules: BillingRules) -> Self {
        Self { rules }
    }

    pub fn confirm(
        &self,
        order: &Order,
        payment: &PaymentResult,
        current: &Membership,
    ) -> Result<Confirmation, BillingError> {
        if payment.order_id != order.id {
            return Err(ValidationError::invalid_format(
                "order_id",
                format!("payment is for {}, not {}", payment.order_id, order.id),
            )
            .into());
        }
        if order.is_confirmed() {
            return Err(BillingError::DuplicateConfirmation(order.id.clone()));
        }
        if payment.state != PaymentState::Paid {
            return Err(ValidationError::invalid_format(
                "payment_state",
                format!("order {} is {}, not paid", order.id, payment.state),
            )
            .into());
        }
        if payment.charged_minor != order.charge.amount_minor() {
            return Err(BillingError::AmountMismatch {
                order_id: order.id.clone(),
                expected: order.charge.amount_minor(),
                paid: payment.charged_minor,
            });
        }

        let at = payment.confirmed_at;
        if order.kind == OrderKind::Upgrade && current.is_valid_premium(at) {
            return Err(BillingError::DuplicateUpgrade {
                member: current.member_id.compound_key(),
            });
        }

        // An upgrade arriving after the member already moved to premium
        // (lapsed) is just another premium purchase.
        let kind = match order.kind {
            OrderKind::Upgrade if current.tier() == Some(Tier::Premium) => OrderKind::Renew,
            kind => kind,
        };

        let (window, add_on) = match kind {
            OrderKind::Create | OrderKind::Renew => {
                let start = match current.expire_date() {
                    Some(expire) if expire > at => expire,
                    _ => at,
                };
                (Some(self.window_from(order, start)?), None)
            }
            OrderKind::Upgrade => {
                let carry = AddOn::carry_over(
                    current.member_id.clone(),
                    current.remaining_days(at),
                    order.id.clone(),
                    at,
                );
                (Some(self.window_from(order, at)?), carry)
            }
            OrderKind::SwitchCycle => (Some(self.window_from(order, at)?), None),
            OrderKind::AddOn => {
                let per_cycle = order.edition.cycle.days() + self.grace_days(order);
                let days = per_cycle.saturating_mul(order.cycle_count);
                let add_on = AddOn::purchased(
                    order.member_id.clone(),
                    order.edition.tier,
                    days,
                    order.id.clone(),
                    at,
                );
                (None, Some(add_on))
            }
        };

        let snapshot = MembershipSnapshot::capture(
            current,
            kind.snapshot_reason(),
            Some(order.id.clone()),
            at,
        );
        let confirmed = order.confirmed(kind, window, payment.transaction_id.clone(), at)?;

        Ok(Confirmation {
            order: confirmed,
            add_on,
            snapshot,
        })
    }

    /// Grace days only apply to one-time purchases.
    fn grace_days(&self, order: &Order) -> u32 {
        if order.payment_method.is_wallet_rail() {
            self.rules.grace_days
        } else {
            0
        }
    }

    fn window_from(&self, order: &Order, start: Timestamp) -> Result<PurchasedWindow, ValidationError> {
        let end = order
            .edition
            .cycle
            .advance(start, order.cycle_count)
            .add_days(i64::from(self.grace_days(order)));
        PurchasedWindow::new(start, end)
    }
}

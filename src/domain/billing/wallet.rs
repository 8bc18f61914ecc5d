//! Wallet: unused value left on one-time purchases.
//!
//! Advisory only. Older clients show the balance and charge the difference
//! on upgrade; the add-on carry-over is the authoritative mechanism.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, Money, OrderId, Timestamp};

use super::Order;

/// Unused value of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProratedOrder {
    pub order_id: OrderId,
    pub amount: Money,
    pub start: Timestamp,
    pub end: Timestamp,
    pub total_days: i64,
    pub remaining_days: i64,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: Money,
    pub sources: Vec<ProratedOrder>,
    pub as_of: Timestamp,
}

impl Wallet {
    /// What is left to pay on `charge` after spending the balance.
    pub fn credit_against(&self, charge: Money) -> Money {
        charge.minus_floored(self.balance.amount_minor())
    }
}

/// Prorates every confirmed wallet-rail order in `currency` whose window has not elapsed.
pub fn compute_wallet(orders: &[Order], as_of: Timestamp, currency: Currency) -> Wallet {
    let sources: Vec<ProratedOrder> = orders
        .iter()
        .filter(|o| o.is_confirmed() && o.payment_method.is_wallet_rail())
        .filter(|o| o.charge.currency() == currency)
        .filter_map(|o| prorate(o, as_of))
        .collect();

    let total: i64 = sources
        .iter()
        .fold(0i64, |acc, s| acc.saturating_add(s.balance.amount_minor()));

    Wallet {
        balance: Money::new(total, currency).unwrap_or_else(|_| Money::zero(currency)),
        sources,
        as_of,
    }
}

fn prorate(order: &Order, as_of: Timestamp) -> Option<ProratedOrder> {
    let window = order.window?;
    if window.end <= as_of {
        return None;
    }

    let total_days = window.total_days();
    if total_days <= 0 {
        return None;
    }
    let remaining_days = as_of.days_until(&window.end).clamp(0, total_days);

    let amount = order.charge.amount_minor();
    let balance_minor = if window.start > as_of {
        amount
    } else {
        ceil_share(amount, remaining_days, total_days)
    };

    Some(ProratedOrder {
        order_id: order.id.clone(),
        amount: order.charge,
        start: window.start,
        end: window.end,
        total_days,
        remaining_days,
        balance: order.charge.minus_floored(amount - balance_minor),
    })
}

/// `ceil(amount * part / whole)` clamped to `[0, amount]`, computed in i128.
fn ceil_share(amount: i64, part: i64, whole: i64) -> i64 {
    let numerator = i128::from(amount) * i128::from(part);
    let whole = i128::from(whole);
    let share = (numerator + whole - 1) / whole;
    share.clamp(0, i128::from(amount)) as i64
}

//! Prices, discounts and the charge they produce.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, Timestamp};
use crate::domain::membership::Edition;

/// Catalog price for one edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub edition: Edition,
    pub unit_amount: Money,
}

/// Amount off a price, optionally limited to a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: String,
    pub price_id: String,
    /// Minor units subtracted from the unit amount.
    pub off_minor: i64,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

impl Discount {
    /// `[starts_at, ends_at)`; open bounds always match.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        let started = self.starts_at.map(|s| s <= now).unwrap_or(true);
        let not_ended = self.ends_at.map(|e| now < e).unwrap_or(true);
        started && not_ended
    }

    pub fn applies_to(&self, price: &Price, now: Timestamp) -> bool {
        self.price_id == price.id && self.is_valid_at(now)
    }
}

/// Payable amount: `max(0, unit - off)`. Discounts that do not apply are ignored.
pub fn charge(price: &Price, discount: Option<&Discount>, now: Timestamp) -> Money {
    match discount {
        Some(d) if d.applies_to(price, now) => price.unit_amount.minus_floored(d.off_minor),
        _ => price.unit_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;
    use proptest::prelude::*;

    fn price(amount: i64) -> Price {
        Price {
            id: "price_std_year".to_string(),
            edition: Edition::STANDARD_YEAR,
            unit_amount: Money::new(amount, Currency::Cny).unwrap(),
        }
    }

    fn discount(off: i64) -> Discount {
        Discount {
            id: "dsc_1".to_string(),
            price_id: "price_std_year".to_string(),
            off_minor: off,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn no_discount_charges_unit_amount() {
        assert_eq!(charge(&price(29800), None, Timestamp::now()).amount_minor(), 29800);
    }

    #[test]
    fn discount_is_subtracted() {
        let now = Timestamp::now();
        assert_eq!(
            charge(&price(29800), Some(&discount(5000)), now).amount_minor(),
            24800
        );
    }

    #[test]
    fn oversized_discount_floors_at_zero() {
        let now = Timestamp::now();
        assert_eq!(charge(&price(100), Some(&discount(500)), now).amount_minor(), 0);
    }

    #[test]
    fn expired_discount_is_ignored() {
        let now = Timestamp::now();
        let mut d = discount(5000);
        d.starts_at = Some(now.add_days(-10));
        d.ends_at = Some(now.add_days(-1));
        assert_eq!(charge(&price(29800), Some(&d), now).amount_minor(), 29800);
    }

    #[test]
    fn future_discount_is_ignored() {
        let now = Timestamp::now();
        let mut d = discount(5000);
        d.starts_at = Some(now.add_days(1));
        assert!(!d.is_valid_at(now));
    }

    #[test]
    fn discount_for_another_price_is_ignored() {
        let now = Timestamp::now();
        let mut d = discount(5000);
        d.price_id = "price_prm_year".to_string();
        assert_eq!(charge(&price(29800), Some(&d), now).amount_minor(), 29800);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn charge_is_unit_minus_off_floored(unit in 0i64..10_000_000, off in 0i64..20_000_000) {
            let now = Timestamp::now();
            let amount = charge(&price(unit), Some(&discount(off)), now).amount_minor();
            prop_assert_eq!(amount, (unit - off).max(0));
            prop_assert!(amount >= 0);
        }
    }
}

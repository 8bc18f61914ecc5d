//! Payment methods and the rails they run on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// How the reader pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Alipay,
    Wechat,
    Stripe,
    Apple,
    B2b,
}

/// Settlement model behind a payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rail {
    /// One-time charges buying a fixed window (Alipay, WeChat Pay).
    Wallet,
    /// Auto-renewing subscriptions managed by the gateway (Stripe, Apple IAP).
    Subscription,
    /// Corporate licence seats.
    Licence,
}

impl PaymentMethod {
    /// Methods a reader may pick at checkout.
    pub const CHECKOUT: [PaymentMethod; 3] =
        [PaymentMethod::Alipay, PaymentMethod::Wechat, PaymentMethod::Stripe];

    /// Checkout methods on the wallet rail.
    pub const WALLET: [PaymentMethod; 2] = [PaymentMethod::Alipay, PaymentMethod::Wechat];

    pub fn rail(&self) -> Rail {
        match self {
            PaymentMethod::Alipay | PaymentMethod::Wechat => Rail::Wallet,
            PaymentMethod::Stripe | PaymentMethod::Apple => Rail::Subscription,
            PaymentMethod::B2b => Rail::Licence,
        }
    }

    pub fn is_wallet_rail(&self) -> bool {
        self.rail() == Rail::Wallet
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Alipay => "alipay",
            PaymentMethod::Wechat => "wechat",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Apple => "apple",
            PaymentMethod::B2b => "b2b",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alipay" => Ok(PaymentMethod::Alipay),
            "wechat" => Ok(PaymentMethod::Wechat),
            "stripe" => Ok(PaymentMethod::Stripe),
            "apple" => Ok(PaymentMethod::Apple),
            "b2b" => Ok(PaymentMethod::B2b),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rails_are_assigned() {
        assert_eq!(PaymentMethod::Alipay.rail(), Rail::Wallet);
        assert_eq!(PaymentMethod::Wechat.rail(), Rail::Wallet);
        assert_eq!(PaymentMethod::Stripe.rail(), Rail::Subscription);
        assert_eq!(PaymentMethod::Apple.rail(), Rail::Subscription);
        assert_eq!(PaymentMethod::B2b.rail(), Rail::Licence);
    }

    #[test]
    fn checkout_excludes_apple_and_b2b() {
        assert!(!PaymentMethod::CHECKOUT.contains(&PaymentMethod::Apple));
        assert!(!PaymentMethod::CHECKOUT.contains(&PaymentMethod::B2b));
    }

    #[test]
    fn parses_its_own_display() {
        for m in [
            PaymentMethod::Alipay,
            PaymentMethod::Wechat,
            PaymentMethod::Stripe,
            PaymentMethod::Apple,
            PaymentMethod::B2b,
        ] {
            assert_eq!(m.to_string().parse::<PaymentMethod>().unwrap(), m);
        }
    }
}

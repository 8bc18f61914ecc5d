//! Link between a membership and the gateway that bills it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stripe subscription status as reported by the gateway.
///
/// Unrecognised values parse to `Unknown` rather than failing, since
/// Stripe adds statuses over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripeStatus {
    Active,
    Trialing,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
    Unknown,
}

impl StripeStatus {
    /// Statuses after which the subscription no longer entitles the reader,
    /// so checkout treats the member as new.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            StripeStatus::IncompleteExpired
                | StripeStatus::PastDue
                | StripeStatus::Canceled
                | StripeStatus::Unpaid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StripeStatus::Active => "active",
            StripeStatus::Trialing => "trialing",
            StripeStatus::Incomplete => "incomplete",
            StripeStatus::IncompleteExpired => "incomplete_expired",
            StripeStatus::PastDue => "past_due",
            StripeStatus::Canceled => "canceled",
            StripeStatus::Unpaid => "unpaid",
            StripeStatus::Paused => "paused",
            StripeStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StripeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StripeStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "active" => StripeStatus::Active,
            "trialing" => StripeStatus::Trialing,
            "incomplete" => StripeStatus::Incomplete,
            "incomplete_expired" => StripeStatus::IncompleteExpired,
            "past_due" => StripeStatus::PastDue,
            "canceled" => StripeStatus::Canceled,
            "unpaid" => StripeStatus::Unpaid,
            "paused" => StripeStatus::Paused,
            _ => StripeStatus::Unknown,
        })
    }
}

/// At most one external provider owns a membership at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderHandle {
    #[default]
    None,
    Stripe {
        subscription_id: String,
        status: StripeStatus,
    },
    Apple {
        original_transaction_id: String,
    },
    B2b {
        licence_id: String,
    },
}

impl ProviderHandle {
    pub fn stripe(subscription_id: impl Into<String>, status: StripeStatus) -> Self {
        ProviderHandle::Stripe {
            subscription_id: subscription_id.into(),
            status,
        }
    }

    /// Stripe status when the membership is Stripe-managed.
    pub fn stripe_status(&self) -> Option<StripeStatus> {
        match self {
            ProviderHandle::Stripe { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Provider-side id, whichever provider it is.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            ProviderHandle::None => None,
            ProviderHandle::Stripe {
                subscription_id, ..
            } => Some(subscription_id),
            ProviderHandle::Apple {
                original_transaction_id,
            } => Some(original_transaction_id),
            ProviderHandle::B2b { licence_id } => Some(licence_id),
        }
    }
}

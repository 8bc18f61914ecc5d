//! Membership aggregate.
//!
//! A reader has at most one membership. A reader with no membership row is
//! represented by the zero membership, not by `None`.
//!
//! # Invariants
//!
//! - Edition and expire date exist together or not at all (`Entitlement`)
//! - Reserved days are never negative (unsigned)
//! - At most one provider handle

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MemberId, Timestamp};

use super::{Edition, PaymentMethod, ProviderHandle, ReservedDays, StripeStatus, Tier};

/// What the reader is currently entitled to, and until when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub edition: Edition,
    pub expire_date: Timestamp,
}

impl Entitlement {
    pub fn new(edition: Edition, expire_date: Timestamp) -> Self {
        Self {
            edition,
            expire_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub member_id: MemberId,
    pub entitlement: Option<Entitlement>,
    pub payment_method: Option<PaymentMethod>,
    pub provider: ProviderHandle,
    pub auto_renew: bool,
    pub reserved: ReservedDays,
    pub updated_at: Timestamp,
}

impl Membership {
    /// The empty membership of a reader who never subscribed.
    pub fn zero(member_id: MemberId) -> Self {
        Self {
            member_id,
            entitlement: None,
            payment_method: None,
            provider: ProviderHandle::None,
            auto_renew: false,
            reserved: ReservedDays::default(),
            updated_at: Timestamp::now(),
        }
    }

    /// A one-time-purchase membership; convenient for seeding state.
    pub fn one_time(
        member_id: MemberId,
        edition: Edition,
        expire_date: Timestamp,
        method: PaymentMethod,
    ) -> Self {
        Self {
            entitlement: Some(Entitlement::new(edition, expire_date)),
            payment_method: Some(method),
            ..Self::zero(member_id)
        }
    }

    /// A Stripe-managed, auto-renewing membership.
    pub fn stripe(
        member_id: MemberId,
        edition: Edition,
        expire_date: Timestamp,
        subscription_id: impl Into<String>,
        status: StripeStatus,
    ) -> Self {
        Self {
            entitlement: Some(Entitlement::new(edition, expire_date)),
            payment_method: Some(PaymentMethod::Stripe),
            provider: ProviderHandle::stripe(subscription_id, status),
            auto_renew: true,
            ..Self::zero(member_id)
        }
    }

    pub fn with_reserved(mut self, reserved: ReservedDays) -> Self {
        self.reserved = reserved;
        self
    }

    /// No entitlement at all. Reserved days alone do not make a membership non-zero.
    pub fn is_zero(&self) -> bool {
        self.entitlement.is_none()
    }

    pub fn edition(&self) -> Option<Edition> {
        self.entitlement.map(|e| e.edition)
    }

    pub fn tier(&self) -> Option<Tier> {
        self.entitlement.map(|e| e.edition.tier)
    }

    pub fn expire_date(&self) -> Option<Timestamp> {
        self.entitlement.map(|e| e.expire_date)
    }

    /// Lapsed: not auto-renewing and the expire date has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.entitlement {
            None => true,
            Some(e) => !self.auto_renew && e.expire_date <= now,
        }
    }

    /// Stripe-managed but in a status that no longer entitles the reader.
    pub fn is_invalid_stripe(&self) -> bool {
        self.provider
            .stripe_status()
            .map(|s| s.is_invalid())
            .unwrap_or(false)
    }

    /// Currently entitled to premium.
    pub fn is_valid_premium(&self, now: Timestamp) -> bool {
        self.tier() == Some(Tier::Premium) && !self.is_expired(now) && !self.is_invalid_stripe()
    }

    /// Whole calendar days left until expiry, never negative.
    pub fn remaining_days(&self, as_of: Timestamp) -> u32 {
        self.expire_date()
            .map(|expire| as_of.days_until(&expire).clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0)
    }
}

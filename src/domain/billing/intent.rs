//! Checkout intent resolution.
//!
//! Which transaction a reader may start next is a pure function of their
//! membership, the edition they are looking at and the payment method they
//! picked. The rules live in `DECISION_TABLE`, evaluated top to bottom,
//! first match wins.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::membership::{Edition, Membership, PaymentMethod, Tier};

use super::{BillingError, BillingRules, OrderKind};
use self::Movement::{CycleChange, Downgrade, SameEdition, Upgrade};
use self::Verdict::{Offers, Reject};

/// How the current membership is billed, as far as checkout is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// No membership, a lapsed one, or a Stripe subscription in a dead state.
    Fresh,
    /// Alipay / WeChat one-time purchase (or a manual grant).
    Wallet,
    Stripe,
    Apple,
    B2b,
}

impl Source {
    pub fn of(membership: &Membership, now: Timestamp) -> Self {
        if membership.is_expired(now) || membership.is_invalid_stripe() {
            return Source::Fresh;
        }
        match membership.payment_method {
            None | Some(PaymentMethod::Alipay) | Some(PaymentMethod::Wechat) => Source::Wallet,
            Some(PaymentMethod::Stripe) => Source::Stripe,
            Some(PaymentMethod::Apple) => Source::Apple,
            Some(PaymentMethod::B2b) => Source::B2b,
        }
    }
}

/// Relation between the current edition and the target edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    SameEdition,
    CycleChange,
    Upgrade,
    Downgrade,
}

impl Movement {
    pub fn between(current: Edition, target: Edition) -> Self {
        match target.tier.cmp(&current.tier) {
            std::cmp::Ordering::Greater => Movement::Upgrade,
            std::cmp::Ordering::Less => Movement::Downgrade,
            std::cmp::Ordering::Equal if current.cycle == target.cycle => Movement::SameEdition,
            std::cmp::Ordering::Equal => Movement::CycleChange,
        }
    }
}

/// A transaction kind and the methods that may pay for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    pub kind: OrderKind,
    pub methods: &'static [PaymentMethod],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Offers(&'static [Offer]),
    Reject(&'static str),
}

/// One rule. `None` in `tier` or `movement` matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRow {
    pub source: Source,
    pub tier: Option<Tier>,
    pub movement: Option<Movement>,
    pub verdict: Verdict,
}

impl DecisionRow {
    fn matches(&self, source: Source, tier: Option<Tier>, movement: Option<Movement>) -> bool {
        self.source == source
            && self.tier.map_or(true, |t| Some(t) == tier)
            && self.movement.map_or(true, |m| Some(m) == movement)
    }
}

const WALLET: &[PaymentMethod] = &PaymentMethod::WALLET;
const STRIPE: &[PaymentMethod] = &[PaymentMethod::Stripe];
const ANY: &[PaymentMethod] = &PaymentMethod::CHECKOUT;

const CREATE_ANY: &[Offer] = &[Offer {
    kind: OrderKind::Create,
    methods: ANY,
}];
const ADD_ON_ONLY: &[Offer] = &[Offer {
    kind: OrderKind::AddOn,
    methods: WALLET,
}];
const RENEW_OR_STRIPE: &[Offer] = &[
    Offer {
        kind: OrderKind::Renew,
        methods: WALLET,
    },
    Offer {
        kind: OrderKind::Create,
        methods: STRIPE,
    },
];
const UPGRADE_OR_STRIPE: &[Offer] = &[
    Offer {
        kind: OrderKind::Upgrade,
        methods: WALLET,
    },
    Offer {
        kind: OrderKind::Create,
        methods: STRIPE,
    },
];
const STRIPE_UPGRADE: &[Offer] = &[Offer {
    kind: OrderKind::Upgrade,
    methods: STRIPE,
}];
const ADD_ON_OR_SWITCH: &[Offer] = &[
    Offer {
        kind: OrderKind::AddOn,
        methods: WALLET,
    },
    Offer {
        kind: OrderKind::SwitchCycle,
        methods: STRIPE,
    },
];

const fn row(
    source: Source,
    tier: Option<Tier>,
    movement: Option<Movement>,
    verdict: Verdict,
) -> DecisionRow {
    DecisionRow {
        source,
        tier,
        movement,
        verdict,
    }
}

pub const DECISION_TABLE: &[DecisionRow] = &[
    row(Source::Fresh, None, None, Offers(CREATE_ANY)),
    row(Source::Wallet, None, Some(SameEdition), Offers(RENEW_OR_STRIPE)),
    row(Source::Wallet, None, Some(CycleChange), Offers(RENEW_OR_STRIPE)),
    row(Source::Wallet, None, Some(Upgrade), Offers(UPGRADE_OR_STRIPE)),
    row(Source::Wallet, None, Some(Downgrade), Offers(ADD_ON_ONLY)),
    row(Source::Stripe, Some(Tier::Premium), None, Offers(ADD_ON_ONLY)),
    row(Source::Stripe, Some(Tier::Standard), Some(Upgrade), Offers(STRIPE_UPGRADE)),
    row(Source::Stripe, Some(Tier::Standard), Some(SameEdition), Offers(ADD_ON_ONLY)),
    row(Source::Stripe, Some(Tier::Standard), Some(CycleChange), Offers(ADD_ON_OR_SWITCH)),
    row(
        Source::Apple,
        None,
        Some(Upgrade),
        Reject("apple subscriptions must be upgraded on the native platform"),
    ),
    row(Source::Apple, None, None, Offers(ADD_ON_ONLY)),
    row(Source::B2b, None, None, Offers(ADD_ON_ONLY)),
];

/// The decision for one (kind, methods) pair on a target edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutIntent {
    pub kind: OrderKind,
    pub edition: Edition,
    pub methods: Vec<PaymentMethod>,
}

impl CheckoutIntent {
    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// Resolves checkout intents without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentResolver {
    rules: BillingRules,
}

impl IntentResolver {
    pub fn new(rules: BillingRules) -> Self {
        Self { rules }
    }

    /// First matching row of the table.
    pub fn lookup(&self, membership: &Membership, target: Edition, now: Timestamp) -> Verdict {
        let source = Source::of(membership, now);
        let tier = membership.tier();
        let movement = membership.edition().map(|current| Movement::between(current, target));

        DECISION_TABLE
            .iter()
            .find(|r| r.matches(source, tier, movement))
            .map(|r| r.verdict)
            .unwrap_or(Reject("operation not supported"))
    }

    /// Every intent open to the reader for `target`.
    ///
    /// Renewals beyond the horizon are dropped rather than rejected, so
    /// callers can still show the remaining options.
    pub fn resolve_intents(
        &self,
        membership: &Membership,
        target: Edition,
        now: Timestamp,
    ) -> Result<Vec<CheckoutIntent>, BillingError> {
        match self.lookup(membership, target, now) {
            Reject(reason) => Err(BillingError::rejected(reason)),
            Offers(offers) => Ok(offers
                .iter()
                .filter(|o| o.kind != OrderKind::Renew || self.within_horizon(membership, now))
                .map(|o| CheckoutIntent {
                    kind: o.kind,
                    edition: target,
                    methods: o.methods.to_vec(),
                })
                .collect()),
        }
    }

    /// The single intent payable by `method`.
    pub fn resolve(
        &self,
        membership: &Membership,
        target: Edition,
        method: PaymentMethod,
        now: Timestamp,
    ) -> Result<CheckoutIntent, BillingError> {
        let offers = match self.lookup(membership, target, now) {
            Reject(reason) => return Err(BillingError::rejected(reason)),
            Offers(offers) => offers,
        };

        let offer = offers
            .iter()
            .find(|o| o.methods.contains(&method))
            .ok_or_else(|| {
                BillingError::rejected(format!(
                    "payment method {} is not available for {}",
                    method, target
                ))
            })?;

        if offer.kind == OrderKind::Renew && !self.within_horizon(membership, now) {
            return Err(BillingError::rejected(format!(
                "membership already extends beyond the {} year renewal limit",
                self.rules.renewal_horizon_years
            )));
        }

        Ok(CheckoutIntent {
            kind: offer.kind,
            edition: target,
            methods: offer.methods.to_vec(),
        })
    }

    fn within_horizon(&self, membership: &Membership, now: Timestamp) -> bool {
        let limit = now.add_years(self.rules.renewal_horizon_years);
        membership.expire_date().map_or(true, |expire| expire <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::MemberId;
    use crate::domain::membership::{Cycle, ProviderHandle, StripeStatus};
    use uuid::Uuid;

    fn member() -> MemberId {
        MemberId::ftc(Uuid::new_v4())
    }

    fn wallet(edition: Edition, days_left: i64, now: Timestamp) -> Membership {
        Membership::one_time(member(), edition, now.add_days(days_left), PaymentMethod::Alipay)
    }

    fn stripe(edition: Edition, status: StripeStatus, now: Timestamp) -> Membership {
        Membership::stripe(member(), edition, now.add_days(20), "sub_1", status)
    }

    fn resolver() -> IntentResolver {
        IntentResolver::default()
    }

    fn kinds(intents: &[CheckoutIntent]) -> Vec<OrderKind> {
        intents.iter().map(|i| i.kind).collect()
    }

    // ══════════════════════════════════════════════════════════════
    // Fresh members
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn zero_membership_may_create_with_any_checkout_method() {
        let now = Timestamp::now();
        let zero = Membership::zero(member());
        for method in PaymentMethod::CHECKOUT {
            let intent = resolver()
                .resolve(&zero, Edition::STANDARD_YEAR, method, now)
                .unwrap();
            assert_eq!(intent.kind, OrderKind::Create);
        }
    }

    #[test]
    fn expired_membership_is_fresh() {
        let now = Timestamp::now();
        let m = wallet(Edition::PREMIUM_YEAR, -3, now);
        let intent = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Wechat, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Create);
    }

    #[test]
    fn invalid_stripe_membership_is_fresh() {
        let now = Timestamp::now();
        for status in [
            StripeStatus::PastDue,
            StripeStatus::Canceled,
            StripeStatus::Unpaid,
            StripeStatus::IncompleteExpired,
        ] {
            let m = stripe(Edition::PREMIUM_YEAR, status, now);
            let intent = resolver()
                .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Stripe, now)
                .unwrap();
            assert_eq!(intent.kind, OrderKind::Create, "status {}", status);
        }
    }

    #[test]
    fn apple_and_b2b_are_never_offered_at_checkout() {
        let now = Timestamp::now();
        let zero = Membership::zero(member());
        let err = resolver()
            .resolve(&zero, Edition::STANDARD_YEAR, PaymentMethod::Apple, now)
            .unwrap_err();
        assert!(matches!(err, BillingError::IntentRejected { .. }));
    }

    // ══════════════════════════════════════════════════════════════
    // Wallet rail
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn wallet_same_tier_renews_or_creates_on_stripe() {
        let now = Timestamp::now();
        let m = wallet(Edition::STANDARD_YEAR, 90, now);
        let intents = resolver()
            .resolve_intents(&m, Edition::STANDARD_YEAR, now)
            .unwrap();
        assert_eq!(kinds(&intents), vec![OrderKind::Renew, OrderKind::Create]);
        assert_eq!(intents[1].methods, vec![PaymentMethod::Stripe]);
    }

    #[test]
    fn wallet_same_tier_other_cycle_renews() {
        let now = Timestamp::now();
        let m = wallet(Edition::STANDARD_MONTH, 10, now);
        let intent = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Alipay, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Renew);
    }

    #[test]
    fn renewal_beyond_horizon_is_rejected() {
        let now = Timestamp::now();
        let m = Membership::one_time(
            member(),
            Edition::STANDARD_YEAR,
            now.add_years(3).add_days(1),
            PaymentMethod::Alipay,
        );

        let err = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Alipay, now)
            .unwrap_err();
        assert!(matches!(err, BillingError::IntentRejected { .. }));

        let intents = resolver()
            .resolve_intents(&m, Edition::STANDARD_YEAR, now)
            .unwrap();
        assert_eq!(kinds(&intents), vec![OrderKind::Create]);
    }

    #[test]
    fn renewal_at_horizon_is_allowed() {
        let now = Timestamp::now();
        let m = Membership::one_time(
            member(),
            Edition::STANDARD_YEAR,
            now.add_years(3),
            PaymentMethod::Wechat,
        );
        let intent = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Wechat, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Renew);
    }

    #[test]
    fn wallet_standard_to_premium_upgrades() {
        let now = Timestamp::now();
        let m = wallet(Edition::STANDARD_YEAR, 40, now);
        let intent = resolver()
            .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Wechat, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Upgrade);

        let via_stripe = resolver()
            .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Stripe, now)
            .unwrap();
        assert_eq!(via_stripe.kind, OrderKind::Create);
    }

    #[test]
    fn wallet_premium_to_standard_is_add_on_only() {
        let now = Timestamp::now();
        let m = wallet(Edition::PREMIUM_YEAR, 40, now);
        let intents = resolver()
            .resolve_intents(&m, Edition::STANDARD_YEAR, now)
            .unwrap();
        assert_eq!(kinds(&intents), vec![OrderKind::AddOn]);

        let err = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Stripe, now)
            .unwrap_err();
        assert!(matches!(err, BillingError::IntentRejected { .. }));
    }

    #[test]
    fn manual_grant_without_method_is_treated_as_wallet() {
        let now = Timestamp::now();
        let mut m = wallet(Edition::STANDARD_YEAR, 40, now);
        m.payment_method = None;
        let intent = resolver()
            .resolve(&m, Edition::STANDARD_YEAR, PaymentMethod::Alipay, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Renew);
    }

    // ══════════════════════════════════════════════════════════════
    // Stripe rail
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn stripe_premium_only_buys_add_ons() {
        let now = Timestamp::now();
        let m = stripe(Edition::PREMIUM_YEAR, StripeStatus::Active, now);
        for target in [Edition::STANDARD_YEAR, Edition::PREMIUM_YEAR] {
            let intents = resolver().resolve_intents(&m, target, now).unwrap();
            assert_eq!(kinds(&intents), vec![OrderKind::AddOn]);
            assert_eq!(intents[0].methods, PaymentMethod::WALLET.to_vec());
        }
    }

    #[test]
    fn stripe_standard_upgrades_through_stripe_only() {
        let now = Timestamp::now();
        let m = stripe(Edition::STANDARD_YEAR, StripeStatus::Active, now);
        let intent = resolver()
            .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Stripe, now)
            .unwrap();
        assert_eq!(intent.kind, OrderKind::Upgrade);

        let err = resolver()
            .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Alipay, now)
            .unwrap_err();
        assert!(matches!(err, BillingError::IntentRejected { .. }));
    }

    #[test]
    fn stripe_standard_same_cycle_is_add_on_only() {
        let now = Timestamp::now();
        let m = stripe(Edition::STANDARD_YEAR, StripeStatus::Active, now);
        let intents = resolver()
            .resolve_intents(&m, Edition::STANDARD_YEAR, now)
            .unwrap();
        assert_eq!(kinds(&intents), vec![OrderKind::AddOn]);
    }

    #[test]
    fn stripe_standard_cycle_change_offers_add_on_or_switch() {
        let now = Timestamp::now();
        let m = stripe(Edition::STANDARD_MONTH, StripeStatus::Active, now);
        let target = Edition::new(Tier::Standard, Cycle::Year);

        let add_on = resolver()
            .resolve(&m, target, PaymentMethod::Alipay, now)
            .unwrap();
        assert_eq!(add_on.kind, OrderKind::AddOn);

        let switch = resolver()
            .resolve(&m, target, PaymentMethod::Stripe, now)
            .unwrap();
        assert_eq!(switch.kind, OrderKind::SwitchCycle);
    }

    // ══════════════════════════════════════════════════════════════
    // Apple and B2B
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn apple_upgrade_is_rejected() {
        let now = Timestamp::now();
        let mut m = wallet(Edition::STANDARD_YEAR, 100, now);
        m.payment_method = Some(PaymentMethod::Apple);
        m.provider = ProviderHandle::Apple {
            original_transaction_id: "1000".into(),
        };
        let err = resolver()
            .resolve(&m, Edition::PREMIUM_YEAR, PaymentMethod::Alipay, now)
            .unwrap_err();
        match err {
            BillingError::IntentRejected { reason } => assert!(reason.contains("native")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn apple_same_tier_is_add_on_only() {
        let now = Timestamp::now();
        let mut m = wallet(Edition::STANDARD_YEAR, 100, now);
        m.payment_method = Some(PaymentMethod::Apple);
        let intents = resolver()
            .resolve_intents(&m, Edition::STANDARD_YEAR, now)
            .unwrap();
        assert_eq!(kinds(&intents), vec![OrderKind::AddOn]);
    }

    #[test]
    fn b2b_is_add_on_only() {
        let now = Timestamp::now();
        let mut m = wallet(Edition::STANDARD_YEAR, 100, now);
        m.payment_method = Some(PaymentMethod::B2b);
        for target in [Edition::STANDARD_YEAR, Edition::PREMIUM_YEAR] {
            let intents = resolver().resolve_intents(&m, target, now).unwrap();
            assert_eq!(kinds(&intents), vec![OrderKind::AddOn]);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Table shape
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn every_offer_uses_checkout_methods_only() {
        for r in DECISION_TABLE {
            if let Offers(offers) = r.verdict {
                for o in offers {
                    for m in o.methods {
                        assert!(PaymentMethod::CHECKOUT.contains(m));
                    }
                }
            }
        }
    }

    #[test]
    fn no_offer_repeats_a_method_within_a_row() {
        for r in DECISION_TABLE {
            if let Offers(offers) = r.verdict {
                let mut seen = Vec::new();
                for o in offers {
                    for m in o.methods {
                        assert!(!seen.contains(m), "row {:?} repeats {}", r, m);
                        seen.push(*m);
                    }
                }
            }
        }
    }
}

//! Membership projector.
//!
//! Folds a confirmed order (and its add-on, if any) onto the current
//! membership. Reserved days only ever grow here.

use crate::domain::foundation::ValidationError;
use crate::domain::membership::{
    AddOn, Entitlement, Membership, PaymentMethod, ProviderHandle, StripeStatus,
};

use super::{Order, OrderKind};

/// Produces the next membership from a confirmed order.
pub fn project(
    order: &Order,
    add_on: Option<&AddOn>,
    current: &Membership,
) -> Result<Membership, ValidationError> {
    let confirmed_at = order
        .confirmed_at
        .ok_or_else(|| ValidationError::empty_field("confirmed_at"))?;

    let reserved = match add_on {
        Some(a) => current.reserved.plus(a.tier, a.days),
        None => current.reserved,
    };

    if order.kind == OrderKind::AddOn {
        return Ok(Membership {
            reserved,
            updated_at: confirmed_at,
            ..current.clone()
        });
    }

    let window = order
        .window
        .ok_or_else(|| ValidationError::empty_field("purchased_window"))?;

    let (provider, auto_renew) = match order.payment_method {
        PaymentMethod::Stripe => (
            ProviderHandle::stripe(
                order.transaction_id.clone().unwrap_or_default(),
                StripeStatus::Active,
            ),
            true,
        ),
        _ => (ProviderHandle::None, false),
    };

    Ok(Membership {
        member_id: current.member_id.clone(),
        entitlement: Some(Entitlement::new(order.edition, window.end)),
        payment_method: Some(order.payment_method),
        provider,
        auto_renew,
        reserved,
        updated_at: confirmed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{ConfirmationEngine, OrderStatus, PaymentResult};
    use crate::domain::foundation::{Currency, MemberId, Money, OrderId, Timestamp};
    use crate::domain::membership::{Edition, ReservedDays, Tier};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn order(member: &MemberId, kind: OrderKind, edition: Edition, method: PaymentMethod) -> Order {
        Order {
            id: OrderId::new(),
            member_id: member.clone(),
            edition,
            kind,
            payment_method: method,
            price_id: "price".into(),
            discount_id: None,
            charge: Money::new(29800, Currency::Cny).unwrap(),
            cycle_count: 1,
            status: OrderStatus::Unconfirmed,
            window: None,
            transaction_id: None,
            created_at: Timestamp::now(),
            confirmed_at: None,
        }
    }

    fn confirm_and_project(o: &Order, current: &Membership, at: Timestamp) -> Membership {
        let payment = PaymentResult::paid(o.id.clone(), o.charge.amount_minor(), "txn_9", at);
        let c = ConfirmationEngine::default()
            .confirm(o, &payment, current)
            .unwrap();
        project(&c.order, c.add_on.as_ref(), current).unwrap()
    }

    #[test]
    fn create_replaces_entitlement_and_keeps_reserved_days() {
        let member = MemberId::ftc(Uuid::new_v4());
        let now = Timestamp::now();
        let current = Membership::zero(member.clone()).with_reserved(ReservedDays::new(5, 0));
        let o = order(&member, OrderKind::Create, Edition::STANDARD_YEAR, PaymentMethod::Alipay);

        let next = confirm_and_project(&o, &current, now);

        assert_eq!(next.edition(), Some(Edition::STANDARD_YEAR));
        assert_eq!(next.expire_date(), Some(now.add_years(1).add_days(1)));
        assert_eq!(next.payment_method, Some(PaymentMethod::Alipay));
        assert_eq!(next.provider, ProviderHandle::None);
        assert_eq!(next.reserved, ReservedDays::new(5, 0));
    }

    #[test]
    fn stripe_order_sets_provider_handle() {
        let member = MemberId::ftc(Uuid::new_v4());
        let now = Timestamp::now();
        let o = order(&member, OrderKind::Create, Edition::STANDARD_YEAR, PaymentMethod::Stripe);

        let next = confirm_and_project(&o, &Membership::zero(member), now);

        assert_eq!(next.provider, ProviderHandle::stripe("txn_9", StripeStatus::Active));
        assert!(next.auto_renew);
    }

    #[test]
    fn add_on_leaves_entitlement_untouched() {
        let member = MemberId::ftc(Uuid::new_v4());
        let now = Timestamp::now();
        let current = Membership::stripe(
            member.clone(),
            Edition::PREMIUM_YEAR,
            now.add_days(200),
            "sub_1",
            StripeStatus::Active,
        );
        let o = order(&member, OrderKind::AddOn, Edition::STANDARD_YEAR, PaymentMethod::Alipay);

        let next = confirm_and_project(&o, &current, now);

        assert_eq!(next.entitlement, current.entitlement);
        assert_eq!(next.provider, current.provider);
        assert_eq!(next.payment_method, Some(PaymentMethod::Stripe));
        assert_eq!(next.reserved.get(Tier::Standard), 366);
    }

    #[test]
    fn unconfirmed_order_cannot_be_projected() {
        let member = MemberId::ftc(Uuid::new_v4());
        let o = order(&member, OrderKind::Create, Edition::STANDARD_YEAR, PaymentMethod::Alipay);
        assert!(project(&o, None, &Membership::zero(member)).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn upgrade_conserves_standard_days(
            remaining in 1i64..1000,
            reserved_std in 0u32..5000,
            reserved_prm in 0u32..5000,
        ) {
            let member = MemberId::ftc(Uuid::new_v4());
            let now = Timestamp::now();
            let current = Membership::one_time(
                member.clone(),
                Edition::STANDARD_YEAR,
                now.add_days(remaining),
                PaymentMethod::Alipay,
            )
            .with_reserved(ReservedDays::new(reserved_std, reserved_prm));
            let o = order(&member, OrderKind::Upgrade, Edition::PREMIUM_YEAR, PaymentMethod::Wechat);

            let next = confirm_and_project(&o, &current, now);

            prop_assert_eq!(
                next.reserved.standard,
                current.reserved.standard + current.remaining_days(now)
            );
            prop_assert_eq!(next.reserved.premium, current.reserved.premium);
            prop_assert_eq!(next.tier(), Some(Tier::Premium));
        }

        #[test]
        fn reserved_days_never_decrease(
            kind_idx in 0usize..4,
            reserved_std in 0u32..5000,
            reserved_prm in 0u32..5000,
            days_left in -30i64..400,
        ) {
            let kinds = [OrderKind::Create, OrderKind::Renew, OrderKind::Upgrade, OrderKind::AddOn];
            let kind = kinds[kind_idx];
            let member = MemberId::ftc(Uuid::new_v4());
            let now = Timestamp::now();
            let current = Membership::one_time(
                member.clone(),
                Edition::STANDARD_YEAR,
                now.add_days(days_left),
                PaymentMethod::Alipay,
            )
            .with_reserved(ReservedDays::new(reserved_std, reserved_prm));
            let edition = if kind == OrderKind::Upgrade { Edition::PREMIUM_YEAR } else { Edition::STANDARD_YEAR };
            let o = order(&member, kind, edition, PaymentMethod::Alipay);

            let next = confirm_and_project(&o, &current, now);

            prop_assert!(next.reserved.standard >= current.reserved.standard);
            prop_assert!(next.reserved.premium >= current.reserved.premium);
        }

        #[test]
        fn renewal_chains_from_expire_date(days_left in 0i64..1000) {
            let member = MemberId::ftc(Uuid::new_v4());
            let now = Timestamp::now();
            let expire = now.add_days(days_left);
            let current = Membership::one_time(
                member.clone(),
                Edition::STANDARD_YEAR,
                expire,
                PaymentMethod::Alipay,
            );
            let o = order(&member, OrderKind::Renew, Edition::STANDARD_YEAR, PaymentMethod::Alipay);

            let next = confirm_and_project(&o, &current, now);

            prop_assert_eq!(next.expire_date(), Some(expire.add_years(1).add_days(1)));
        }
    }
}

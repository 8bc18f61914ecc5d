//! Row types and conversions shared by the Postgres adapters.
//!
//! Membership rows still carry the legacy `vip_type` / `expire_time`
//! columns next to the current `tier` / `cycle` / `expire_date` ones.
//! Reads reconcile the two and keep whichever expires later; writes fill
//! both so older readers keep working.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{Order, OrderKind, OrderStatus, PurchasedWindow};
use crate::domain::foundation::{
    AddOnId, Currency, DomainError, ErrorCode, MemberId, Money, OrderId, Timestamp,
};
use crate::domain::membership::{
    AddOn, AddOnSource, Cycle, Edition, Entitlement, Membership, PaymentMethod, ProviderHandle,
    ReservedDays, StripeStatus, Tier,
};

pub(super) fn db_err(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn parse<T: FromStr>(column: &str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("invalid {} value '{}': {}", column, value, e),
        )
    })
}

fn member_id(ftc_id: Option<Uuid>, union_id: Option<String>) -> Result<MemberId, DomainError> {
    MemberId::new(ftc_id, union_id).map_err(|e| db_err("row without member identity", e))
}

fn days(column: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("negative {} value {}", column, value),
        )
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct OrderRow {
    pub id: String,
    pub ftc_id: Option<Uuid>,
    pub union_id: Option<String>,
    pub edition: String,
    pub kind: String,
    pub payment_method: String,
    pub price_id: String,
    pub discount_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub cycle_count: i32,
    pub status: String,
    pub start_utc: Option<DateTime<Utc>>,
    pub end_utc: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub confirmed_utc: Option<DateTime<Utc>>,
}

pub(super) const ORDER_COLUMNS: &str = "id, ftc_id, union_id, edition, kind, payment_method, \
     price_id, discount_id, amount_minor, currency, cycle_count, status, start_utc, end_utc, \
     transaction_id, created_utc, confirmed_utc";

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let window = match (row.start_utc, row.end_utc) {
            (Some(start), Some(end)) => Some(
                PurchasedWindow::new(Timestamp::from_datetime(start), Timestamp::from_datetime(end))
                    .map_err(|e| db_err("invalid order window", e))?,
            ),
            _ => None,
        };
        let currency: Currency = parse("currency", &row.currency)?;

        Ok(Order {
            id: parse::<OrderId>("order id", &row.id)?,
            member_id: member_id(row.ftc_id, row.union_id)?,
            edition: parse::<Edition>("edition", &row.edition)?,
            kind: parse::<OrderKind>("kind", &row.kind)?,
            payment_method: parse::<PaymentMethod>("payment_method", &row.payment_method)?,
            price_id: row.price_id,
            discount_id: row.discount_id,
            charge: Money::new(row.amount_minor, currency)
                .map_err(|e| db_err("invalid order amount", e))?,
            cycle_count: days("cycle_count", row.cycle_count)?,
            status: parse::<OrderStatus>("status", &row.status)?,
            window,
            transaction_id: row.transaction_id,
            created_at: Timestamp::from_datetime(row.created_utc),
            confirmed_at: row.confirmed_utc.map(Timestamp::from_datetime),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Memberships
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MembershipRow {
    pub ftc_id: Option<Uuid>,
    pub union_id: Option<String>,
    pub tier: Option<String>,
    pub cycle: Option<String>,
    pub expire_date: Option<DateTime<Utc>>,
    /// Legacy: 0 none, 1 standard, 2 premium.
    pub vip_type: Option<i32>,
    /// Legacy: unix seconds.
    pub expire_time: Option<i64>,
    pub payment_method: Option<String>,
    pub provider: Option<String>,
    pub provider_ref: Option<String>,
    pub provider_status: Option<String>,
    pub auto_renew: bool,
    pub reserved_standard: i32,
    pub reserved_premium: i32,
    pub updated_utc: DateTime<Utc>,
}

pub(super) const MEMBERSHIP_COLUMNS: &str = "ftc_id, union_id, tier, cycle, expire_date, \
     vip_type, expire_time, payment_method, provider, provider_ref, provider_status, \
     auto_renew, reserved_standard, reserved_premium, updated_utc";

impl MembershipRow {
    fn current_entitlement(&self) -> Result<Option<Entitlement>, DomainError> {
        match (&self.tier, &self.cycle, self.expire_date) {
            (Some(tier), Some(cycle), Some(expire)) => Ok(Some(Entitlement::new(
                Edition::new(parse("tier", tier)?, parse("cycle", cycle)?),
                Timestamp::from_datetime(expire),
            ))),
            _ => Ok(None),
        }
    }

    /// Legacy rows only knew annual editions.
    fn legacy_entitlement(&self) -> Option<Entitlement> {
        let tier = match self.vip_type? {
            1 => Tier::Standard,
            2 => Tier::Premium,
            _ => return None,
        };
        let expire = Timestamp::from_unix_secs(self.expire_time?)?;
        Some(Entitlement::new(Edition::new(tier, Cycle::Year), expire))
    }

    fn provider_handle(&self) -> Result<ProviderHandle, DomainError> {
        let reference = self.provider_ref.clone().unwrap_or_default();
        Ok(match self.provider.as_deref() {
            None | Some("none") => ProviderHandle::None,
            Some("stripe") => ProviderHandle::Stripe {
                subscription_id: reference,
                status: self
                    .provider_status
                    .as_deref()
                    .map(|s| s.parse::<StripeStatus>().unwrap_or(StripeStatus::Unknown))
                    .unwrap_or(StripeStatus::Unknown),
            },
            Some("apple") => ProviderHandle::Apple {
                original_transaction_id: reference,
            },
            Some("b2b") => ProviderHandle::B2b {
                licence_id: reference,
            },
            Some(other) => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("invalid provider value '{}'", other),
                ))
            }
        })
    }
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let entitlement = match (row.current_entitlement()?, row.legacy_entitlement()) {
            (Some(current), Some(legacy)) if legacy.expire_date > current.expire_date => {
                Some(legacy)
            }
            (Some(current), _) => Some(current),
            (None, legacy) => legacy,
        };
        let payment_method = row
            .payment_method
            .as_deref()
            .map(|m| parse::<PaymentMethod>("payment_method", m))
            .transpose()?;
        let provider = row.provider_handle()?;

        Ok(Membership {
            member_id: member_id(row.ftc_id, row.union_id)?,
            entitlement,
            payment_method,
            provider,
            auto_renew: row.auto_renew,
            reserved: ReservedDays::new(
                days("reserved_standard", row.reserved_standard)?,
                days("reserved_premium", row.reserved_premium)?,
            ),
            updated_at: Timestamp::from_datetime(row.updated_utc),
        })
    }
}

/// Column values written for a membership, legacy columns included.
pub(super) struct MembershipColumns {
    pub tier: Option<&'static str>,
    pub cycle: Option<&'static str>,
    pub expire_date: Option<DateTime<Utc>>,
    pub vip_type: i32,
    pub expire_time: Option<i64>,
    pub payment_method: Option<&'static str>,
    pub provider: &'static str,
    pub provider_ref: Option<String>,
    pub provider_status: Option<&'static str>,
    pub reserved_standard: i32,
    pub reserved_premium: i32,
}

impl From<&Membership> for MembershipColumns {
    fn from(m: &Membership) -> Self {
        let (provider, provider_ref, provider_status) = match &m.provider {
            ProviderHandle::None => ("none", None, None),
            ProviderHandle::Stripe {
                subscription_id,
                status,
            } => ("stripe", Some(subscription_id.clone()), Some(status.as_str())),
            ProviderHandle::Apple {
                original_transaction_id,
            } => ("apple", Some(original_transaction_id.clone()), None),
            ProviderHandle::B2b { licence_id } => ("b2b", Some(licence_id.clone()), None),
        };

        Self {
            tier: m.entitlement.map(|e| e.edition.tier.as_str()),
            cycle: m.entitlement.map(|e| e.edition.cycle.as_str()),
            expire_date: m.entitlement.map(|e| *e.expire_date.as_datetime()),
            vip_type: match m.tier() {
                None => 0,
                Some(Tier::Standard) => 1,
                Some(Tier::Premium) => 2,
            },
            expire_time: m.expire_date().map(|t| t.as_unix_secs()),
            payment_method: m.payment_method.map(|p| p.as_str()),
            provider,
            provider_ref,
            provider_status,
            reserved_standard: i32::try_from(m.reserved.standard).unwrap_or(i32::MAX),
            reserved_premium: i32::try_from(m.reserved.premium).unwrap_or(i32::MAX),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Add-ons
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AddOnRow {
    pub id: Uuid,
    pub ftc_id: Option<Uuid>,
    pub union_id: Option<String>,
    pub tier: String,
    pub days: i32,
    pub source: String,
    pub order_id: Option<String>,
    pub consumed: bool,
    pub created_utc: DateTime<Utc>,
}

impl TryFrom<AddOnRow> for AddOn {
    type Error = DomainError;

    fn try_from(row: AddOnRow) -> Result<Self, Self::Error> {
        Ok(AddOn {
            id: AddOnId::from_uuid(row.id),
            member_id: member_id(row.ftc_id, row.union_id)?,
            tier: parse("tier", &row.tier)?,
            days: days("days", row.days)?,
            source: parse::<AddOnSource>("source", &row.source)?,
            order_id: row
                .order_id
                .as_deref()
                .map(|id| parse::<OrderId>("order_id", id))
                .transpose()?,
            consumed: row.consumed,
            created_at: Timestamp::from_datetime(row.created_utc),
        })
    }
}

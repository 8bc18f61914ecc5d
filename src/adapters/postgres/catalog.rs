//! PostgreSQL price catalog and account lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingAccount, Discount, Price};
use crate::domain::foundation::{Currency, DomainError, MemberId, Money, Timestamp};
use crate::domain::membership::Edition;
use crate::ports::{AccountLookup, PriceCatalog};

use super::rows::db_err;

pub struct PostgresPriceCatalog {
    pool: PgPool,
}

impl PostgresPriceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: String,
    edition: String,
    amount_minor: i64,
    currency: String,
}

impl TryFrom<PriceRow> for Price {
    type Error = DomainError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let edition: Edition = row
            .edition
            .parse()
            .map_err(|e| db_err("invalid price edition", e))?;
        let currency: Currency = row
            .currency
            .parse()
            .map_err(|e| db_err("invalid price currency", e))?;
        Ok(Price {
            id: row.id,
            edition,
            unit_amount: Money::new(row.amount_minor, currency)
                .map_err(|e| db_err("invalid price amount", e))?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: String,
    price_id: String,
    off_minor: i64,
    starts_utc: Option<DateTime<Utc>>,
    ends_utc: Option<DateTime<Utc>>,
}

impl From<DiscountRow> for Discount {
    fn from(row: DiscountRow) -> Self {
        Discount {
            id: row.id,
            price_id: row.price_id,
            off_minor: row.off_minor,
            starts_at: row.starts_utc.map(Timestamp::from_datetime),
            ends_at: row.ends_utc.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl PriceCatalog for PostgresPriceCatalog {
    async fn find_price(&self, edition: Edition) -> Result<Option<Price>, DomainError> {
        let row: Option<PriceRow> = sqlx::query_as(
            r#"
            SELECT id, edition, amount_minor, currency
            FROM prices
            WHERE edition = $1 AND active
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(edition.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find price", e))?;

        row.map(Price::try_from).transpose()
    }

    async fn find_discount(&self, discount_id: &str) -> Result<Option<Discount>, DomainError> {
        let row: Option<DiscountRow> = sqlx::query_as(
            "SELECT id, price_id, off_minor, starts_utc, ends_utc FROM discounts WHERE id = $1",
        )
        .bind(discount_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find discount", e))?;

        Ok(row.map(Discount::from))
    }
}

pub struct PostgresAccountLookup {
    pool: PgPool,
}

impl PostgresAccountLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    ftc_id: Option<Uuid>,
    union_id: Option<String>,
    email: Option<String>,
    is_test: bool,
    stripe_customer_id: Option<String>,
}

#[async_trait]
impl AccountLookup for PostgresAccountLookup {
    async fn find_account(
        &self,
        member: &MemberId,
    ) -> Result<Option<BillingAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT ftc_id, union_id, email, is_test, stripe_customer_id
            FROM accounts
            WHERE ftc_id = $1 OR union_id = $2
            LIMIT 1
            "#,
        )
        .bind(member.ftc_id().copied())
        .bind(member.union_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find account", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let member_id = MemberId::new(row.ftc_id, row.union_id)
            .map_err(|e| db_err("account without identity", e))?;

        let mut account = BillingAccount::new(member_id, row.email);
        if row.is_test {
            account = account.sandbox();
        }
        if let Some(customer) = row.stripe_customer_id {
            account = account.with_stripe_customer(customer);
        }
        Ok(Some(account))
    }
}

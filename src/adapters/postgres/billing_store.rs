//! PostgreSQL implementation of `BillingStore` / `BillingTx`.
//!
//! A transaction serializes on the member with
//! `pg_advisory_xact_lock(hashtext(member_key))` before `SELECT ... FOR UPDATE`,
//! so a reader without a membership row yet is locked too. Both locks are
//! released when the transaction ends.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::billing::Order;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventEnvelope, MemberId, OrderId, Timestamp,
};
use crate::domain::membership::{AddOn, Membership, MembershipSnapshot};
use crate::ports::{BillingStore, BillingTx, OutboxEntry};

use super::rows::{
    db_err, AddOnRow, MembershipColumns, MembershipRow, OrderRow, MEMBERSHIP_COLUMNS,
    ORDER_COLUMNS,
};

pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err("Failed to begin transaction", e))?;
        Ok(Box::new(PostgresBillingTx { tx }))
    }

    async fn save_order(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, ftc_id, union_id, member_key, edition, kind, payment_method, price_id,
                discount_id, amount_minor, currency, cycle_count, status, created_utc
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.member_id.ftc_id().copied())
        .bind(order.member_id.union_id())
        .bind(order.member_id.compound_key())
        .bind(order.edition.to_string())
        .bind(order.kind.as_str())
        .bind(order.payment_method.as_str())
        .bind(&order.price_id)
        .bind(&order.discount_id)
        .bind(order.charge.amount_minor())
        .bind(order.charge.currency().as_str())
        .bind(order.cycle_count as i32)
        .bind(order.status.as_str())
        .bind(order.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to save order", e))?;

        Ok(())
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_membership(&self, member: &MemberId) -> Result<Membership, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM memberships WHERE ftc_id = $1 OR union_id = $2 LIMIT 1",
            MEMBERSHIP_COLUMNS
        ))
        .bind(member.ftc_id().copied())
        .bind(member.union_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find membership", e))?;

        match row {
            Some(row) => Membership::try_from(row),
            None => Ok(Membership::zero(member.clone())),
        }
    }

    async fn list_unexpired_orders(
        &self,
        member: &MemberId,
        as_of: Timestamp,
    ) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM orders
            WHERE (ftc_id = $1 OR union_id = $2)
              AND status = 'confirmed'
              AND end_utc > $3
            ORDER BY created_utc
            "#,
            ORDER_COLUMNS
        ))
        .bind(member.ftc_id().copied())
        .bind(member.union_id())
        .bind(as_of.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to list orders", e))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_add_ons(&self, member: &MemberId) -> Result<Vec<AddOn>, DomainError> {
        let rows: Vec<AddOnRow> = sqlx::query_as(
            r#"
            SELECT id, ftc_id, union_id, tier, days, source, order_id, consumed, created_utc
            FROM add_ons
            WHERE ftc_id = $1 OR union_id = $2
            ORDER BY created_utc
            "#,
        )
        .bind(member.ftc_id().copied())
        .bind(member.union_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to list add-ons", e))?;

        rows.into_iter().map(AddOn::try_from).collect()
    }
}

pub struct PostgresBillingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTx for PostgresBillingTx {
    async fn load_membership_for_update(
        &mut self,
        member: &MemberId,
    ) -> Result<Membership, DomainError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(member.compound_key())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("Failed to lock member", e))?;

        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM memberships WHERE ftc_id = $1 OR union_id = $2 LIMIT 1 FOR UPDATE",
            MEMBERSHIP_COLUMNS
        ))
        .bind(member.ftc_id().copied())
        .bind(member.union_id())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to load membership", e))?;

        match row {
            Some(row) => Membership::try_from(row),
            None => Ok(Membership::zero(member.clone())),
        }
    }

    async fn load_order_for_update(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to load order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn confirm_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let (start, end) = match order.window {
            Some(w) => (Some(*w.start.as_datetime()), Some(*w.end.as_datetime())),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                kind = $2,
                status = 'confirmed',
                start_utc = $3,
                end_utc = $4,
                transaction_id = $5,
                confirmed_utc = $6
            WHERE id = $1 AND status = 'unconfirmed'
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.kind.as_str())
        .bind(start)
        .bind(end)
        .bind(&order.transaction_id)
        .bind(order.confirmed_at.map(|t| *t.as_datetime()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to confirm order", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ConcurrencyConflict,
                format!("order {} is missing or already confirmed", order.id),
            ));
        }
        Ok(())
    }

    async fn save_snapshot(&mut self, snapshot: &MembershipSnapshot) -> Result<(), DomainError> {
        let body = serde_json::to_string(&snapshot.membership).map_err(|e| {
            DomainError::new(ErrorCode::SerializationError, format!("snapshot: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO membership_snapshots (id, member_key, reason, order_id, membership, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(snapshot.id.as_uuid())
        .bind(snapshot.membership.member_id.compound_key())
        .bind(snapshot.reason.as_str())
        .bind(snapshot.order_id.as_ref().map(|id| id.as_str()))
        .bind(body)
        .bind(snapshot.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to save snapshot", e))?;

        Ok(())
    }

    async fn save_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        let cols = MembershipColumns::from(membership);

        sqlx::query(
            r#"
            INSERT INTO memberships (
                member_key, ftc_id, union_id, tier, cycle, expire_date, vip_type, expire_time,
                payment_method, provider, provider_ref, provider_status, auto_renew,
                reserved_standard, reserved_premium, updated_utc
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (member_key) DO UPDATE SET
                ftc_id = EXCLUDED.ftc_id,
                union_id = EXCLUDED.union_id,
                tier = EXCLUDED.tier,
                cycle = EXCLUDED.cycle,
                expire_date = EXCLUDED.expire_date,
                vip_type = EXCLUDED.vip_type,
                expire_time = EXCLUDED.expire_time,
                payment_method = EXCLUDED.payment_method,
                provider = EXCLUDED.provider,
                provider_ref = EXCLUDED.provider_ref,
                provider_status = EXCLUDED.provider_status,
                auto_renew = EXCLUDED.auto_renew,
                reserved_standard = EXCLUDED.reserved_standard,
                reserved_premium = EXCLUDED.reserved_premium,
                updated_utc = EXCLUDED.updated_utc
            "#,
        )
        .bind(membership.member_id.compound_key())
        .bind(membership.member_id.ftc_id().copied())
        .bind(membership.member_id.union_id())
        .bind(cols.tier)
        .bind(cols.cycle)
        .bind(cols.expire_date)
        .bind(cols.vip_type)
        .bind(cols.expire_time)
        .bind(cols.payment_method)
        .bind(cols.provider)
        .bind(cols.provider_ref)
        .bind(cols.provider_status)
        .bind(membership.auto_renew)
        .bind(cols.reserved_standard)
        .bind(cols.reserved_premium)
        .bind(membership.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to save membership", e))?;

        Ok(())
    }

    async fn delete_membership(&mut self, member: &MemberId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM memberships WHERE ftc_id = $1 OR union_id = $2")
            .bind(member.ftc_id().copied())
            .bind(member.union_id())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("Failed to delete membership", e))?;
        Ok(())
    }

    async fn save_add_on(&mut self, add_on: &AddOn) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO add_ons (
                id, ftc_id, union_id, member_key, tier, days, source, order_id, consumed, created_utc
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(add_on.id.as_uuid())
        .bind(add_on.member_id.ftc_id().copied())
        .bind(add_on.member_id.union_id())
        .bind(add_on.member_id.compound_key())
        .bind(add_on.tier.as_str())
        .bind(i32::try_from(add_on.days).unwrap_or(i32::MAX))
        .bind(add_on.source.as_str())
        .bind(add_on.order_id.as_ref().map(|id| id.as_str()))
        .bind(add_on.consumed)
        .bind(add_on.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("Failed to save add-on", e))?;

        Ok(())
    }

    async fn write_outbox(
        &mut self,
        events: &[EventEnvelope],
        partition_key: &str,
    ) -> Result<(), DomainError> {
        for event in events {
            let entry = OutboxEntry::new(event.clone(), partition_key);
            super::outbox::insert_entry(&mut *self.tx, &entry).await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_err("Failed to commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_err("Failed to roll back", e))
    }
}

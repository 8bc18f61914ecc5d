//! ConfirmPaymentHandler - Command handler for gateway payment notifications.
//!
//! Runs the whole reconciliation as one locked unit of work:
//!
//! 1. lock the member and load the current membership
//! 2. re-read the order inside the lock
//! 3. run the confirmation engine and project the next membership
//! 4. write snapshot, confirmed order, membership, add-on and outbox events
//! 5. commit
//!
//! Any failure rolls the unit back. A timeout around the unit turns a stuck
//! lock or slow database into `TransientInfra`, which the gateway retries.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    project, BillingError, Confirmation, ConfirmationEngine, Order, OrderConfirmed, PaymentResult,
};
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, SerializableDomainEvent};
use crate::domain::membership::{AddOn, AddOnCreated, Membership, MembershipSnapshot, MembershipSnapshotTaken};
use crate::ports::{BillingStore, BillingTx};

#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub payment: PaymentResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentResult {
    pub order: Order,
    pub membership: Membership,
    pub add_on: Option<AddOn>,
    pub snapshot: Option<MembershipSnapshot>,
}

pub struct ConfirmPaymentHandler {
    store: Arc<dyn BillingStore>,
    engine: ConfirmationEngine,
    timeout: Duration,
}

impl ConfirmPaymentHandler {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(store: Arc<dyn BillingStore>, engine: ConfirmationEngine) -> Self {
        Self {
            store,
            engine,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, BillingError> {
        let payment = cmd.payment;

        let result = match tokio::time::timeout(self.timeout, self.reconcile(&payment)).await {
            Ok(result) => result,
            Err(_) => Err(BillingError::TransientInfra(format!(
                "confirmation of {} timed out after {:?}",
                payment.order_id, self.timeout
            ))),
        };

        match &result {
            Ok(done) => tracing::info!(
                order_id = %done.order.id,
                member = %done.order.member_id,
                kind = %done.order.kind,
                "order confirmed"
            ),
            Err(BillingError::DuplicateConfirmation(id)) => {
                tracing::info!(order_id = %id, "duplicate confirmation ignored")
            }
            Err(BillingError::AmountMismatch {
                order_id,
                expected,
                paid,
            }) => tracing::error!(
                order_id = %order_id,
                expected,
                paid,
                payload = %payment.raw.as_ref().map(|r| r.to_string()).unwrap_or_default(),
                "paid amount does not match order"
            ),
            Err(e) if e.is_retryable() => {
                tracing::warn!(order_id = %payment.order_id, error = %e, "confirmation failed, will retry")
            }
            Err(e) => tracing::warn!(order_id = %payment.order_id, error = %e, "confirmation rejected"),
        }

        result
    }

    async fn reconcile(&self, payment: &PaymentResult) -> Result<ConfirmPaymentResult, BillingError> {
        let order = self
            .store
            .find_order(&payment.order_id)
            .await?
            .ok_or_else(|| BillingError::not_found("order", payment.order_id.as_str()))?;
        if order.is_confirmed() {
            return Err(BillingError::DuplicateConfirmation(order.id));
        }

        let mut tx = self.store.begin().await?;
        match self.apply(tx.as_mut(), &order, payment).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(order_id = %order.id, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn BillingTx,
        order: &Order,
        payment: &PaymentResult,
    ) -> Result<ConfirmPaymentResult, BillingError> {
        let current = tx.load_membership_for_update(&order.member_id).await?;
        let order = tx
            .load_order_for_update(&order.id)
            .await?
            .ok_or_else(|| BillingError::not_found("order", order.id.as_str()))?;

        let Confirmation {
            order,
            add_on,
            snapshot,
        } = self.engine.confirm(&order, payment, &current)?;
        let membership = project(&order, add_on.as_ref(), &current)?;

        if let Some(snapshot) = &snapshot {
            tx.save_snapshot(snapshot).await?;
        }
        tx.confirm_order(&order).await?;
        tx.save_membership(&membership).await?;
        if let Some(add_on) = &add_on {
            tx.save_add_on(add_on).await?;
        }

        let events = events_for(&order, add_on.as_ref(), snapshot.as_ref())?;
        tx.write_outbox(&events, &order.member_id.compound_key())
            .await?;

        Ok(ConfirmPaymentResult {
            order,
            membership,
            add_on,
            snapshot,
        })
    }
}

fn events_for(
    order: &Order,
    add_on: Option<&AddOn>,
    snapshot: Option<&MembershipSnapshot>,
) -> Result<Vec<EventEnvelope>, DomainError> {
    let serialization = |e: serde_json::Error| {
        DomainError::new(ErrorCode::SerializationError, format!("event payload: {}", e))
    };
    let correlate = |envelope: EventEnvelope| {
        let envelope = envelope.with_correlation_id(order.id.as_str());
        match &order.transaction_id {
            Some(txn) => envelope.with_causation_id(txn.clone()),
            None => envelope,
        }
    };

    let mut events = Vec::new();
    if let Some(snapshot) = snapshot {
        events.push(
            MembershipSnapshotTaken::from_snapshot(snapshot)
                .to_envelope()
                .map_err(serialization)?,
        );
    }
    let confirmed = OrderConfirmed::from_order(order, add_on.map(|a| a.days)).ok_or_else(|| {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("order {} is not confirmed", order.id),
        )
    })?;
    events.push(confirmed.to_envelope().map_err(serialization)?);
    if let Some(add_on) = add_on {
        events.push(
            AddOnCreated::from_add_on(add_on)
                .to_envelope()
                .map_err(serialization)?,
        );
    }
    Ok(events.into_iter().map(correlate).collect())
}

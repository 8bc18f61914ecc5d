//! Confirmation emails, driven by `order.confirmed` events from the outbox.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::billing::{OrderConfirmed, OrderKind};
use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, EventEnvelope, MemberId, Money, ValidationError,
};
use crate::ports::{AccountLookup, EventPublisher, Notifier, Parcel};

pub const ORDER_CONFIRMED: &str = "order.confirmed.v1";

/// Subscriber that emails the reader once an order is confirmed.
///
/// Readers without an account or email are skipped. A delivery failure is
/// returned so the outbox marks the entry failed and retries it.
pub struct ConfirmationMailer {
    accounts: Arc<dyn AccountLookup>,
    notifier: Arc<dyn Notifier>,
}

impl ConfirmationMailer {
    pub fn new(accounts: Arc<dyn AccountLookup>, notifier: Arc<dyn Notifier>) -> Self {
        Self { accounts, notifier }
    }

    fn compose(event: &OrderConfirmed, to_address: String) -> Result<Parcel, ValidationError> {
        let subject = match event.kind {
            OrderKind::Create => "Your subscription is active",
            OrderKind::Renew => "Your subscription has been renewed",
            OrderKind::Upgrade => "Your subscription has been upgraded",
            OrderKind::AddOn => "Your add-on has been added",
            OrderKind::SwitchCycle => "Your billing cycle has changed",
        };

        let paid = Money::new(event.amount_minor, event.currency.parse::<Currency>()?)?;
        let mut body = format!(
            "Order {} for {} has been confirmed.\nPaid: {} via {}.\n",
            event.order_id, event.edition, paid, event.payment_method,
        );
        if let Some(window) = event.window {
            body.push_str(&format!(
                "Valid from {} to {}.\n",
                window.start.date(),
                window.end.date()
            ));
        }
        if let Some(days) = event.add_on_days {
            body.push_str(&format!("{} days have been reserved for later use.\n", days));
        }

        Ok(Parcel {
            to_address,
            to_name: None,
            subject: subject.to_string(),
            body,
        })
    }
}

#[async_trait]
impl EventPublisher for ConfirmationMailer {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        if envelope.event_type != ORDER_CONFIRMED {
            return Ok(());
        }

        let event: OrderConfirmed = envelope.payload_as().map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("bad order.confirmed payload: {}", e),
            )
        })?;
        let member = MemberId::from_compound_key(&event.member_key)?;

        let email = self
            .accounts
            .find_account(&member)
            .await?
            .and_then(|a| a.email);
        let Some(email) = email else {
            tracing::debug!(order_id = %event.order_id, member = %member, "no email on file, skipping");
            return Ok(());
        };

        let parcel = Self::compose(&event, email)?;
        self.notifier.deliver(&parcel).await?;

        tracing::info!(order_id = %event.order_id, "confirmation email sent");
        Ok(())
    }
}

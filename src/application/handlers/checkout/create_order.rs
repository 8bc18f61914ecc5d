//! CreateOrderHandler - Command handler that turns a checkout request into an unconfirmed order.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, CheckoutIntent, IntentResolver, Order, OrderBuilder, OrderRequest,
};
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::membership::{Edition, PaymentMethod};
use crate::ports::{AccountLookup, BillingStore, PriceCatalog};

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub member: MemberId,
    pub edition: Edition,
    pub method: PaymentMethod,
    pub cycle_count: u32,
    pub discount_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub order: Order,
    pub intent: CheckoutIntent,
}

/// Resolves the intent, prices it and stores the unconfirmed order.
///
/// The gateway call itself happens at the boundary, using the returned
/// order id and charge.
pub struct CreateOrderHandler {
    store: Arc<dyn BillingStore>,
    accounts: Arc<dyn AccountLookup>,
    catalog: Arc<dyn PriceCatalog>,
    resolver: IntentResolver,
    builder: OrderBuilder,
}

impl CreateOrderHandler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        accounts: Arc<dyn AccountLookup>,
        catalog: Arc<dyn PriceCatalog>,
        resolver: IntentResolver,
        builder: OrderBuilder,
    ) -> Self {
        Self {
            store,
            accounts,
            catalog,
            resolver,
            builder,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, BillingError> {
        let now = Timestamp::now();

        // 1. Who is paying
        let account = self
            .accounts
            .find_account(&cmd.member)
            .await?
            .ok_or_else(|| BillingError::not_found("account", cmd.member.compound_key()))?;

        // 2. What they may buy
        let membership = self.store.find_membership(&cmd.member).await?;
        let intent = self
            .resolver
            .resolve(&membership, cmd.edition, cmd.method, now)?;

        // 3. At what price
        let price = self
            .catalog
            .find_price(cmd.edition)
            .await?
            .ok_or_else(|| BillingError::not_found("price", cmd.edition.to_string()))?;
        let discount = match &cmd.discount_id {
            Some(id) => self.catalog.find_discount(id).await?,
            None => None,
        };

        // 4. Build and persist
        let order = self.builder.build(
            OrderRequest {
                intent: &intent,
                method: cmd.method,
                account: &account,
                price: &price,
                discount: discount.as_ref(),
                cycle_count: cmd.cycle_count,
            },
            now,
        )?;
        self.store.save_order(&order).await?;

        tracing::info!(
            order_id = %order.id,
            member = %cmd.member,
            kind = %order.kind,
            edition = %order.edition,
            amount = %order.charge,
            "order created"
        );

        Ok(CreateOrderResult { order, intent })
    }
}

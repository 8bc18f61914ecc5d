//! GetWalletHandler - Query handler for the unused balance of one-time purchases.

use std::sync::Arc;

use crate::domain::billing::{compute_wallet, BillingError, Wallet};
use crate::domain::foundation::{Currency, MemberId, Timestamp};
use crate::ports::BillingStore;

#[derive(Debug, Clone)]
pub struct GetWalletQuery {
    pub member: MemberId,
}

pub struct GetWalletHandler {
    store: Arc<dyn BillingStore>,
    currency: Currency,
}

impl GetWalletHandler {
    pub fn new(store: Arc<dyn BillingStore>, currency: Currency) -> Self {
        Self { store, currency }
    }

    pub async fn handle(&self, query: GetWalletQuery) -> Result<Wallet, BillingError> {
        let now = Timestamp::now();
        let orders = self.store.list_unexpired_orders(&query.member, now).await?;
        let wallet = compute_wallet(&orders, now, self.currency);

        tracing::debug!(
            member = %query.member,
            balance = %wallet.balance,
            sources = wallet.sources.len(),
            "wallet computed"
        );

        Ok(wallet)
    }
}

//! ResolveIntentsHandler - Query handler listing what a reader may buy next.

use std::sync::Arc;

use crate::domain::billing::{BillingError, CheckoutIntent, IntentResolver};
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::membership::Edition;
use crate::ports::BillingStore;

#[derive(Debug, Clone)]
pub struct ResolveIntentsQuery {
    pub member: MemberId,
    pub edition: Edition,
}

pub struct ResolveIntentsHandler {
    store: Arc<dyn BillingStore>,
    resolver: IntentResolver,
}

impl ResolveIntentsHandler {
    pub fn new(store: Arc<dyn BillingStore>, resolver: IntentResolver) -> Self {
        Self { store, resolver }
    }

    pub async fn handle(
        &self,
        query: ResolveIntentsQuery,
    ) -> Result<Vec<CheckoutIntent>, BillingError> {
        let membership = self.store.find_membership(&query.member).await?;
        self.resolver
            .resolve_intents(&membership, query.edition, Timestamp::now())
    }
}

//! In-memory price catalog and account lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::billing::{BillingAccount, Discount, Price};
use crate::domain::foundation::{DomainError, ErrorCode, MemberId};
use crate::domain::membership::Edition;
use crate::ports::{AccountLookup, PriceCatalog};

fn poisoned() -> DomainError {
    DomainError::new(ErrorCode::InternalError, "catalog lock poisoned")
}

#[derive(Default)]
pub struct InMemoryPriceCatalog {
    prices: RwLock<HashMap<Edition, Price>>,
    discounts: RwLock<HashMap<String, Discount>>,
}

impl InMemoryPriceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the active price for its edition.
    pub fn with_price(self, price: Price) -> Self {
        if let Ok(mut prices) = self.prices.write() {
            prices.insert(price.edition, price);
        }
        self
    }

    pub fn with_discount(self, discount: Discount) -> Self {
        if let Ok(mut discounts) = self.discounts.write() {
            discounts.insert(discount.id.clone(), discount);
        }
        self
    }
}

#[async_trait]
impl PriceCatalog for InMemoryPriceCatalog {
    async fn find_price(&self, edition: Edition) -> Result<Option<Price>, DomainError> {
        Ok(self.prices.read().map_err(|_| poisoned())?.get(&edition).cloned())
    }

    async fn find_discount(&self, discount_id: &str) -> Result<Option<Discount>, DomainError> {
        Ok(self
            .discounts
            .read()
            .map_err(|_| poisoned())?
            .get(discount_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAccountLookup {
    accounts: RwLock<Vec<BillingAccount>>,
}

impl InMemoryAccountLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: BillingAccount) -> Self {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.push(account);
        }
        self
    }
}

#[async_trait]
impl AccountLookup for InMemoryAccountLookup {
    async fn find_account(
        &self,
        member: &MemberId,
    ) -> Result<Option<BillingAccount>, DomainError> {
        let key = member.compound_key();
        Ok(self
            .accounts
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .find(|a| a.member_id.compound_key() == key)
            .cloned())
    }
}

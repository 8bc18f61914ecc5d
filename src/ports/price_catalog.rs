//! Price catalog port (read-only).

use async_trait::async_trait;

use crate::domain::billing::{Discount, Price};
use crate::domain::foundation::DomainError;
use crate::domain::membership::Edition;

#[async_trait]
pub trait PriceCatalog: Send + Sync {
    /// Active price for an edition.
    async fn find_price(&self, edition: Edition) -> Result<Option<Price>, DomainError>;

    async fn find_discount(&self, discount_id: &str) -> Result<Option<Discount>, DomainError>;
}

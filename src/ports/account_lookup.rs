//! Account lookup port.

use async_trait::async_trait;

use crate::domain::billing::BillingAccount;
use crate::domain::foundation::{DomainError, MemberId};

/// Resolves a reader to the identity checkout bills.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Returns `None` if the reader does not exist.
    async fn find_account(&self, member: &MemberId)
        -> Result<Option<BillingAccount>, DomainError>;
}

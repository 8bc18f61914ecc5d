//! Billing persistence ports.
//!
//! `BillingStore` covers reads and order inserts that need no lock.
//! `BillingTx` is the locked unit of work a confirmation runs in: every
//! write goes through it and nothing is visible until `commit`.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = store.begin().await?;
//! let current = tx.load_membership_for_update(&member).await?;
//! let order = tx.load_order_for_update(&order_id).await?;
//! // ... run the confirmation engine ...
//! tx.confirm_order(&confirmed).await?;
//! tx.save_membership(&next).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::billing::Order;
use crate::domain::foundation::{DomainError, EventEnvelope, MemberId, OrderId, Timestamp};
use crate::domain::membership::{AddOn, Membership, MembershipSnapshot};

/// Non-transactional billing persistence.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn BillingTx>, DomainError>;

    /// Inserts a new, unconfirmed order.
    async fn save_order(&self, order: &Order) -> Result<(), DomainError>;

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Current membership; the zero membership if the reader has none.
    async fn find_membership(&self, member: &MemberId) -> Result<Membership, DomainError>;

    /// Confirmed orders whose purchased window ends after `as_of`.
    async fn list_unexpired_orders(
        &self,
        member: &MemberId,
        as_of: Timestamp,
    ) -> Result<Vec<Order>, DomainError>;

    /// Add-on ledger for a member, oldest first.
    async fn list_add_ons(&self, member: &MemberId) -> Result<Vec<AddOn>, DomainError>;
}

/// A transaction holding the member's row lock.
///
/// Dropping without `commit` discards every write.
#[async_trait]
pub trait BillingTx: Send {
    /// Locks the member's membership row and reads it.
    ///
    /// Locks even when no row exists yet, returning the zero membership.
    async fn load_membership_for_update(
        &mut self,
        member: &MemberId,
    ) -> Result<Membership, DomainError>;

    /// Re-reads an order inside the lock.
    async fn load_order_for_update(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Persists the confirmed form of an order.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` if the stored order is already confirmed
    async fn confirm_order(&mut self, order: &Order) -> Result<(), DomainError>;

    async fn save_snapshot(&mut self, snapshot: &MembershipSnapshot) -> Result<(), DomainError>;

    /// Inserts or replaces the membership.
    async fn save_membership(&mut self, membership: &Membership) -> Result<(), DomainError>;

    async fn delete_membership(&mut self, member: &MemberId) -> Result<(), DomainError>;

    /// Appends to the add-on ledger.
    async fn save_add_on(&mut self, add_on: &AddOn) -> Result<(), DomainError>;

    /// Writes events to the outbox as part of this transaction.
    async fn write_outbox(
        &mut self,
        events: &[EventEnvelope],
        partition_key: &str,
    ) -> Result<(), DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

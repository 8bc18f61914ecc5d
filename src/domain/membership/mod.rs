//! Membership domain module.
//!
//! What a reader is entitled to and what they hold in reserve.
//!
//! # Module Structure
//!
//! - `aggregate` - Membership and its entitlement
//! - `edition` - Tier, Cycle and Edition
//! - `payment_method` - payment methods and rails
//! - `provider` - external provider handle and Stripe status
//! - `reserved_days` - per-tier reserved days
//! - `add_on` - add-on ledger entries
//! - `snapshot` - pre-change copies for audit and rollback

mod add_on;
mod aggregate;
mod edition;
mod events;
mod payment_method;
mod provider;
mod reserved_days;
mod snapshot;

pub use add_on::{AddOn, AddOnSource};
pub use aggregate::{Entitlement, Membership};
pub use edition::{Cycle, Edition, Tier};
pub use events::{AddOnCreated, MembershipDeleted, MembershipSnapshotTaken};
pub use payment_method::{PaymentMethod, Rail};
pub use provider::{ProviderHandle, StripeStatus};
pub use reserved_days::ReservedDays;
pub use snapshot::{MembershipSnapshot, SnapshotReason};

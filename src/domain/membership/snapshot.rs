//! Immutable copies of a membership taken before it is overwritten.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{OrderId, SnapshotId, Timestamp, ValidationError};

use super::Membership;

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    Create,
    Renew,
    Upgrade,
    AddOn,
    SwitchCycle,
    Delete,
}

impl SnapshotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotReason::Create => "create",
            SnapshotReason::Renew => "renew",
            SnapshotReason::Upgrade => "upgrade",
            SnapshotReason::AddOn => "add_on",
            SnapshotReason::SwitchCycle => "switch_cycle",
            SnapshotReason::Delete => "delete",
        }
    }
}

impl fmt::Display for SnapshotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SnapshotReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SnapshotReason::Create),
            "renew" => Ok(SnapshotReason::Renew),
            "upgrade" => Ok(SnapshotReason::Upgrade),
            "add_on" => Ok(SnapshotReason::AddOn),
            "switch_cycle" => Ok(SnapshotReason::SwitchCycle),
            "delete" => Ok(SnapshotReason::Delete),
            other => Err(ValidationError::invalid_format(
                "snapshot_reason",
                format!("unknown reason '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub id: SnapshotId,
    pub reason: SnapshotReason,
    pub order_id: Option<OrderId>,
    pub membership: Membership,
    pub created_at: Timestamp,
}

impl MembershipSnapshot {
    /// Captures `membership` as it is now. Returns `None` for the zero
    /// membership, which has nothing worth restoring.
    pub fn capture(
        membership: &Membership,
        reason: SnapshotReason,
        order_id: Option<OrderId>,
        at: Timestamp,
    ) -> Option<Self> {
        if membership.is_zero() {
            return None;
        }
        Some(Self {
            id: SnapshotId::new(),
            reason,
            order_id,
            membership: membership.clone(),
            created_at: at,
        })
    }
}

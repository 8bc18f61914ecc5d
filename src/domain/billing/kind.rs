//! Kinds of commercial transaction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;
use crate::domain::membership::SnapshotReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// First purchase, or a purchase after the previous membership lapsed.
    Create,
    /// Extends an active one-time membership of the same tier.
    Renew,
    /// Standard to premium.
    Upgrade,
    /// Reserved days on top of the current membership.
    AddOn,
    /// Stripe subscription moving between monthly and yearly billing.
    SwitchCycle,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Create => "create",
            OrderKind::Renew => "renew",
            OrderKind::Upgrade => "upgrade",
            OrderKind::AddOn => "add_on",
            OrderKind::SwitchCycle => "switch_cycle",
        }
    }

    /// Whether confirming this kind sets a purchased window.
    pub fn has_window(&self) -> bool {
        !matches!(self, OrderKind::AddOn)
    }

    pub fn snapshot_reason(&self) -> SnapshotReason {
        match self {
            OrderKind::Create => SnapshotReason::Create,
            OrderKind::Renew => SnapshotReason::Renew,
            OrderKind::Upgrade => SnapshotReason::Upgrade,
            OrderKind::AddOn => SnapshotReason::AddOn,
            OrderKind::SwitchCycle => SnapshotReason::SwitchCycle,
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OrderKind::Create),
            "renew" => Ok(OrderKind::Renew),
            "upgrade" => Ok(OrderKind::Upgrade),
            "add_on" => Ok(OrderKind::AddOn),
            "switch_cycle" => Ok(OrderKind::SwitchCycle),
            other => Err(ValidationError::invalid_format(
                "order_kind",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_add_on_lacks_a_window() {
        assert!(!OrderKind::AddOn.has_window());
        assert!(OrderKind::Create.has_window());
        assert!(OrderKind::SwitchCycle.has_window());
    }

    #[test]
    fn snapshot_reason_mirrors_kind() {
        assert_eq!(OrderKind::Upgrade.snapshot_reason(), SnapshotReason::Upgrade);
        assert_eq!(OrderKind::AddOn.snapshot_reason(), SnapshotReason::AddOn);
    }

    #[test]
    fn kind_parses_snake_case() {
        assert_eq!("add_on".parse::<OrderKind>().unwrap(), OrderKind::AddOn);
        assert_eq!(
            "switch_cycle".parse::<OrderKind>().unwrap(),
            OrderKind::SwitchCycle
        );
        assert!("refund".parse::<OrderKind>().is_err());
    }
}

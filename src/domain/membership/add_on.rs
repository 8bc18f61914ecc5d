//! Add-on inventory: reserved days bought ahead or carried over on upgrade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AddOnId, MemberId, OrderId, Timestamp, ValidationError};

use super::Tier;

/// Where reserved days came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnSource {
    /// Bought explicitly as an add-on.
    UserPurchase,
    /// Unused standard time preserved when upgrading to premium.
    UpgradeCarryOver,
}

impl AddOnSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddOnSource::UserPurchase => "user_purchase",
            AddOnSource::UpgradeCarryOver => "upgrade_carry_over",
        }
    }
}

impl fmt::Display for AddOnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AddOnSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_purchase" => Ok(AddOnSource::UserPurchase),
            "upgrade_carry_over" => Ok(AddOnSource::UpgradeCarryOver),
            other => Err(ValidationError::invalid_format(
                "add_on_source",
                format!("unknown source '{}'", other),
            )),
        }
    }
}

/// A quantity of reserved days for one tier. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: AddOnId,
    pub member_id: MemberId,
    pub tier: Tier,
    pub days: u32,
    pub source: AddOnSource,
    pub order_id: Option<OrderId>,
    pub consumed: bool,
    pub created_at: Timestamp,
}

impl AddOn {
    /// Reserved days bought by the reader.
    pub fn purchased(
        member_id: MemberId,
        tier: Tier,
        days: u32,
        order_id: OrderId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: AddOnId::new(),
            member_id,
            tier,
            days,
            source: AddOnSource::UserPurchase,
            order_id: Some(order_id),
            consumed: false,
            created_at,
        }
    }

    /// Standard days left over when the reader upgraded. `None` when nothing was left.
    pub fn carry_over(
        member_id: MemberId,
        days: u32,
        order_id: OrderId,
        created_at: Timestamp,
    ) -> Option<Self> {
        (days > 0).then(|| Self {
            id: AddOnId::new(),
            member_id,
            tier: Tier::Standard,
            days,
            source: AddOnSource::UpgradeCarryOver,
            order_id: Some(order_id),
            consumed: false,
            created_at,
        })
    }
}

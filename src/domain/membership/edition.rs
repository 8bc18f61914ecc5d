//! Tier, billing cycle and the edition they form together.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Subscription tier. Declaration order is the upgrade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Tier::Standard),
            "premium" => Ok(Tier::Premium),
            other => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", other),
            )),
        }
    }
}

/// Billing cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cycle {
    Month,
    Year,
}

impl Cycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cycle::Month => "month",
            Cycle::Year => "year",
        }
    }

    /// Nominal length in days, used where a day count is stored instead of a window.
    pub fn days(&self) -> u32 {
        match self {
            Cycle::Month => 30,
            Cycle::Year => 365,
        }
    }

    /// Advances `start` by `count` calendar cycles.
    pub fn advance(&self, start: Timestamp, count: u32) -> Timestamp {
        match self {
            Cycle::Month => start.add_months(count),
            Cycle::Year => start.add_years(count),
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Cycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(Cycle::Month),
            "year" => Ok(Cycle::Year),
            other => Err(ValidationError::invalid_format(
                "cycle",
                format!("unknown cycle '{}'", other),
            )),
        }
    }
}

/// A sellable product line: tier plus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edition {
    pub tier: Tier,
    pub cycle: Cycle,
}

impl Edition {
    pub const STANDARD_MONTH: Edition = Edition::new(Tier::Standard, Cycle::Month);
    pub const STANDARD_YEAR: Edition = Edition::new(Tier::Standard, Cycle::Year);
    pub const PREMIUM_YEAR: Edition = Edition::new(Tier::Premium, Cycle::Year);

    pub const fn new(tier: Tier, cycle: Cycle) -> Self {
        Self { tier, cycle }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tier, self.cycle)
    }
}

impl FromStr for Edition {
    type Err = ValidationError;

    /// Parses "standard_year" style keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tier, cycle) = s.split_once('_').ok_or_else(|| {
            ValidationError::invalid_format("edition", "expected '<tier>_<cycle>'")
        })?;
        Ok(Edition::new(tier.parse()?, cycle.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> Timestamp {
        Timestamp::from_datetime(DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn premium_ranks_above_standard() {
        assert!(Tier::Premium > Tier::Standard);
    }

    #[test]
    fn cycle_advances_by_calendar_units() {
        let start = at("2025-01-31T00:00:00Z");
        assert_eq!(Cycle::Month.advance(start, 1), at("2025-02-28T00:00:00Z"));
        assert_eq!(Cycle::Month.advance(start, 3), at("2025-04-30T00:00:00Z"));
        assert_eq!(Cycle::Year.advance(start, 2), at("2027-01-31T00:00:00Z"));
    }

    #[test]
    fn edition_key_roundtrips() {
        let ed: Edition = "premium_year".parse().unwrap();
        assert_eq!(ed, Edition::PREMIUM_YEAR);
        assert_eq!(ed.to_string(), "premium_year");
    }

    #[test]
    fn edition_rejects_unknown_parts() {
        assert!("gold_year".parse::<Edition>().is_err());
        assert!("standard_week".parse::<Edition>().is_err());
        assert!("standard".parse::<Edition>().is_err());
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"premium\"");
    }
}

//! Per-tier reserved (not yet active) subscription days.

use serde::{Deserialize, Serialize};

use super::Tier;

/// Days held in reserve for each tier.
///
/// Unsigned, so never negative. Only grows here; draining happens when
/// reserved time is activated after the current entitlement lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReservedDays {
    pub standard: u32,
    pub premium: u32,
}

impl ReservedDays {
    pub fn new(standard: u32, premium: u32) -> Self {
        Self { standard, premium }
    }

    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Standard => self.standard,
            Tier::Premium => self.premium,
        }
    }

    /// Returns a copy with `days` added to `tier`.
    pub fn plus(self, tier: Tier, days: u32) -> Self {
        match tier {
            Tier::Standard => Self {
                standard: self.standard.saturating_add(days),
                ..self
            },
            Tier::Premium => Self {
                premium: self.premium.saturating_add(days),
                ..self
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.standard == 0 && self.premium == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_only_touches_one_tier() {
        let days = ReservedDays::new(10, 5).plus(Tier::Standard, 40);
        assert_eq!(days, ReservedDays::new(50, 5));

        let days = days.plus(Tier::Premium, 366);
        assert_eq!(days.get(Tier::Premium), 371);
        assert_eq!(days.get(Tier::Standard), 50);
    }

    #[test]
    fn plus_saturates() {
        let days = ReservedDays::new(u32::MAX - 1, 0).plus(Tier::Standard, 10);
        assert_eq!(days.standard, u32::MAX);
    }

    #[test]
    fn default_is_empty() {
        assert!(ReservedDays::default().is_empty());
        assert!(!ReservedDays::new(0, 1).is_empty());
    }
}

//! Tunable billing rules.

use serde::{Deserialize, Serialize};

/// Constants the resolver, builder and engine share.
///
/// Loaded from `BillingConfig`; `Default` gives production values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRules {
    /// Extra days granted on every one-time (wallet rail) purchase.
    pub grace_days: u32,
    /// Renewals are refused once remaining validity exceeds this many years.
    pub renewal_horizon_years: u32,
    /// Charge applied to sandbox accounts, in minor units.
    pub sandbox_charge_minor: i64,
}

impl Default for BillingRules {
    fn default() -> Self {
        Self {
            grace_days: 1,
            renewal_horizon_years: 3,
            sandbox_charge_minor: 1,
        }
    }
}

//! Billing configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::billing::BillingRules;
use crate::domain::foundation::Currency;

/// Billing rules plus confirmation settings
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Extra days on one-time purchases
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,

    /// Renewals are refused past this many years of remaining validity
    #[serde(default = "default_renewal_horizon")]
    pub renewal_horizon_years: u32,

    /// Amount charged to sandbox accounts, in minor units
    #[serde(default = "default_sandbox_charge")]
    pub sandbox_charge_minor: i64,

    /// Upper bound on one confirmation transaction
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Currency wallet balances are reported in
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Accessors used when wiring the checkout, confirmation and wallet handlers.
impl BillingConfig {
    pub fn rules(&self) -> BillingRules {
        BillingRules {
            grace_days: self.grace_days,
            renewal_horizon_years: self.renewal_horizon_years,
            sandbox_charge_minor: self.sandbox_charge_minor,
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn currency(&self) -> Result<Currency, ValidationError> {
        self.currency
            .parse()
            .map_err(|_| ValidationError::InvalidCurrency(self.currency.clone()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.currency()?;
        if self.sandbox_charge_minor <= 0 {
            return Err(ValidationError::InvalidSandboxCharge);
        }
        if self.renewal_horizon_years == 0 {
            return Err(ValidationError::InvalidRenewalHorizon);
        }
        if self.confirm_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
            renewal_horizon_years: default_renewal_horizon(),
            sandbox_charge_minor: default_sandbox_charge(),
            confirm_timeout_secs: default_confirm_timeout(),
            currency: default_currency(),
        }
    }
}

fn default_grace_days() -> u32 {
    BillingRules::default().grace_days
}

fn default_renewal_horizon() -> u32 {
    BillingRules::default().renewal_horizon_years
}

fn default_sandbox_charge() -> i64 {
    BillingRules::default().sandbox_charge_minor
}

fn default_confirm_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    "cny".to_string()
}

//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `PAYWALL` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use paywall_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Confirmations time out after {:?}", config.billing.confirm_timeout());
//! ```

mod billing;
mod database;
mod error;
mod logging;
mod outbox;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use outbox::OutboxConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Billing rules and confirmation timeout
    #[serde(default)]
    pub billing: BillingConfig,

    /// Outbox relay worker
    #[serde(default)]
    pub outbox: OutboxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads variables with the `PAYWALL` prefix
    /// 3. Splits nested keys on `__`
    ///
    /// - `PAYWALL__DATABASE__URL=...` -> `database.url = ...`
    /// - `PAYWALL__BILLING__GRACE_DAYS=1` -> `billing.grace_days = 1`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYWALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.billing.validate()?;
        self.outbox.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

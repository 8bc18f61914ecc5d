//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Sandbox charge must be positive")]
    InvalidSandboxCharge,

    #[error("Renewal horizon must be at least one year")]
    InvalidRenewalHorizon,

    #[error("Invalid confirmation timeout")]
    InvalidTimeout,

    #[error("Outbox {0} must be positive")]
    InvalidOutboxSetting(&'static str),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

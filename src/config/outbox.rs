//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::events::OutboxPublisherConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// How long published entries are kept
    #[serde(default = "default_retention")]
    pub retention_hours: u32,

    /// Failed entries are retried until this many attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl OutboxConfig {
    pub fn publisher_config(&self) -> OutboxPublisherConfig {
        OutboxPublisherConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_batch_size(self.batch_size)
            .with_retention_hours(self.retention_hours)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidOutboxSetting("poll_interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidOutboxSetting("batch_size"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidOutboxSetting("max_attempts"));
        }
        Ok(())
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            retention_hours: default_retention(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval() -> u64 {
    100
}

fn default_batch_size() -> u32 {
    100
}

fn default_retention() -> u32 {
    168
}

fn default_max_attempts() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_feed_publisher() {
        let publisher = OutboxConfig::default().publisher_config();
        assert_eq!(publisher.poll_interval, Duration::from_millis(100));
        assert_eq!(publisher.batch_size, 100);
        assert_eq!(publisher.retention_hours, 168);
    }

    #[test]
    fn zero_batch_is_rejected() {
        let config = OutboxConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidOutboxSetting("batch_size"))
        ));
    }
}

//! Outbox port - the relay side of the transactional outbox.
//!
//! Confirmations write events through `BillingTx::write_outbox` inside the
//! same transaction as the membership change. This port is what the
//! `OutboxPublisher` drains.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventEnvelope, ValidationError};

/// Delivery status of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Published,
    /// Last attempt failed; retried until `max_attempts`.
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Published => "published",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "published" => Ok(OutboxStatus::Published),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "outbox_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub event: EventEnvelope,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Member key of the aggregate owner; keeps one member's events in order.
    pub partition_key: String,
}

impl OutboxEntry {
    pub fn new(event: EventEnvelope, partition_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            partition_key: partition_key.into(),
        }
    }

    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = OutboxStatus::Failed;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
        self.last_error = Some(error.into());
    }

    /// Pending, or failed with attempts left.
    pub fn is_deliverable(&self, max_attempts: u32) -> bool {
        match self.status {
            OutboxStatus::Pending => true,
            OutboxStatus::Failed => self.attempts < max_attempts,
            OutboxStatus::Published => false,
        }
    }
}

#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Writes a single event outside any billing transaction.
    async fn write(
        &self,
        event: &EventEnvelope,
        partition_key: &str,
    ) -> Result<OutboxEntry, DomainError>;

    /// Deliverable entries, oldest first.
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError>;

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError>;

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError>;

    /// Deletes entries published more than `older_than_hours` ago.
    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_entry_marks_published() {
        let mut entry = OutboxEntry::new(EventEnvelope::test_fixture(), "member-1");
        assert_eq!(entry.status, OutboxStatus::Pending);

        entry.mark_published();

        assert_eq!(entry.status, OutboxStatus::Published);
        assert_eq!(entry.attempts, 1);
        assert!(entry.processed_at.is_some());
        assert!(!entry.is_deliverable(5));
    }

    #[test]
    fn failed_entry_is_retried_until_limit() {
        let mut entry = OutboxEntry::new(EventEnvelope::test_fixture(), "member-1");

        entry.mark_failed("smtp timeout");
        assert!(entry.is_deliverable(2));
        assert_eq!(entry.last_error.as_deref(), Some("smtp timeout"));

        entry.mark_failed("smtp timeout");
        assert!(!entry.is_deliverable(2));
    }

    #[test]
    fn status_roundtrips_through_string() {
        for s in [
            OutboxStatus::Pending,
            OutboxStatus::Published,
            OutboxStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<OutboxStatus>().unwrap(), s);
        }
    }
}

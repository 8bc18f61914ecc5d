//! In-memory outbox.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{OutboxEntry, OutboxStatus, OutboxWriter};

/// Outbox held in process memory.
///
/// Shared with `InMemoryBillingStore`, whose transactions append to it on
/// commit.
pub struct InMemoryOutbox {
    entries: Mutex<Vec<OutboxEntry>>,
    max_attempts: u32,
}

impl InMemoryOutbox {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    pub fn new() -> Self {
        Self::with_max_attempts(Self::DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_attempts,
        }
    }

    /// All entries, for assertions.
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn count_with_status(&self, status: OutboxStatus) -> usize {
        self.entries().iter().filter(|e| e.status == status).count()
    }

    /// Held by a committing transaction while it applies its writes.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Vec<OutboxEntry>>, DomainError> {
        self.entries
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "outbox lock poisoned"))
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut OutboxEntry)) -> Result<(), DomainError> {
        let mut entries = self.lock()?;
        let entry = entries.iter_mut().find(|e| e.id == id).ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, format!("outbox entry {} not found", id))
        })?;
        apply(entry);
        Ok(())
    }
}

impl Default for InMemoryOutbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutboxWriter for InMemoryOutbox {
    async fn write(
        &self,
        event: &EventEnvelope,
        partition_key: &str,
    ) -> Result<OutboxEntry, DomainError> {
        let entry = OutboxEntry::new(event.clone(), partition_key);
        self.lock()?.push(entry.clone());
        Ok(entry)
    }

    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let entries = self.lock()?;
        Ok(entries
            .iter()
            .filter(|e| e.is_deliverable(self.max_attempts))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        self.update(id, OutboxEntry::mark_published)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        self.update(id, |e| e.mark_failed(error))
    }

    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(older_than_hours));
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|e| {
            !(e.status == OutboxStatus::Published && e.processed_at.map_or(false, |t| t < cutoff))
        });
        Ok((before - entries.len()) as u64)
    }
}

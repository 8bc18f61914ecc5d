//! OutboxPublisher - relays committed outbox entries to an `EventPublisher`.
//!
//! Confirmations write their events into the outbox in the same
//! transaction as the membership change. This service polls the outbox,
//! publishes each entry and records the outcome. Entries that fail stay
//! deliverable and are retried on a later poll.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 100ms | How often to check for pending entries |
//! | `batch_size` | 100 | Max entries per poll |
//! | `retention_hours` | 168 | Age after which published entries are deleted |
//!
//! On shutdown the current batch completes before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::DomainError;
use crate::ports::{EventPublisher, OutboxWriter};

const CLEANUP_EVERY: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
    pub retention_hours: u32,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
            retention_hours: 168,
        }
    }
}

impl OutboxPublisherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_retention_hours(mut self, hours: u32) -> Self {
        self.retention_hours = hours;
        self
    }
}

pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxWriter>,
    event_publisher: Arc<dyn EventPublisher>,
    config: OutboxPublisherConfig,
}

impl OutboxPublisher {
    pub fn new(outbox: Arc<dyn OutboxWriter>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(outbox, event_publisher, OutboxPublisherConfig::default())
    }

    pub fn with_config(
        outbox: Arc<dyn OutboxWriter>,
        event_publisher: Arc<dyn EventPublisher>,
        config: OutboxPublisherConfig,
    ) -> Self {
        Self {
            outbox,
            event_publisher,
            config,
        }
    }

    /// Runs the relay loop until `shutdown` flips to `true`.
    ///
    /// Outbox read errors are logged and retried on the next tick; the loop
    /// only returns on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut poll = time::interval(self.config.poll_interval);
        let mut cleanup = time::interval(CLEANUP_EVERY);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "outbox publisher started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.process_batch().await?;
                        tracing::info!("outbox publisher stopped");
                        return Ok(());
                    }
                }

                _ = poll.tick() => {
                    if let Err(e) = self.process_batch().await {
                        tracing::error!(error = %e, "outbox poll failed");
                    }
                }

                _ = cleanup.tick() => {
                    match self.outbox.cleanup_old(self.config.retention_hours).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "outbox cleanup"),
                        Err(e) => tracing::warn!(error = %e, "outbox cleanup failed"),
                    }
                }
            }
        }
    }

    /// Publishes one batch of pending entries. Returns how many succeeded.
    pub async fn process_batch(&self) -> Result<usize, DomainError> {
        let entries = self.outbox.get_pending(self.config.batch_size).await?;
        let mut published_count = 0;

        for entry in entries {
            match self.event_publisher.publish(entry.event.clone()).await {
                Ok(()) => {
                    self.outbox.mark_published(entry.id).await?;
                    published_count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %entry.event.event_id,
                        event_type = %entry.event.event_type,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "failed to publish outbox entry"
                    );
                    self.outbox.mark_failed(entry.id, &e.to_string()).await?;
                }
            }
        }

        Ok(published_count)
    }

    pub async fn poll_once(&self) -> Result<usize, DomainError> {
        self.process_batch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{ErrorCode, EventEnvelope};
    use crate::ports::OutboxEntry;
    use serde_json::json;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Doubles
    // ════════════════════════════════════════════════════════════════════════════

    struct TestOutboxWriter {
        pending: RwLock<Vec<OutboxEntry>>,
        published_ids: RwLock<Vec<Uuid>>,
        failed_ids: RwLock<Vec<(Uuid, String)>>,
    }

    impl TestOutboxWriter {
        fn new() -> Self {
            Self {
                pending: RwLock::new(Vec::new()),
                published_ids: RwLock::new(Vec::new()),
                failed_ids: RwLock::new(Vec::new()),
            }
        }

        async fn add_pending(&self, event: EventEnvelope) {
            self.pending
                .write()
                .await
                .push(OutboxEntry::new(event, "member-1"));
        }

        async fn published_count(&self) -> usize {
            self.published_ids.read().await.len()
        }

        async fn failed_count(&self) -> usize {
            self.failed_ids.read().await.len()
        }
    }

    #[async_trait::async_trait]
    impl OutboxWriter for TestOutboxWriter {
        async fn write(
            &self,
            event: &EventEnvelope,
            partition_key: &str,
        ) -> Result<OutboxEntry, DomainError> {
            let entry = OutboxEntry::new(event.clone(), partition_key);
            self.pending.write().await.push(entry.clone());
            Ok(entry)
        }

        async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
            let mut pending = self.pending.write().await;
            let to_take = std::cmp::min(limit as usize, pending.len());
            Ok(pending.drain(..to_take).collect())
        }

        async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
            self.published_ids.write().await.push(id);
            Ok(())
        }

        async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
            self.failed_ids.write().await.push((id, error.to_string()));
            Ok(())
        }

        async fn cleanup_old(&self, _older_than_hours: u32) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    struct FailingPublisher;

    #[async_trait::async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "Publish failed"))
        }
    }

    fn envelope(order: &str) -> EventEnvelope {
        EventEnvelope::new("order.confirmed.v1", order, "Order", json!({ "order_id": order }))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn poll_once_publishes_pending_events() {
        let outbox = Arc::new(TestOutboxWriter::new());
        let bus = Arc::new(InMemoryEventBus::new());
        outbox.add_pending(envelope("FT0000000000000001")).await;
        outbox.add_pending(envelope("FT0000000000000002")).await;

        let publisher = OutboxPublisher::new(outbox.clone(), bus.clone());
        let count = publisher.poll_once().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(bus.event_count(), 2);
        assert_eq!(outbox.published_count().await, 2);
    }

    #[tokio::test]
    async fn poll_once_respects_batch_size() {
        let outbox = Arc::new(TestOutboxWriter::new());
        let bus = Arc::new(InMemoryEventBus::new());
        for i in 0..5 {
            outbox.add_pending(envelope(&format!("FT000000000000000{}", i))).await;
        }

        let config = OutboxPublisherConfig::default().with_batch_size(2);
        let publisher = OutboxPublisher::with_config(outbox.clone(), bus.clone(), config);

        assert_eq!(publisher.poll_once().await.unwrap(), 2);
        assert_eq!(publisher.poll_once().await.unwrap(), 2);
        assert_eq!(publisher.poll_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn poll_once_with_no_pending_returns_zero() {
        let outbox = Arc::new(TestOutboxWriter::new());
        let publisher = OutboxPublisher::new(outbox, Arc::new(InMemoryEventBus::new()));

        assert_eq!(publisher.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_publish_marks_entry_failed() {
        let outbox = Arc::new(TestOutboxWriter::new());
        outbox.add_pending(envelope("FT00000000000000FF")).await;

        let publisher = OutboxPublisher::new(outbox.clone(), Arc::new(FailingPublisher));
        let count = publisher.poll_once().await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(outbox.failed_count().await, 1);
        assert_eq!(outbox.published_count().await, 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let outbox = Arc::new(TestOutboxWriter::new());
        let bus = Arc::new(InMemoryEventBus::new());
        outbox.add_pending(envelope("FT0000000000000001")).await;

        let config = OutboxPublisherConfig::default().with_poll_interval(Duration::from_millis(10));
        let publisher = OutboxPublisher::with_config(outbox.clone(), bus.clone(), config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { publisher.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert!(bus.event_count() >= 1);
    }

    #[test]
    fn config_defaults() {
        let config = OutboxPublisherConfig::default();

        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.retention_hours, 168);
    }
}

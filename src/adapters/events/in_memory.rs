//! In-memory event bus.
//!
//! Records every published envelope and forwards it to the subscribers
//! registered for its event type. Used by tests and by local runs without
//! a broker.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus.
///
/// A subscriber failure is returned to the caller, so the outbox relay
/// marks the entry failed and retries it.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.subscribe("order.confirmed.v1", mailer);
///
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("order.confirmed.v1"));
/// ```
pub struct InMemoryEventBus {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventPublisher>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    /// Forwards events of `event_type` to `subscriber`.
    pub fn subscribe(&self, event_type: impl Into<String>, subscriber: Arc<dyn EventPublisher>) {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event_type.into())
            .or_default()
            .push(subscriber);
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());

        // Clone out so no lock is held across await points
        let subscribers: Vec<Arc<dyn EventPublisher>> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for subscriber in subscribers {
            subscriber.publish(event.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    struct Counter(RwLock<usize>);

    #[async_trait]
    impl EventPublisher for Counter {
        async fn publish(&self, _: EventEnvelope) -> Result<(), DomainError> {
            *self.0.write().unwrap() += 1;
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl EventPublisher for Broken {
        async fn publish(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "subscriber down"))
        }
    }

    #[tokio::test]
    async fn records_published_events() {
        let bus = InMemoryEventBus::new();

        bus.publish(EventEnvelope::test_fixture()).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("test.event.v1"));
        assert_eq!(bus.events_of_type("test.event.v1").len(), 1);
    }

    #[tokio::test]
    async fn forwards_only_to_matching_subscribers() {
        let bus = InMemoryEventBus::new();
        let hit = Arc::new(Counter(RwLock::new(0)));
        let miss = Arc::new(Counter(RwLock::new(0)));
        bus.subscribe("test.event.v1", hit.clone());
        bus.subscribe("order.confirmed.v1", miss.clone());

        bus.publish(EventEnvelope::test_fixture()).await.unwrap();

        assert_eq!(*hit.0.read().unwrap(), 1);
        assert_eq!(*miss.0.read().unwrap(), 0);
    }

    #[tokio::test]
    async fn subscriber_failure_is_returned() {
        let bus = InMemoryEventBus::new();
        bus.subscribe("test.event.v1", Arc::new(Broken));

        let result = bus.publish(EventEnvelope::test_fixture()).await;

        assert!(result.is_err());
        assert_eq!(bus.event_count(), 1);
    }
}

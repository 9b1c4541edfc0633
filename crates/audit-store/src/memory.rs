use std::collections::VecDeque;

use async_trait::async_trait;
use audit_model::{AuditResult, Event};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::{EventStore, push_bounded, validate_capacity};

/// Process-local store. A restart yields an empty log.
#[derive(Debug)]
pub struct MemoryEventStore {
    capacity: usize,
    events: RwLock<VecDeque<Event>>,
}

impl MemoryEventStore {
    pub fn new(capacity: usize) -> AuditResult<Self> {
        let capacity = validate_capacity(capacity)?;
        Ok(Self {
            capacity,
            events: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
        })
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn append(&self, event: Event) -> AuditResult<()> {
        let evicted = push_bounded(&mut self.events.write(), event, self.capacity);
        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "evicted oldest events");
        }
        Ok(())
    }

    async fn all(&self) -> Vec<Event> {
        self.events.read().iter().cloned().collect()
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> AuditResult<()> {
        let mut events = self.events.write();
        let dropped = events.len();
        events.clear();
        debug!(dropped, "event store cleared");
        Ok(())
    }

    async fn count(&self) -> usize {
        self.events.read().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;

    use super::MemoryEventStore;
    use crate::EventStore;
    use crate::testing::{event, labels};

    #[tokio::test]
    async fn keeps_only_the_most_recent_capacity_events() -> Result<()> {
        let store = MemoryEventStore::new(3)?;
        for label in ["e1", "e2", "e3", "e4", "e5"] {
            store.append(event(label)).await?;
            assert!(store.count().await <= 3);
        }

        assert_eq!(labels(&store.all().await), vec!["e3", "e4", "e5"]);
        Ok(())
    }

    #[tokio::test]
    async fn holds_everything_below_capacity_in_insertion_order() -> Result<()> {
        let store = MemoryEventStore::new(10)?;
        store.append(event("a")).await?;
        store.append(event("b")).await?;

        assert_eq!(store.count().await, 2);
        assert_eq!(labels(&store.all().await), vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn clear_empties_the_store() -> Result<()> {
        let store = MemoryEventStore::new(4)?;
        store.append(event("a")).await?;
        store.clear().await?;

        assert_eq!(store.count().await, 0);
        assert!(store.all().await.is_empty());

        store.clear().await?;
        assert_eq!(store.count().await, 0);
        Ok(())
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let error = MemoryEventStore::new(0).unwrap_err();
        assert!(error.to_string().contains("capacity"));
    }

    #[tokio::test]
    async fn concurrent_appends_never_exceed_capacity() -> Result<()> {
        let store = Arc::new(MemoryEventStore::new(16)?);
        let mut tasks = Vec::new();
        for worker in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for n in 0..50 {
                    store.append(event(&format!("w{worker}-{n}"))).await?;
                }
                Ok::<_, anyhow::Error>(())
            }));
        }
        for task in tasks {
            task.await.expect("append task panicked")?;
        }

        assert_eq!(store.count().await, 16);
        Ok(())
    }
}

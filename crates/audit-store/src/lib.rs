use std::collections::VecDeque;

use async_trait::async_trait;
use audit_model::{AuditError, AuditResult, Event};

mod file;
mod memory;

pub use file::FileEventStore;
pub use memory::MemoryEventStore;

/// Capacity used by the in-memory endpoints when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Insertion-ordered event log holding at most `capacity()` events.
///
/// Appending past capacity silently evicts the oldest events. Readers get a
/// snapshot; nothing handed out aliases the stored events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: Event) -> AuditResult<()>;
    /// Oldest first.
    async fn all(&self) -> Vec<Event>;
    async fn clear(&self) -> AuditResult<()>;
    async fn count(&self) -> usize;
    fn capacity(&self) -> usize;
}

pub(crate) fn validate_capacity(capacity: usize) -> AuditResult<usize> {
    if capacity == 0 {
        return Err(AuditError::InvalidConfig(
            "store capacity must be >= 1".to_owned(),
        ));
    }
    Ok(capacity)
}

/// Pushes `event` and drops from the front until `events.len() <= capacity`.
/// Returns how many events were evicted.
pub(crate) fn push_bounded(events: &mut VecDeque<Event>, event: Event, capacity: usize) -> usize {
    events.push_back(event);
    let overflow = events.len().saturating_sub(capacity);
    events.drain(..overflow);
    overflow
}

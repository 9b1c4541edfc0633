use std::path::PathBuf;
use std::sync::Arc;

use audit_aggregate::{DEFAULT_TOP_PAGES, Stats, Summary};
use audit_ingest::IngestionGateway;
use audit_model::{AuditResult, Event, RequestContext};
use audit_store::{DEFAULT_CAPACITY, EventStore, FileEventStore, MemoryEventStore};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct AuditServiceBuilder {
    capacity: usize,
    log_file: Option<PathBuf>,
    top_pages_limit: usize,
}

impl Default for AuditServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditServiceBuilder {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            log_file: None,
            top_pages_limit: DEFAULT_TOP_PAGES,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Persist to a JSON array file instead of keeping events in memory only.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn maybe_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn top_pages_limit(mut self, limit: usize) -> Self {
        self.top_pages_limit = limit;
        self
    }

    pub async fn build(self) -> AuditResult<AuditService> {
        let store: Arc<dyn EventStore> = match &self.log_file {
            Some(path) => Arc::new(FileEventStore::open(path, self.capacity).await?),
            None => Arc::new(MemoryEventStore::new(self.capacity)?),
        };
        info!(
            capacity = self.capacity,
            log_file = ?self.log_file,
            "audit store ready"
        );
        Ok(AuditService::new(store, self.top_pages_limit))
    }
}

/// Single entry point the transports talk to. Cloning shares the store.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn EventStore>,
    gateway: IngestionGateway,
    top_pages_limit: usize,
}

impl AuditService {
    pub fn new(store: Arc<dyn EventStore>, top_pages_limit: usize) -> Self {
        Self {
            store,
            gateway: IngestionGateway::new(),
            top_pages_limit,
        }
    }

    /// Ingests a raw request body and appends the result.
    #[instrument(skip(self, raw, ctx), fields(bytes = raw.len()))]
    pub async fn record(&self, raw: &[u8], ctx: &RequestContext) -> AuditResult<Event> {
        let event = self.gateway.ingest(raw, ctx)?;
        self.store.append(event.clone()).await?;
        Ok(event)
    }

    pub async fn events_newest_first(&self) -> Vec<Event> {
        let mut events = self.store.all().await;
        events.reverse();
        events
    }

    /// Oldest first, the order the log file uses.
    pub async fn export(&self) -> Vec<Event> {
        self.store.all().await
    }

    pub async fn summary(&self) -> Summary {
        audit_aggregate::summary(&self.store.all().await)
    }

    pub async fn stats(&self) -> Stats {
        audit_aggregate::stats(&self.store.all().await, self.top_pages_limit)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> AuditResult<()> {
        self.store.clear().await?;
        info!("audit trail cleared");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.store.count().await
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }
}

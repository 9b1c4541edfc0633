use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use audit_model::{AuditError, AuditResult, Event};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::{EventStore, push_bounded, validate_capacity};

/// Store backed by a single JSON array file.
///
/// The whole array is rewritten on every mutation (temp file + rename) and is
/// truncated to capacity both on load and on write. The in-memory copy only
/// changes once the rewrite has succeeded.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    capacity: usize,
    events: Mutex<VecDeque<Event>>,
}

impl FileEventStore {
    #[instrument(skip_all, fields(path = %path.as_ref().display(), capacity = capacity))]
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> AuditResult<Self> {
        let capacity = validate_capacity(capacity)?;
        let path = path.as_ref().to_path_buf();
        let mut events = Self::load(&path).await?;

        let overflow = events.len().saturating_sub(capacity);
        if overflow > 0 {
            debug!(overflow, "log file larger than capacity, dropping oldest");
            events.drain(..overflow);
        }
        debug!(loaded = events.len(), "event log opened");

        Ok(Self {
            path,
            capacity,
            events: Mutex::new(events),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> AuditResult<VecDeque<Event>> {
        let exists = fs::try_exists(path).await.map_err(|error| {
            AuditError::StoreUnavailable(format!("failed checking event log {path:?}: {error}"))
        })?;
        if !exists {
            return Ok(VecDeque::new());
        }

        let raw = fs::read_to_string(path).await.map_err(|error| {
            AuditError::StoreUnavailable(format!("failed reading event log {path:?}: {error}"))
        })?;
        if raw.trim().is_empty() {
            return Ok(VecDeque::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            AuditError::StoreUnavailable(format!("failed parsing event log {path:?}: {error}"))
        })
    }

    async fn persist(&self, events: &VecDeque<Event>) -> AuditResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|error| {
                AuditError::StoreUnavailable(format!(
                    "failed to create log dir {parent:?}: {error}"
                ))
            })?;
        }

        let body = serde_json::to_vec_pretty(events).map_err(AuditError::unavailable)?;
        let tmp = self.path.with_extension("json.tmp");
        let written = async {
            fs::write(&tmp, &body).await?;
            fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(error) = written {
            warn!(%error, path = %self.path.display(), "failed writing event log");
            let _ = fs::remove_file(&tmp).await;
            return Err(AuditError::StoreUnavailable(format!(
                "failed writing event log {:?}: {error}",
                self.path
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn append(&self, event: Event) -> AuditResult<()> {
        let mut guard = self.events.lock().await;
        let mut next = guard.clone();
        let evicted = push_bounded(&mut next, event, self.capacity);

        self.persist(&next).await?;
        *guard = next;
        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "evicted oldest events");
        }
        Ok(())
    }

    async fn all(&self) -> Vec<Event> {
        self.events.lock().await.iter().cloned().collect()
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> AuditResult<()> {
        let mut guard = self.events.lock().await;
        self.persist(&VecDeque::new()).await?;
        let dropped = guard.len();
        guard.clear();
        debug!(dropped, "event log cleared");
        Ok(())
    }

    async fn count(&self) -> usize {
        self.events.lock().await.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

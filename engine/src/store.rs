//! Per-id locked access to records.
//!
//! Every id maps to a slot guarded by its own async mutex. Handles own the slot guard,
//! so dropping a handle is the release on every exit path, including early returns and
//! cancelled futures. Reads and writes for one id are mutually exclusive; different ids
//! never contend beyond the slot table shard.

use crate::error::EngineError;
use crate::error::Result;
use crate::persistence::Persistence;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::OwnedMappedMutexGuard;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub trait StoredRecord: Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;
}

struct Slot<R> {
    loaded: bool,
    record: Option<R>,
}

impl<R> Default for Slot<R> {
    fn default() -> Self {
        Self {
            loaded: false,
            record: None,
        }
    }
}

type SlotTable<R> = DashMap<String, Arc<Mutex<Slot<R>>>>;

pub struct RecordStore<R: StoredRecord> {
    slots: Arc<SlotTable<R>>,
    persistence: Arc<dyn Persistence<R>>,
}

impl<R: StoredRecord> RecordStore<R> {
    pub fn new(persistence: Arc<dyn Persistence<R>>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            persistence,
        }
    }

    /// Consistent view of the record, absent when the id is unknown.
    pub async fn read_only(&self, id: &str, cancel: &CancellationToken) -> Result<ReadHandle<R>> {
        let guard = self.acquire(id, cancel).await?;
        Ok(ReadHandle {
            lease: Lease::new(id, guard, &self.slots),
        })
    }

    /// Exclusive handle, or `None` (with nothing held) when the id is unknown.
    pub async fn for_update(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<WriteHandle<R>>> {
        let guard = self.acquire(id, cancel).await?;
        match OwnedMutexGuard::try_map(guard, |slot| slot.record.as_mut()) {
            Ok(record) => Ok(Some(self.write_handle(id, record, false))),
            Err(guard) => {
                drop(Lease::new(id, guard, &self.slots));
                Ok(None)
            }
        }
    }

    /// Exclusive handle, creating the record with `init` when the id is unknown.
    pub async fn get_or_create(
        &self,
        id: &str,
        cancel: &CancellationToken,
        init: impl FnOnce() -> R,
    ) -> Result<WriteHandle<R>> {
        let guard = self.acquire(id, cancel).await?;
        let is_new = guard.record.is_none();
        let record = OwnedMutexGuard::map(guard, |slot| slot.record.get_or_insert_with(init));
        Ok(self.write_handle(id, record, is_new))
    }

    fn write_handle(
        &self,
        id: &str,
        record: OwnedMappedMutexGuard<Slot<R>, R>,
        is_new: bool,
    ) -> WriteHandle<R> {
        WriteHandle {
            id: id.to_string(),
            record,
            persistence: Arc::clone(&self.persistence),
            is_new,
        }
    }

    /// Number of ids with a live slot (loaded or being loaded).
    pub fn resident(&self) -> usize {
        self.slots.len()
    }

    async fn acquire(&self, id: &str, cancel: &CancellationToken) -> Result<OwnedMutexGuard<Slot<R>>> {
        // Clone the slot out so the table shard is not held across the await.
        let slot = Arc::clone(self.slots.entry(id.to_string()).or_default().value());
        let mut guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            guard = slot.lock_owned() => guard,
        };
        if !guard.loaded {
            let loaded = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                loaded = self.persistence.load(id) => loaded?,
            };
            guard.record = loaded;
            guard.loaded = true;
        }
        Ok(guard)
    }
}

/// Owns a slot guard; evicts the slot on release when it holds no record. Write handles
/// never hold an empty slot and skip the lease.
struct Lease<R: StoredRecord> {
    id: String,
    guard: OwnedMutexGuard<Slot<R>>,
    slots: Arc<SlotTable<R>>,
}

impl<R: StoredRecord> Lease<R> {
    fn new(id: &str, guard: OwnedMutexGuard<Slot<R>>, slots: &Arc<SlotTable<R>>) -> Self {
        Self {
            id: id.to_string(),
            guard,
            slots: Arc::clone(slots),
        }
    }
}

impl<R: StoredRecord> Drop for Lease<R> {
    fn drop(&mut self) {
        if self.guard.record.is_some() {
            return;
        }
        // Only the table and this guard reference the slot when nobody else waits on it.
        let evicted = self
            .slots
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) <= 2)
            .is_some();
        if evicted {
            debug!("evicted empty record slot {}", self.id);
        }
    }
}

pub struct ReadHandle<R: StoredRecord> {
    lease: Lease<R>,
}

impl<R: StoredRecord> ReadHandle<R> {
    pub fn id(&self) -> &str {
        &self.lease.id
    }

    pub fn record(&self) -> Option<&R> {
        self.lease.guard.record.as_ref()
    }
}

/// Holds the slot lock mapped onto a present record, so the record cannot be absent.
pub struct WriteHandle<R: StoredRecord> {
    id: String,
    record: OwnedMappedMutexGuard<Slot<R>, R>,
    persistence: Arc<dyn Persistence<R>>,
    is_new: bool,
}

impl<R: StoredRecord> WriteHandle<R> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this handle created the record.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    /// Swaps in a different record, returning the previous one.
    pub fn replace(&mut self, record: R) -> R {
        std::mem::replace(self.record_mut(), record)
    }

    /// Writes the current record through. The in-memory record stays updated on failure.
    pub async fn save(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = self.persistence.save(self.record()) => {
                if let Err(err) = &result {
                    debug!("save of {} failed: {err}", self.record().record_id());
                }
                result
            }
        }
    }

    /// Deletes the persisted row. The in-memory record is kept so callers can tombstone it.
    pub async fn remove(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = self.persistence.remove(self.id()) => result,
        }
    }
}

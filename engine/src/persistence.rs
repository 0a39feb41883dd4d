//! Persistence contract consumed by the record store, plus an in-memory backend.

use crate::error::EngineError;
use crate::error::Result;
use crate::geofence::Geofence;
use crate::records::FortRecord;
use crate::records::Station;
use async_trait::async_trait;
use dashmap::DashMap;
use fortwatch_wire::QuestLocation;
use fortwatch_wire::QuestStatus;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Keyed get/put over one record kind.
#[async_trait]
pub trait Persistence<R>: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<R>>;

    async fn save(&self, record: &R) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;
}

/// Geofence-wide queries that bypass the per-id record store.
#[async_trait]
pub trait FortQueries: Send + Sync {
    async fn pokestop_positions(&self, fence: &Geofence) -> Result<Vec<QuestLocation>>;

    /// Returns the number of pokestops whose quests were cleared.
    async fn remove_quests_within(&self, fence: &Geofence) -> Result<u64>;

    async fn quest_status(&self, fence: &Geofence) -> Result<QuestStatus>;
}

/// Every persistence seam the engine consumes.
#[derive(Clone)]
pub struct Backend {
    pub forts: Arc<dyn Persistence<FortRecord>>,
    pub stations: Arc<dyn Persistence<Station>>,
    pub queries: Arc<dyn FortQueries>,
}

impl Backend {
    pub fn in_memory(persistence: Arc<InMemoryPersistence>) -> Self {
        Self {
            forts: persistence.clone(),
            stations: persistence.clone(),
            queries: persistence,
        }
    }
}

/// Process-local backend used by tests and the replay tool.
#[derive(Default)]
pub struct InMemoryPersistence {
    forts: DashMap<String, FortRecord>,
    stations: DashMap<String, Station>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forts(records: impl IntoIterator<Item = FortRecord>) -> Self {
        let persistence = Self::default();
        for record in records {
            persistence.forts.insert(record.id().to_string(), record);
        }
        persistence
    }

    /// Makes every later save/remove fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored_fort(&self, id: &str) -> Option<FortRecord> {
        self.forts.get(id).map(|entry| entry.value().clone())
    }

    pub fn fort_count(&self) -> usize {
        self.forts.len()
    }

    /// Every stored fort, in no particular order.
    pub fn forts(&self) -> Vec<FortRecord> {
        self.forts.iter().map(|entry| entry.value().clone()).collect()
    }

    fn check_write(&self, id: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::persistence(format!("write rejected for {id}")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn live_pokestops_in<'a>(
        &'a self,
        fence: &'a Geofence,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'a, String, FortRecord>> + 'a {
        self.forts.iter().filter(move |entry| {
            matches!(entry.value(), FortRecord::Pokestop(stop)
                if !stop.common.deleted && fence.contains(stop.common.location()))
        })
    }
}

#[async_trait]
impl Persistence<FortRecord> for InMemoryPersistence {
    async fn load(&self, id: &str) -> Result<Option<FortRecord>> {
        Ok(self.stored_fort(id))
    }

    async fn save(&self, record: &FortRecord) -> Result<()> {
        self.check_write(record.id())?;
        self.forts.insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.check_write(id)?;
        self.forts.remove(id);
        Ok(())
    }
}

#[async_trait]
impl Persistence<Station> for InMemoryPersistence {
    async fn load(&self, id: &str) -> Result<Option<Station>> {
        Ok(self.stations.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, record: &Station) -> Result<()> {
        self.check_write(&record.id)?;
        self.stations.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.check_write(id)?;
        self.stations.remove(id);
        Ok(())
    }
}

#[async_trait]
impl FortQueries for InMemoryPersistence {
    async fn pokestop_positions(&self, fence: &Geofence) -> Result<Vec<QuestLocation>> {
        Ok(self
            .live_pokestops_in(fence)
            .map(|entry| {
                let common = entry.value().common();
                QuestLocation {
                    id: common.id.clone(),
                    latitude: common.lat,
                    longitude: common.lon,
                }
            })
            .collect())
    }

    async fn remove_quests_within(&self, fence: &Geofence) -> Result<u64> {
        self.check_write("quests")?;
        let ids: Vec<String> = self
            .live_pokestops_in(fence)
            .map(|entry| entry.key().clone())
            .collect();
        let mut cleared = 0;
        for id in ids {
            if let Some(mut entry) = self.forts.get_mut(&id)
                && let FortRecord::Pokestop(stop) = entry.value_mut()
                && stop.clear_quests()
            {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn quest_status(&self, fence: &Geofence) -> Result<QuestStatus> {
        let mut status = QuestStatus::default();
        for entry in self.live_pokestops_in(fence) {
            if let FortRecord::Pokestop(stop) = entry.value() {
                status.total += 1;
                if stop.ar_quest.is_set() {
                    status.ar_quests += 1;
                }
                if stop.no_ar_quest.is_set() {
                    status.no_ar_quests += 1;
                }
            }
        }
        Ok(status)
    }
}

use dashmap::DashMap;
use fortwatch_wire::inbound::MapFort;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Inserts between sweeps of expired entries.
const PURGE_EVERY: usize = 64;

struct Pending {
    fort: MapFort,
    expires_at: Instant,
}

/// Map forts that arrived before anything said whether the id is a gym or a pokestop.
/// Last write wins; entries expire after the TTL and are swept every [`PURGE_EVERY`] inserts.
pub struct AmbiguityCache {
    entries: DashMap<String, Pending>,
    ttl: Duration,
    inserts: AtomicUsize,
}

impl AmbiguityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, fort: MapFort) {
        let count = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(PURGE_EVERY) {
            self.purge_expired();
        }
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(fort.id.clone(), Pending { fort, expires_at });
    }

    /// Removes and returns the buffered fort if it is still fresh.
    pub fn take(&self, id: &str) -> Option<MapFort> {
        let (_, pending) = self.entries.remove(id)?;
        (pending.expires_at > Instant::now()).then_some(pending.fort)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Drops expired entries, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, pending| pending.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use dashmap::DashMap;
use fortwatch_wire::AreaName;
use fortwatch_wire::FortType;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FortCountChange {
    Addition,
    Removal,
}

/// Metrics sink for the pipeline. Implementations must not block.
pub trait StatsCollector: Send + Sync {
    fn fort_count_changed(&self, areas: &[AreaName], fort_type: FortType, change: FortCountChange);

    fn decode_quest(&self, status: &str);
}

#[derive(Debug, Default)]
pub struct NoopStats;

impl StatsCollector for NoopStats {
    fn fort_count_changed(&self, _areas: &[AreaName], _fort_type: FortType, _change: FortCountChange) {}

    fn decode_quest(&self, _status: &str) {}
}

/// Counter-per-key collector; forts outside every area count under an empty area name.
#[derive(Debug, Default)]
pub struct InMemoryStats {
    fort_changes: DashMap<(AreaName, FortType, FortCountChange), AtomicU64>,
    quest_decodes: DashMap<String, AtomicU64>,
}

impl InMemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fort_changes(&self, area: &AreaName, fort_type: FortType, change: FortCountChange) -> u64 {
        self.fort_changes
            .get(&(area.clone(), fort_type, change))
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Sorted copy of every fort counter, for logging.
    pub fn snapshot(&self) -> Vec<(String, FortType, FortCountChange, u64)> {
        let mut counters: Vec<_> = self
            .fort_changes
            .iter()
            .map(|entry| {
                let (area, fort_type, change) = entry.key();
                (
                    area.to_string(),
                    *fort_type,
                    *change,
                    entry.value().load(Ordering::Relaxed),
                )
            })
            .collect();
        counters.sort();
        counters
    }

    pub fn quest_decodes(&self, status: &str) -> u64 {
        self.quest_decodes
            .get(status)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }
}

impl StatsCollector for InMemoryStats {
    fn fort_count_changed(&self, areas: &[AreaName], fort_type: FortType, change: FortCountChange) {
        let unmatched = [AreaName::default()];
        let areas = if areas.is_empty() { &unmatched[..] } else { areas };
        for area in areas {
            self.fort_changes
                .entry((area.clone(), fort_type, change))
                .or_default()
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    fn decode_quest(&self, status: &str) {
        self.quest_decodes
            .entry(status.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }
}

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::MutexGuard;

struct TrackedFort {
    cell_id: u64,
    last_seen: i64,
}

#[derive(Default)]
struct TrackerState {
    cells: HashMap<u64, HashSet<String>>,
    forts: HashMap<String, TrackedFort>,
}

impl TrackerState {
    fn detach(&mut self, id: &str) -> Option<TrackedFort> {
        let fort = self.forts.remove(id)?;
        if let Some(members) = self.cells.get_mut(&fort.cell_id) {
            members.remove(id);
        }
        Some(fort)
    }
}

/// Remembers which forts each map cell reported, to find forts that disappeared.
pub struct FortTracker {
    state: Mutex<TrackerState>,
    stale_threshold: i64,
}

impl FortTracker {
    pub fn new(stale_threshold: i64) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            stale_threshold,
        }
    }

    /// Records a sighting of `id` in `cell_id`, moving it out of its previous cell.
    pub fn update_fort(&self, id: &str, cell_id: u64, now: i64) {
        let mut state = self.lock();
        if let Some(previous) = state.forts.get(id)
            && previous.cell_id != cell_id
        {
            state.detach(id);
        }
        state.cells.entry(cell_id).or_default().insert(id.to_string());
        state.forts.insert(
            id.to_string(),
            TrackedFort {
                cell_id,
                last_seen: now,
            },
        );
    }

    /// Takes the complete fort list of one cell and returns the ids that used to be there,
    /// are missing now and have not been seen for longer than the stale threshold.
    /// Missing ids that are not stale yet stay tracked so the next update rechecks them.
    pub fn process_cell(&self, cell_id: u64, ids: &[String], now: i64) -> Vec<String> {
        for id in ids {
            self.update_fort(id, cell_id, now);
        }
        let state = self.lock();
        let current: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut stale: Vec<String> = state
            .cells
            .get(&cell_id)
            .into_iter()
            .flatten()
            .filter(|id| !current.contains(id.as_str()))
            .filter(|id| {
                state
                    .forts
                    .get(id.as_str())
                    .is_some_and(|fort| now - fort.last_seen > self.stale_threshold)
            })
            .cloned()
            .collect();
        stale.sort();
        stale
    }

    pub fn remove_fort(&self, id: &str) -> bool {
        self.lock().detach(id).is_some()
    }

    /// Puts an un-deleted fort back under tracking.
    pub fn restore_fort(&self, id: &str, cell_id: u64, now: i64) {
        self.update_fort(id, cell_id, now);
    }

    /// `(cells, forts)` currently tracked.
    pub fn stats(&self) -> (usize, usize) {
        let state = self.lock();
        (state.cells.len(), state.forts.len())
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

use crate::error::Result;
use crate::error::SpatialError;
use crate::tree::BoundingBox;
use crate::tree::SpatialTree;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

#[derive(Default)]
struct IndexState {
    tree: SpatialTree,
    positions: HashMap<String, (f64, f64)>,
}

/// Process-wide fort index. Writers serialise on the lock; readers hold it only long
/// enough to clone the current tree.
#[derive(Default)]
pub struct FortIndex {
    state: RwLock<IndexState>,
}

impl FortIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or moves `id`. Returns `true` when the index changed.
    pub fn insert(&self, id: &str, lon: f64, lat: f64) -> Result<bool> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(SpatialError::NonFiniteCoordinate {
                id: id.to_string(),
                lon,
                lat,
            });
        }
        let mut state = self.write();
        match state.positions.get(id).copied() {
            Some(previous) if previous == (lon, lat) => return Ok(false),
            Some((old_lon, old_lat)) => {
                state.tree.remove(id, old_lon, old_lat);
            }
            None => {}
        }
        state.tree.insert(id, lon, lat);
        state.positions.insert(id.to_string(), (lon, lat));
        Ok(true)
    }

    /// Removes `id` wherever it currently sits.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.write();
        match state.positions.remove(id) {
            Some((lon, lat)) => state.tree.remove(id, lon, lat),
            None => false,
        }
    }

    /// Removes `id` only if it is indexed at exactly `(lon, lat)`.
    pub fn remove_at(&self, id: &str, lon: f64, lat: f64) -> bool {
        let mut state = self.write();
        if state.positions.get(id) != Some(&(lon, lat)) {
            return false;
        }
        state.positions.remove(id);
        state.tree.remove(id, lon, lat)
    }

    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.read().positions.get(id).copied()
    }

    /// Immutable view for scanning without the lock.
    pub fn snapshot(&self) -> SpatialTree {
        self.read().tree.clone()
    }

    pub fn len(&self) -> usize {
        self.read().tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convenience for callers that do not need a long-lived snapshot.
    pub fn search<F>(&self, area: &BoundingBox, visit: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.snapshot().search(area, visit);
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

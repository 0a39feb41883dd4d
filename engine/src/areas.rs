use crate::config::AreaFence;
use crate::geofence::Geofence;
use fortwatch_wire::AreaName;
use fortwatch_wire::Location;

/// Maps a position to the named areas containing it. Must be a pure function.
pub trait AreaMatcher: Send + Sync {
    fn match_areas(&self, location: Location) -> Vec<AreaName>;
}

#[derive(Debug, Default)]
pub struct NoAreas;

impl AreaMatcher for NoAreas {
    fn match_areas(&self, _location: Location) -> Vec<AreaName> {
        Vec::new()
    }
}

/// Matches against a fixed list of polygon fences.
#[derive(Debug, Default)]
pub struct PolygonAreaMatcher {
    fences: Vec<(AreaName, Geofence)>,
}

impl PolygonAreaMatcher {
    pub fn new(fences: Vec<(AreaName, Geofence)>) -> Self {
        Self { fences }
    }

    pub fn from_config(fences: &[AreaFence]) -> Self {
        Self::new(
            fences
                .iter()
                .map(|fence| {
                    (
                        AreaName::new(fence.parent.clone(), fence.name.clone()),
                        Geofence::from_lat_lon(&fence.polygon),
                    )
                })
                .collect(),
        )
    }
}

impl AreaMatcher for PolygonAreaMatcher {
    fn match_areas(&self, location: Location) -> Vec<AreaName> {
        self.fences
            .iter()
            .filter(|(_, fence)| fence.contains(location))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Destination filter match: `*` in the filter's parent or name matches anything,
/// otherwise comparison ignores ASCII case.
pub fn area_matches(filter: &AreaName, area: &AreaName) -> bool {
    let part = |wanted: &str, actual: &str| wanted == "*" || wanted.eq_ignore_ascii_case(actual);
    part(&filter.parent, &area.parent) && part(&filter.name, &area.name)
}

/// True when any of `areas` passes any of `filters`.
pub fn any_area_matches(filters: &[AreaName], areas: &[AreaName]) -> bool {
    filters
        .iter()
        .any(|filter| areas.iter().any(|area| area_matches(filter, area)))
}

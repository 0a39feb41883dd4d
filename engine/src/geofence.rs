use fortwatch_spatial::BoundingBox;
use fortwatch_wire::Location;
use serde::Deserialize;
use serde::Serialize;

/// Closed polygon in `(lat, lon)` vertices. The closing edge is implicit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub points: Vec<Location>,
}

impl Geofence {
    pub fn new(points: Vec<Location>) -> Self {
        Self { points }
    }

    pub fn from_lat_lon(points: &[[f64; 2]]) -> Self {
        Self::new(
            points
                .iter()
                .map(|[lat, lon]| Location::new(*lat, *lon))
                .collect(),
        )
    }

    /// Axis-aligned rectangle, handy for scan-style queries.
    pub fn rectangle(min: Location, max: Location) -> Self {
        Self::new(vec![
            Location::new(min.lat, min.lon),
            Location::new(min.lat, max.lon),
            Location::new(max.lat, max.lon),
            Location::new(max.lat, min.lon),
        ])
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut area = BoundingBox::point(first.lon, first.lat);
        for point in &self.points[1..] {
            area.min_lon = area.min_lon.min(point.lon);
            area.max_lon = area.max_lon.max(point.lon);
            area.min_lat = area.min_lat.min(point.lat);
            area.max_lat = area.max_lat.max(point.lat);
        }
        Some(area)
    }

    /// Even-odd ray cast. Points on the bounding box but outside the polygon are rejected.
    pub fn contains(&self, location: Location) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        match self.bounding_box() {
            Some(area) if area.contains(location.lon, location.lat) => {}
            _ => return false,
        }
        let mut inside = false;
        let mut previous = self.points[self.points.len() - 1];
        for &current in &self.points {
            let crosses = (current.lat > location.lat) != (previous.lat > location.lat);
            if crosses {
                let lon_at = (previous.lon - current.lon) * (location.lat - current.lat)
                    / (previous.lat - current.lat)
                    + current.lon;
                if location.lon < lon_at {
                    inside = !inside;
                }
            }
            previous = current;
        }
        inside
    }
}

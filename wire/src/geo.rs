use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// WGS-84 position in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Forts share one id space; an id is classified as exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortType {
    Gym,
    Pokestop,
}

impl FortType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gym => "gym",
            Self::Pokestop => "pokestop",
        }
    }
}

impl fmt::Display for FortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named geofence, optionally nested under a parent area.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaName {
    #[serde(default)]
    pub parent: String,
    pub name: String,
}

impl AreaName {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
        }
    }

    /// Parses `parent/name` or a bare `name`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('/') {
            Some((parent, name)) => Self::new(parent.trim(), name.trim()),
            None => Self::new("", raw.trim()),
        }
    }
}

impl fmt::Display for AreaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parent.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.parent, self.name)
        }
    }
}

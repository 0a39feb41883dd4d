use fortwatch_wire::FortType;
use fortwatch_wire::FortWebhook;
use fortwatch_wire::Location;
use fortwatch_wire::inbound::FortDetails;
use fortwatch_wire::inbound::MapFort;
use fortwatch_wire::inbound::PokemonFort;
use serde::Deserialize;
use serde::Serialize;

/// State every fort carries regardless of its type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FortCommon {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub partner_id: Option<String>,
    pub ar_scan_eligible: Option<bool>,
    pub power_up_level: Option<i16>,
    pub power_up_points: Option<i64>,
    pub power_up_end_timestamp: Option<i64>,
    pub enabled: Option<bool>,
    pub last_modified_timestamp: Option<i64>,
    pub cell_id: Option<u64>,
    pub deleted: bool,
    pub first_seen_timestamp: i64,
    pub updated: i64,
}

impl FortCommon {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }

    /// Copies identity fields from a counterpart record, but only into fields this
    /// record has not set yet.
    pub fn share_from(&mut self, source: &FortCommon) {
        fill(&mut self.name, &source.name);
        fill(&mut self.url, &source.url);
        fill(&mut self.description, &source.description);
        fill(&mut self.partner_id, &source.partner_id);
        fill(&mut self.ar_scan_eligible, &source.ar_scan_eligible);
        fill(&mut self.power_up_level, &source.power_up_level);
        fill(&mut self.power_up_points, &source.power_up_points);
        fill(&mut self.power_up_end_timestamp, &source.power_up_end_timestamp);
    }

    pub fn webhook_view(&self, fort_type: FortType) -> FortWebhook {
        FortWebhook {
            id: self.id.clone(),
            fort_type,
            name: self.name.clone(),
            description: self.description.clone(),
            image_url: self.url.clone(),
            location: self.location(),
        }
    }

    /// Shared part of a map-objects fort.
    pub fn apply_map_object(&mut self, fort: &PokemonFort, cell_id: u64, now: i64) {
        self.lat = fort.latitude;
        self.lon = fort.longitude;
        self.partner_id = fort.partner_id.clone().filter(|partner| !partner.is_empty());
        self.enabled = Some(fort.enabled);
        self.ar_scan_eligible = Some(fort.is_ar_scan_eligible);
        self.power_up_points = Some(fort.power_up_progress_points);
        let (level, end) = power_up_level(
            fort.power_up_progress_points,
            fort.power_up_level_expiration_ms / 1000,
            now,
        );
        self.power_up_level = Some(level);
        self.power_up_end_timestamp = end;
        self.last_modified_timestamp = Some(fort.last_modified_ms / 1000);
        if let Some(url) = fort.image_url.as_ref().filter(|url| !url.is_empty()) {
            self.url = Some(url.clone());
        }
        self.cell_id = Some(cell_id);
        self.touch(now);
    }

    pub fn apply_details(&mut self, details: &FortDetails, now: i64) {
        self.lat = details.latitude;
        self.lon = details.longitude;
        if let Some(url) = details.image_urls.first() {
            self.url = Some(url.clone());
        }
        self.name = Some(details.name.clone());
        self.description = Some(details.description.clone()).filter(|text| !text.is_empty());
        self.touch(now);
    }

    pub fn apply_map_fort(&mut self, fort: &MapFort, now: i64) {
        self.lat = fort.latitude;
        self.lon = fort.longitude;
        self.name = Some(fort.name.clone());
        if let Some(url) = fort.image_url.as_ref().filter(|url| !url.is_empty()) {
            self.url = Some(url.clone());
        }
        self.touch(now);
    }

    fn touch(&mut self, now: i64) {
        if self.first_seen_timestamp == 0 {
            self.first_seen_timestamp = now;
        }
        self.updated = now;
    }
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

/// Level 1-3 only while the power-up has not expired; the end timestamp is kept with it.
pub fn power_up_level(points: i64, expiration: i64, now: i64) -> (i16, Option<i64>) {
    if points < 50 || expiration <= now {
        return (0, None);
    }
    let level = if points < 100 {
        1
    } else if points < 150 {
        2
    } else {
        3
    };
    (level, Some(expiration))
}

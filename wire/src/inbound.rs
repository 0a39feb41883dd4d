//! Decoded game-protocol payloads consumed by the update pipeline.
//!
//! Only the fields the pipeline merges are modelled; unknown fields are ignored so that
//! newer decoders can feed older pipelines.

use crate::geo::FortType;
use serde::Deserialize;
use serde::Serialize;

/// Envelope for every message kind the pipeline accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundMessage {
    FortDetails(FortDetails),
    MapFort(MapFort),
    MapCell(MapCell),
    FortSearch(FortSearch),
    ContestData(ContestData),
    SizeLeaderboard(SizeLeaderboard),
    Station(StationDetails),
    FortRemoval(FortRemoval),
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FortDetails(_) => "fort_details",
            Self::MapFort(_) => "map_fort",
            Self::MapCell(_) => "map_cell",
            Self::FortSearch(_) => "fort_search",
            Self::ContestData(_) => "contest_data",
            Self::SizeLeaderboard(_) => "size_leaderboard",
            Self::Station(_) => "station",
            Self::FortRemoval(_) => "fort_removal",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokemonDisplay {
    pub pokemon_id: i16,
    #[serde(default)]
    pub form: Option<i16>,
}

impl PokemonDisplay {
    pub fn new(pokemon_id: i16, form: Option<i16>) -> Self {
        Self { pokemon_id, form }
    }
}

/// Fort details screen. Always classified.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortDetails {
    pub id: String,
    pub fort_type: Option<FortType>,
    pub name: String,
    pub description: String,
    pub image_urls: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Active modifier item ids (lures).
    pub modifiers: Vec<i16>,
}

/// Fort from the map-forts listing. Carries no type, so it may need buffering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapFort {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
}

/// All forts reported for one S2 cell in a map-objects response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapCell {
    pub cell_id: u64,
    pub forts: Vec<PokemonFort>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonFort {
    pub fort_id: String,
    pub fort_type: FortType,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub last_modified_ms: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub is_ar_scan_eligible: bool,
    #[serde(default)]
    pub power_up_progress_points: i64,
    #[serde(default)]
    pub power_up_level_expiration_ms: i64,
    #[serde(default)]
    pub active_fort_modifiers: Vec<i16>,

    #[serde(default)]
    pub team: Option<i16>,
    #[serde(default)]
    pub guard_pokemon_id: Option<i16>,
    #[serde(default)]
    pub available_slots: Option<i16>,
    #[serde(default)]
    pub is_in_battle: bool,
    #[serde(default)]
    pub is_ex_raid_eligible: bool,
    #[serde(default)]
    pub raid_info: Option<RaidInfo>,

    #[serde(default)]
    pub incidents: Vec<IncidentDisplay>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidInfo {
    pub raid_level: i16,
    pub raid_spawn_ms: i64,
    pub raid_battle_ms: i64,
    pub raid_end_ms: i64,
    pub is_exclusive: bool,
    pub raid_pokemon: Option<RaidPokemon>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidPokemon {
    pub pokemon_id: i16,
    pub form: Option<i16>,
    pub costume: Option<i16>,
    pub gender: Option<i16>,
    pub move_1: Option<i16>,
    pub move_2: Option<i16>,
    pub cp: Option<i32>,
}

/// Incident (invasion/event) displayed on a pokestop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentDisplay {
    pub incident_id: String,
    pub display_type: i16,
    pub style: i16,
    pub character: i16,
    pub start_ms: i64,
    pub expiration_ms: i64,
    /// Up to three lineup pokemon, in slot order.
    pub slots: Vec<PokemonDisplay>,
}

/// Result of spinning a pokestop; `challenge_quest` is absent for a blank quest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortSearch {
    pub fort_id: String,
    pub have_ar: bool,
    pub challenge_quest: Option<ChallengeQuest>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeQuest {
    pub quest_type: i16,
    pub target: i16,
    pub template_id: String,
    pub title: String,
    pub conditions: Vec<serde_json::Value>,
    pub rewards: Vec<QuestReward>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestReward {
    pub reward_type: i16,
    pub amount: i64,
    pub item_id: Option<i16>,
    pub pokemon_id: Option<i16>,
    pub form: Option<i16>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContestData {
    /// Fort id from the originating request, when known.
    pub fort_id: Option<String>,
    pub contests: Vec<Contest>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contest {
    /// `<fort id>-<suffix>`.
    pub contest_id: String,
    pub focus_pokemon: Option<PokemonDisplay>,
    pub pokemon_type_1: Option<i16>,
    pub pokemon_type_2: Option<i16>,
    pub ranking_standard: i16,
    pub end_time_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLeaderboard {
    pub contest_id: String,
    pub total_entries: i64,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub score: f64,
    pub pokemon_id: i16,
    pub form: Option<i16>,
    pub costume: Option<i16>,
    pub gender: Option<i16>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationDetails {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub is_battle_available: bool,
    pub battle: Option<StationBattle>,
    pub total_stationed_pokemon: Option<i32>,
    pub total_stationed_gmax: Option<i32>,
    pub stationed_pokemon: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationBattle {
    pub level: i16,
    pub start_ms: i64,
    pub end_ms: i64,
    pub pokemon: Option<BattlePokemon>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlePokemon {
    pub pokemon_id: i16,
    pub form: Option<i16>,
    pub costume: Option<i16>,
    pub gender: Option<i16>,
    pub alignment: Option<i16>,
    pub bread_mode: Option<i16>,
    pub move_1: Option<i16>,
    pub move_2: Option<i16>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortRemoval {
    pub fort_id: String,
}

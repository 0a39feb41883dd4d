use serde::Deserialize;
use serde::Serialize;

/// Flat gym presentation; nullable fields serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiGymResult {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub last_modified_timestamp: Option<i64>,
    pub raid_end_timestamp: Option<i64>,
    pub raid_spawn_timestamp: Option<i64>,
    pub raid_battle_timestamp: Option<i64>,
    pub updated: i64,
    pub raid_pokemon_id: Option<i16>,
    pub guarding_pokemon_id: Option<i16>,
    pub available_slots: Option<i16>,
    pub team_id: Option<i16>,
    pub raid_level: Option<i16>,
    pub enabled: Option<bool>,
    pub ex_raid_eligible: Option<bool>,
    pub in_battle: Option<bool>,
    pub raid_pokemon_move_1: Option<i16>,
    pub raid_pokemon_move_2: Option<i16>,
    pub raid_pokemon_form: Option<i16>,
    pub raid_pokemon_cp: Option<i32>,
    pub raid_pokemon_gender: Option<i16>,
    pub raid_pokemon_costume: Option<i16>,
    pub raid_is_exclusive: Option<bool>,
    pub cell_id: Option<u64>,
    pub deleted: bool,
    pub first_seen_timestamp: i64,
    pub partner_id: Option<String>,
    pub ar_scan_eligible: Option<bool>,
    pub power_up_level: Option<i16>,
    pub power_up_points: Option<i64>,
    pub power_up_end_timestamp: Option<i64>,
}

/// Flat pokestop presentation. `quest_*` is the AR quest, `alternative_quest_*` the
/// no-AR quest, `showcase_*` the active contest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPokestopResult {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub lure_id: i16,
    pub lure_expire_timestamp: Option<i64>,
    pub last_modified_timestamp: Option<i64>,
    pub updated: i64,
    pub enabled: Option<bool>,
    pub cell_id: Option<u64>,
    pub deleted: bool,
    pub first_seen_timestamp: i64,
    pub partner_id: Option<String>,
    pub ar_scan_eligible: Option<bool>,
    pub power_up_level: Option<i16>,
    pub power_up_points: Option<i64>,
    pub power_up_end_timestamp: Option<i64>,

    pub quest_type: Option<i16>,
    pub quest_timestamp: Option<i64>,
    pub quest_target: Option<i16>,
    pub quest_conditions: Option<String>,
    pub quest_rewards: Option<String>,
    pub quest_template: Option<String>,
    pub quest_title: Option<String>,
    pub quest_expiry: Option<i64>,

    pub alternative_quest_type: Option<i16>,
    pub alternative_quest_timestamp: Option<i64>,
    pub alternative_quest_target: Option<i16>,
    pub alternative_quest_conditions: Option<String>,
    pub alternative_quest_rewards: Option<String>,
    pub alternative_quest_template: Option<String>,
    pub alternative_quest_title: Option<String>,
    pub alternative_quest_expiry: Option<i64>,

    pub showcase_pokemon_id: Option<i16>,
    pub showcase_pokemon_form_id: Option<i16>,
    pub showcase_pokemon_type_id: Option<i16>,
    pub showcase_ranking_standard: Option<i16>,
    pub showcase_expiry: Option<i64>,
    pub showcase_rankings: Option<String>,

    pub incidents: Vec<ApiIncident>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiIncident {
    pub id: String,
    pub display_type: i16,
    pub style: i16,
    pub character: i16,
    pub start: i64,
    pub expiration: i64,
    pub slot_1_pokemon_id: Option<i16>,
    pub slot_1_form: Option<i16>,
    pub slot_2_pokemon_id: Option<i16>,
    pub slot_2_form: Option<i16>,
    pub slot_3_pokemon_id: Option<i16>,
    pub slot_3_form: Option<i16>,
}

/// Power-spot station presentation. Not filterable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiStationResult {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub is_battle_available: bool,
    pub updated: i64,
    pub battle_level: Option<i16>,
    pub battle_start: Option<i64>,
    pub battle_end: Option<i64>,
    pub battle_pokemon_id: Option<i16>,
    pub battle_pokemon_form: Option<i16>,
    pub battle_pokemon_costume: Option<i16>,
    pub battle_pokemon_gender: Option<i16>,
    pub battle_pokemon_alignment: Option<i16>,
    pub battle_pokemon_bread_mode: Option<i16>,
    pub battle_pokemon_move_1: Option<i16>,
    pub battle_pokemon_move_2: Option<i16>,
    pub total_stationed_pokemon: Option<i32>,
    pub total_stationed_gmax: Option<i32>,
    pub stationed_pokemon: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GymScanResponse {
    pub gyms: Vec<ApiGymResult>,
    pub examined: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PokestopScanResponse {
    pub pokestops: Vec<ApiPokestopResult>,
    pub examined: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FortScanResponse {
    pub gyms: Vec<ApiGymResult>,
    pub pokestops: Vec<ApiPokestopResult>,
    pub examined: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestLocation {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestStatus {
    pub ar_quests: u32,
    pub no_ar_quests: u32,
    pub total: u32,
}

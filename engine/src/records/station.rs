use crate::error::Result;
use fortwatch_wire::ApiStationResult;
use fortwatch_wire::inbound::StationDetails;
use serde::Deserialize;
use serde::Serialize;

/// Power spot. Lives in its own record store and is never indexed or filtered.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Station {
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

impl Station {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn apply_details(&mut self, details: &StationDetails, now: i64) -> Result<()> {
        self.lat = details.latitude;
        self.lon = details.longitude;
        self.name = details.name.clone();
        self.start_time = details.start_time_ms / 1000;
        self.end_time = details.end_time_ms / 1000;
        self.is_battle_available = details.is_battle_available;
        if let Some(battle) = &details.battle {
            self.battle_level = Some(battle.level);
            self.battle_start = Some(battle.start_ms / 1000);
            self.battle_end = Some(battle.end_ms / 1000);
            let pokemon = battle.pokemon.as_ref();
            self.battle_pokemon_id = pokemon.map(|pokemon| pokemon.pokemon_id);
            self.battle_pokemon_form = pokemon.and_then(|pokemon| pokemon.form);
            self.battle_pokemon_costume = pokemon.and_then(|pokemon| pokemon.costume);
            self.battle_pokemon_gender = pokemon.and_then(|pokemon| pokemon.gender);
            self.battle_pokemon_alignment = pokemon.and_then(|pokemon| pokemon.alignment);
            self.battle_pokemon_bread_mode = pokemon.and_then(|pokemon| pokemon.bread_mode);
            self.battle_pokemon_move_1 = pokemon.and_then(|pokemon| pokemon.move_1);
            self.battle_pokemon_move_2 = pokemon.and_then(|pokemon| pokemon.move_2);
        }
        self.total_stationed_pokemon = details.total_stationed_pokemon;
        self.total_stationed_gmax = details.total_stationed_gmax;
        self.stationed_pokemon = if details.stationed_pokemon.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&details.stationed_pokemon)?)
        };
        self.updated = now;
        Ok(())
    }

    pub fn to_api(&self) -> ApiStationResult {
        ApiStationResult {
            id: self.id.clone(),
            lat: self.lat,
            lon: self.lon,
            name: self.name.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            is_battle_available: self.is_battle_available,
            updated: self.updated,
            battle_level: self.battle_level,
            battle_start: self.battle_start,
            battle_end: self.battle_end,
            battle_pokemon_id: self.battle_pokemon_id,
            battle_pokemon_form: self.battle_pokemon_form,
            battle_pokemon_costume: self.battle_pokemon_costume,
            battle_pokemon_gender: self.battle_pokemon_gender,
            battle_pokemon_alignment: self.battle_pokemon_alignment,
            battle_pokemon_bread_mode: self.battle_pokemon_bread_mode,
            battle_pokemon_move_1: self.battle_pokemon_move_1,
            battle_pokemon_move_2: self.battle_pokemon_move_2,
            total_stationed_pokemon: self.total_stationed_pokemon,
            total_stationed_gmax: self.total_stationed_gmax,
            stationed_pokemon: self.stationed_pokemon.clone(),
        }
    }
}

use crate::lookup::FortLookup;
use crate::records::common::FortCommon;
use fortwatch_wire::ApiGymResult;
use fortwatch_wire::FortType;
use fortwatch_wire::PokemonDisplay;
use fortwatch_wire::inbound::PokemonFort;
use fortwatch_wire::inbound::RaidInfo;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gym {
    #[serde(flatten)]
    pub common: FortCommon,
    pub team_id: Option<i16>,
    pub available_slots: Option<i16>,
    pub in_battle: Option<bool>,
    pub ex_raid_eligible: Option<bool>,
    pub guarding_pokemon_id: Option<i16>,
    pub raid_level: Option<i16>,
    pub raid_spawn_timestamp: Option<i64>,
    pub raid_battle_timestamp: Option<i64>,
    pub raid_end_timestamp: Option<i64>,
    pub raid_pokemon_id: Option<i16>,
    pub raid_pokemon_form: Option<i16>,
    pub raid_pokemon_costume: Option<i16>,
    pub raid_pokemon_gender: Option<i16>,
    pub raid_pokemon_move_1: Option<i16>,
    pub raid_pokemon_move_2: Option<i16>,
    pub raid_pokemon_cp: Option<i32>,
    pub raid_is_exclusive: Option<bool>,
}

impl Gym {
    pub fn new(id: &str) -> Self {
        Self {
            common: FortCommon::new(id),
            ..Default::default()
        }
    }

    pub fn apply_map_object(&mut self, fort: &PokemonFort, cell_id: u64, now: i64) {
        self.common.apply_map_object(fort, cell_id, now);
        self.team_id = Some(fort.team.unwrap_or(0));
        self.available_slots = fort.available_slots.or(self.available_slots);
        self.guarding_pokemon_id = fort.guard_pokemon_id.or(self.guarding_pokemon_id);
        self.in_battle = Some(fort.is_in_battle);
        self.ex_raid_eligible = Some(fort.is_ex_raid_eligible);
        if let Some(raid) = &fort.raid_info {
            self.apply_raid(raid);
        }
    }

    fn apply_raid(&mut self, raid: &RaidInfo) {
        self.raid_level = Some(raid.raid_level);
        self.raid_spawn_timestamp = Some(raid.raid_spawn_ms / 1000);
        self.raid_battle_timestamp = Some(raid.raid_battle_ms / 1000);
        self.raid_end_timestamp = Some(raid.raid_end_ms / 1000);
        self.raid_is_exclusive = Some(raid.is_exclusive);
        match &raid.raid_pokemon {
            Some(pokemon) => {
                self.raid_pokemon_id = Some(pokemon.pokemon_id);
                self.raid_pokemon_form = pokemon.form;
                self.raid_pokemon_costume = pokemon.costume;
                self.raid_pokemon_gender = pokemon.gender;
                self.raid_pokemon_move_1 = pokemon.move_1;
                self.raid_pokemon_move_2 = pokemon.move_2;
                self.raid_pokemon_cp = pokemon.cp;
            }
            None => {
                // egg
                self.raid_pokemon_id = Some(0);
                self.raid_pokemon_form = None;
                self.raid_pokemon_costume = None;
                self.raid_pokemon_gender = None;
                self.raid_pokemon_move_1 = None;
                self.raid_pokemon_move_2 = None;
                self.raid_pokemon_cp = None;
            }
        }
    }

    pub fn lookup(&self) -> FortLookup {
        let mut lookup = FortLookup::new(FortType::Gym);
        lookup.power_up_level = self.common.power_up_level.unwrap_or(0);
        lookup.ar_scan_eligible = self.common.ar_scan_eligible.unwrap_or(false);
        lookup.available_slots = self.available_slots.unwrap_or(0);
        lookup.team_id = self.team_id.unwrap_or(0);
        lookup.in_battle = self.in_battle.unwrap_or(false);
        lookup.raid_level = self.raid_level.unwrap_or(0);
        lookup.raid_pokemon = self
            .raid_pokemon_id
            .filter(|id| *id > 0)
            .map(|id| PokemonDisplay::new(id, self.raid_pokemon_form));
        lookup.raid_battle_timestamp = self.raid_battle_timestamp.unwrap_or(0);
        lookup.raid_end_timestamp = self.raid_end_timestamp.unwrap_or(0);
        lookup
    }

    pub fn to_api(&self) -> ApiGymResult {
        let common = &self.common;
        ApiGymResult {
            id: common.id.clone(),
            lat: common.lat,
            lon: common.lon,
            name: common.name.clone(),
            url: common.url.clone(),
            description: common.description.clone(),
            last_modified_timestamp: common.last_modified_timestamp,
            raid_end_timestamp: self.raid_end_timestamp,
            raid_spawn_timestamp: self.raid_spawn_timestamp,
            raid_battle_timestamp: self.raid_battle_timestamp,
            updated: common.updated,
            raid_pokemon_id: self.raid_pokemon_id,
            guarding_pokemon_id: self.guarding_pokemon_id,
            available_slots: self.available_slots,
            team_id: self.team_id,
            raid_level: self.raid_level,
            enabled: common.enabled,
            ex_raid_eligible: self.ex_raid_eligible,
            in_battle: self.in_battle,
            raid_pokemon_move_1: self.raid_pokemon_move_1,
            raid_pokemon_move_2: self.raid_pokemon_move_2,
            raid_pokemon_form: self.raid_pokemon_form,
            raid_pokemon_cp: self.raid_pokemon_cp,
            raid_pokemon_gender: self.raid_pokemon_gender,
            raid_pokemon_costume: self.raid_pokemon_costume,
            raid_is_exclusive: self.raid_is_exclusive,
            cell_id: common.cell_id,
            deleted: common.deleted,
            first_seen_timestamp: common.first_seen_timestamp,
            partner_id: common.partner_id.clone(),
            ar_scan_eligible: common.ar_scan_eligible,
            power_up_level: common.power_up_level,
            power_up_points: common.power_up_points,
            power_up_end_timestamp: common.power_up_end_timestamp,
        }
    }
}

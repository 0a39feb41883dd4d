use crate::geo::Location;
use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;

/// Bounding-box scan request shared by the gym, pokestop and combined scans.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiFortScan {
    pub min: Location,
    pub max: Location,
    /// `<= 0` means "use the configured cap".
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub filters: Vec<DnfClause>,
}

/// Inclusive `min <= v <= max`. A missing bound is open.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilter {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl RangeFilter {
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.is_none_or(|min| min <= value) && self.max.is_none_or(|max| value <= max)
    }
}

/// Pokemon id with an optional form; a `null` form matches any form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokemonFilter {
    pub pokemon_id: i16,
    #[serde(default)]
    pub form: Option<i16>,
}

impl PokemonFilter {
    pub fn any_form(pokemon_id: i16) -> Self {
        Self {
            pokemon_id,
            form: None,
        }
    }

    pub fn with_form(pokemon_id: i16, form: i16) -> Self {
        Self {
            pokemon_id,
            form: Some(form),
        }
    }
}

/// One AND-clause of a DNF filter. Every field is optional; unknown fields are ignored.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnfClause {
    pub power_up_level: Option<RangeFilter>,
    pub is_ar_scan_eligible: Option<bool>,

    // gyms
    pub available_slots: Option<RangeFilter>,
    pub team_id: Option<Vec<i16>>,
    pub in_battle: Option<bool>,
    pub raid_level: Option<Vec<i16>>,
    pub raid_pokemon: Option<Vec<PokemonFilter>>,

    // pokestops
    pub lure_id: Option<Vec<i16>>,

    pub ar_quest_reward_type: Option<Vec<i16>>,
    pub ar_quest_reward_amount: Option<RangeFilter>,
    pub ar_quest_reward_item_id: Option<Vec<i16>>,
    pub ar_quest_reward_pokemon: Option<Vec<PokemonFilter>>,
    pub ar_quest_type: Option<Vec<i16>>,
    pub ar_quest_target: Option<Vec<i16>>,
    pub ar_quest_template: Option<Vec<String>>,

    pub no_ar_quest_reward_type: Option<Vec<i16>>,
    pub no_ar_quest_reward_amount: Option<RangeFilter>,
    pub no_ar_quest_reward_item_id: Option<Vec<i16>>,
    pub no_ar_quest_reward_pokemon: Option<Vec<PokemonFilter>>,
    pub no_ar_quest_type: Option<Vec<i16>>,
    pub no_ar_quest_target: Option<Vec<i16>>,
    pub no_ar_quest_template: Option<Vec<String>>,

    pub incident_display_type: Option<Vec<i16>>,
    pub incident_style: Option<Vec<i16>>,
    pub incident_character: Option<Vec<i16>>,
    pub incident_slot_1: Option<Vec<PokemonFilter>>,
    pub incident_slot_2: Option<Vec<PokemonFilter>>,
    pub incident_slot_3: Option<Vec<PokemonFilter>>,

    pub contest_pokemon: Option<Vec<PokemonFilter>>,
    pub contest_pokemon_type_1: Option<Vec<i16>>,
    pub contest_pokemon_type_2: Option<Vec<i16>>,
    pub contest_ranking_standard: Option<Vec<i16>>,
    pub contest_total_entries: Option<RangeFilter>,
}

impl DnfClause {
    /// True when any incident sub-constraint is present. Empty lists do not count.
    pub fn has_incident_constraint(&self) -> bool {
        fn present<T>(values: &Option<Vec<T>>) -> bool {
            values.as_ref().is_some_and(|values| !values.is_empty())
        }
        present(&self.incident_display_type)
            || present(&self.incident_style)
            || present(&self.incident_character)
            || present(&self.incident_slot_1)
            || present(&self.incident_slot_2)
            || present(&self.incident_slot_3)
    }
}

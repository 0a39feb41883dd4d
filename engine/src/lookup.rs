use dashmap::DashMap;
use fortwatch_wire::FortType;
use fortwatch_wire::PokemonDisplay;

/// Filterable projection of a fort. Absent numeric attributes are stored as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct FortLookup {
    pub fort_type: FortType,
    pub power_up_level: i16,
    pub ar_scan_eligible: bool,

    pub available_slots: i16,
    pub team_id: i16,
    pub in_battle: bool,
    pub raid_level: i16,
    pub raid_pokemon: Option<PokemonDisplay>,
    /// Raid constraints only hold while either timestamp is in the future.
    pub raid_battle_timestamp: i64,
    pub raid_end_timestamp: i64,

    pub lure_id: i16,
    pub ar_quest: QuestLookup,
    pub no_ar_quest: QuestLookup,
    pub incidents: Vec<IncidentLookup>,
    pub contest: ContestLookup,
}

impl FortLookup {
    pub fn new(fort_type: FortType) -> Self {
        Self {
            fort_type,
            power_up_level: 0,
            ar_scan_eligible: false,
            available_slots: 0,
            team_id: 0,
            in_battle: false,
            raid_level: 0,
            raid_pokemon: None,
            raid_battle_timestamp: 0,
            raid_end_timestamp: 0,
            lure_id: 0,
            ar_quest: QuestLookup::default(),
            no_ar_quest: QuestLookup::default(),
            incidents: Vec::new(),
            contest: ContestLookup::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestLookup {
    pub quest_type: i16,
    pub target: i16,
    pub template: Option<String>,
    pub reward_type: i16,
    pub reward_amount: i64,
    pub reward_item_id: i16,
    pub reward_pokemon: Option<PokemonDisplay>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncidentLookup {
    pub display_type: i16,
    pub style: i16,
    pub character: i16,
    pub slots: [Option<PokemonDisplay>; 3],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContestLookup {
    pub pokemon: Option<PokemonDisplay>,
    pub pokemon_type_1: i16,
    pub pokemon_type_2: i16,
    pub ranking_standard: i16,
    pub total_entries: i64,
}

/// Concurrent `fort id -> FortLookup` map read by scans without any record lock.
#[derive(Default)]
pub struct LookupCache {
    entries: DashMap<String, FortLookup>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, id: &str) -> Option<FortLookup> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Runs `f` against the cached lookup without cloning it.
    pub fn with<T>(&self, id: &str, f: impl FnOnce(&FortLookup) -> T) -> Option<T> {
        self.entries.get(id).map(|entry| f(entry.value()))
    }

    pub fn store(&self, id: &str, lookup: FortLookup) {
        self.entries.insert(id.to_string(), lookup);
    }

    pub fn delete(&self, id: &str) -> Option<FortLookup> {
        self.entries.remove(id).map(|(_, lookup)| lookup)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use crate::error::EngineError;
use crate::error::Result;
use crate::lookup::ContestLookup;
use crate::lookup::FortLookup;
use crate::lookup::IncidentLookup;
use crate::lookup::QuestLookup;
use crate::records::common::FortCommon;
use fortwatch_wire::ApiIncident;
use fortwatch_wire::ApiPokestopResult;
use fortwatch_wire::FortType;
use fortwatch_wire::PokemonDisplay;
use fortwatch_wire::inbound::ChallengeQuest;
use fortwatch_wire::inbound::Contest;
use fortwatch_wire::inbound::FortDetails;
use fortwatch_wire::inbound::IncidentDisplay;
use fortwatch_wire::inbound::PokemonFort;
use fortwatch_wire::inbound::SizeLeaderboard;
use serde::Deserialize;
use serde::Serialize;

const LURE_IDS: std::ops::RangeInclusive<i16> = 501..=510;
const LURE_RESTART_GRACE_SECS: i64 = 30;
const QUEST_LIFETIME_SECS: i64 = 24 * 60 * 60;
const LEADERBOARD_SIZE: usize = 3;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestSlot {
    pub quest_type: Option<i16>,
    pub timestamp: Option<i64>,
    pub target: Option<i16>,
    pub conditions: Option<String>,
    pub rewards: Option<String>,
    pub template: Option<String>,
    pub title: Option<String>,
    pub expiry: Option<i64>,
    pub reward_type: Option<i16>,
    pub reward_amount: Option<i64>,
    pub reward_item_id: Option<i16>,
    pub reward_pokemon_id: Option<i16>,
    pub reward_pokemon_form: Option<i16>,
}

impl QuestSlot {
    pub fn is_set(&self) -> bool {
        self.quest_type.is_some()
    }

    fn lookup(&self) -> QuestLookup {
        QuestLookup {
            quest_type: self.quest_type.unwrap_or(0),
            target: self.target.unwrap_or(0),
            template: self.template.clone(),
            reward_type: self.reward_type.unwrap_or(0),
            reward_amount: self.reward_amount.unwrap_or(0),
            reward_item_id: self.reward_item_id.unwrap_or(0),
            reward_pokemon: self
                .reward_pokemon_id
                .map(|id| PokemonDisplay::new(id, self.reward_pokemon_form)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContestState {
    pub pokemon_id: Option<i16>,
    pub pokemon_form: Option<i16>,
    pub pokemon_type_1: Option<i16>,
    pub pokemon_type_2: Option<i16>,
    pub ranking_standard: Option<i16>,
    pub expiry: Option<i64>,
    pub total_entries: Option<i64>,
    pub rankings: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub display_type: i16,
    pub style: i16,
    pub character: i16,
    pub start: i64,
    pub expiration: i64,
    pub slots: Vec<PokemonDisplay>,
}

impl Incident {
    fn from_display(display: &IncidentDisplay) -> Self {
        Self {
            id: display.incident_id.clone(),
            display_type: display.display_type,
            style: display.style,
            character: display.character,
            start: display.start_ms / 1000,
            expiration: display.expiration_ms / 1000,
            slots: display.slots.iter().take(3).copied().collect(),
        }
    }

    fn slot(&self, index: usize) -> Option<PokemonDisplay> {
        self.slots.get(index).copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pokestop {
    #[serde(flatten)]
    pub common: FortCommon,
    pub lure_id: i16,
    pub lure_expire_timestamp: Option<i64>,
    pub ar_quest: QuestSlot,
    pub no_ar_quest: QuestSlot,
    pub contest: ContestState,
    pub incidents: Vec<Incident>,
}

#[derive(Serialize)]
struct Rankings<'a> {
    total_entries: i64,
    last_update: i64,
    contest_entries: Vec<&'a fortwatch_wire::inbound::LeaderboardEntry>,
}

impl Pokestop {
    pub fn new(id: &str) -> Self {
        Self {
            common: FortCommon::new(id),
            ..Default::default()
        }
    }

    pub fn apply_map_object(&mut self, fort: &PokemonFort, cell_id: u64, now: i64, lure_duration: i64) {
        self.common.apply_map_object(fort, cell_id, now);
        let last_modified = fort.last_modified_ms / 1000;
        self.apply_lure(&fort.active_fort_modifiers, last_modified, now, lure_duration);
        self.apply_incidents(&fort.incidents, now);
    }

    pub fn apply_details(&mut self, details: &FortDetails, now: i64, lure_duration: i64) {
        self.common.apply_details(details, now);
        self.apply_lure(&details.modifiers, now, now, lure_duration);
    }

    /// A known lure restarts only once the previous one has been over for a grace period.
    fn apply_lure(&mut self, modifiers: &[i16], last_modified: i64, now: i64, lure_duration: i64) {
        let Some(&lure_id) = modifiers.first() else {
            return;
        };
        if !LURE_IDS.contains(&lure_id) {
            return;
        }
        let lure_end = last_modified + lure_duration;
        if self.lure_id != lure_id {
            self.lure_id = lure_id;
            self.lure_expire_timestamp = Some(lure_end);
            return;
        }
        let old_end = self.lure_expire_timestamp.unwrap_or(0);
        if now > old_end + LURE_RESTART_GRACE_SECS {
            let restarted = if now > lure_end && lure_duration > 0 {
                let periods = (now - lure_end + lure_duration - 1) / lure_duration;
                lure_end + periods * lure_duration
            } else {
                lure_end
            };
            self.lure_expire_timestamp = Some(restarted);
        }
    }

    /// Replaces the incident list with the displays that have not yet expired.
    pub fn apply_incidents(&mut self, displays: &[IncidentDisplay], now: i64) {
        self.incidents = displays
            .iter()
            .map(Incident::from_display)
            .filter(|incident| incident.expiration > now)
            .collect();
    }

    pub fn apply_quest(&mut self, quest: &ChallengeQuest, have_ar: bool, now: i64) -> Result<()> {
        let reward = quest.rewards.first();
        let slot = QuestSlot {
            quest_type: Some(quest.quest_type),
            timestamp: Some(now),
            target: Some(quest.target),
            conditions: Some(serde_json::to_string(&quest.conditions)?),
            rewards: Some(serde_json::to_string(&quest.rewards)?),
            template: Some(quest.template_id.to_lowercase()),
            title: Some(quest.title.clone()),
            expiry: Some(now + QUEST_LIFETIME_SECS),
            reward_type: reward.map(|reward| reward.reward_type),
            reward_amount: reward.map(|reward| reward.amount),
            reward_item_id: reward.and_then(|reward| reward.item_id),
            reward_pokemon_id: reward.and_then(|reward| reward.pokemon_id),
            reward_pokemon_form: reward.and_then(|reward| reward.form),
        };
        if have_ar {
            self.ar_quest = slot;
        } else {
            self.no_ar_quest = slot;
        }
        self.common.updated = now;
        Ok(())
    }

    /// Returns whether any quest was present.
    pub fn clear_quests(&mut self) -> bool {
        let had_quest = self.ar_quest.is_set() || self.no_ar_quest.is_set();
        self.ar_quest = QuestSlot::default();
        self.no_ar_quest = QuestSlot::default();
        had_quest
    }

    pub fn apply_contest(&mut self, contest: &Contest, now: i64) {
        let focus = contest.focus_pokemon;
        self.contest.pokemon_id = focus.map(|pokemon| pokemon.pokemon_id);
        self.contest.pokemon_form = focus.and_then(|pokemon| pokemon.form);
        self.contest.pokemon_type_1 = contest.pokemon_type_1;
        self.contest.pokemon_type_2 = contest.pokemon_type_2;
        self.contest.ranking_standard = Some(contest.ranking_standard);
        self.contest.expiry = Some(contest.end_time_ms / 1000);
        self.common.updated = now;
    }

    /// Keeps the top entries by rank and the total entry count.
    pub fn apply_leaderboard(&mut self, board: &SizeLeaderboard, now: i64) -> Result<()> {
        let mut entries: Vec<_> = board.entries.iter().collect();
        entries.sort_by_key(|entry| entry.rank);
        entries.truncate(LEADERBOARD_SIZE);
        let rankings = Rankings {
            total_entries: board.total_entries,
            last_update: now,
            contest_entries: entries,
        };
        self.contest.rankings = Some(
            serde_json::to_string(&rankings)
                .map_err(|err| EngineError::malformed(format!("leaderboard {}: {err}", board.contest_id)))?,
        );
        self.contest.total_entries = Some(board.total_entries);
        self.common.updated = now;
        Ok(())
    }

    pub fn lookup(&self) -> FortLookup {
        let mut lookup = FortLookup::new(FortType::Pokestop);
        lookup.power_up_level = self.common.power_up_level.unwrap_or(0);
        lookup.ar_scan_eligible = self.common.ar_scan_eligible.unwrap_or(false);
        lookup.lure_id = self.lure_id;
        lookup.ar_quest = self.ar_quest.lookup();
        lookup.no_ar_quest = self.no_ar_quest.lookup();
        lookup.incidents = self
            .incidents
            .iter()
            .map(|incident| IncidentLookup {
                display_type: incident.display_type,
                style: incident.style,
                character: incident.character,
                slots: [incident.slot(0), incident.slot(1), incident.slot(2)],
            })
            .collect();
        lookup.contest = ContestLookup {
            pokemon: self
                .contest
                .pokemon_id
                .map(|id| PokemonDisplay::new(id, self.contest.pokemon_form)),
            pokemon_type_1: self.contest.pokemon_type_1.unwrap_or(0),
            pokemon_type_2: self.contest.pokemon_type_2.unwrap_or(0),
            ranking_standard: self.contest.ranking_standard.unwrap_or(0),
            total_entries: self.contest.total_entries.unwrap_or(0),
        };
        lookup
    }

    pub fn to_api(&self) -> ApiPokestopResult {
        let common = &self.common;
        let ar = &self.ar_quest;
        let no_ar = &self.no_ar_quest;
        ApiPokestopResult {
            id: common.id.clone(),
            lat: common.lat,
            lon: common.lon,
            name: common.name.clone(),
            url: common.url.clone(),
            description: common.description.clone(),
            lure_id: self.lure_id,
            lure_expire_timestamp: self.lure_expire_timestamp,
            last_modified_timestamp: common.last_modified_timestamp,
            updated: common.updated,
            enabled: common.enabled,
            cell_id: common.cell_id,
            deleted: common.deleted,
            first_seen_timestamp: common.first_seen_timestamp,
            partner_id: common.partner_id.clone(),
            ar_scan_eligible: common.ar_scan_eligible,
            power_up_level: common.power_up_level,
            power_up_points: common.power_up_points,
            power_up_end_timestamp: common.power_up_end_timestamp,
            quest_type: ar.quest_type,
            quest_timestamp: ar.timestamp,
            quest_target: ar.target,
            quest_conditions: ar.conditions.clone(),
            quest_rewards: ar.rewards.clone(),
            quest_template: ar.template.clone(),
            quest_title: ar.title.clone(),
            quest_expiry: ar.expiry,
            alternative_quest_type: no_ar.quest_type,
            alternative_quest_timestamp: no_ar.timestamp,
            alternative_quest_target: no_ar.target,
            alternative_quest_conditions: no_ar.conditions.clone(),
            alternative_quest_rewards: no_ar.rewards.clone(),
            alternative_quest_template: no_ar.template.clone(),
            alternative_quest_title: no_ar.title.clone(),
            alternative_quest_expiry: no_ar.expiry,
            showcase_pokemon_id: self.contest.pokemon_id,
            showcase_pokemon_form_id: self.contest.pokemon_form,
            showcase_pokemon_type_id: self.contest.pokemon_type_1,
            showcase_ranking_standard: self.contest.ranking_standard,
            showcase_expiry: self.contest.expiry,
            showcase_rankings: self.contest.rankings.clone(),
            incidents: self
                .incidents
                .iter()
                .map(|incident| ApiIncident {
                    id: incident.id.clone(),
                    display_type: incident.display_type,
                    style: incident.style,
                    character: incident.character,
                    start: incident.start,
                    expiration: incident.expiration,
                    slot_1_pokemon_id: incident.slot(0).map(|slot| slot.pokemon_id),
                    slot_1_form: incident.slot(0).and_then(|slot| slot.form),
                    slot_2_pokemon_id: incident.slot(1).map(|slot| slot.pokemon_id),
                    slot_2_form: incident.slot(1).and_then(|slot| slot.form),
                    slot_3_pokemon_id: incident.slot(2).map(|slot| slot.pokemon_id),
                    slot_3_form: incident.slot(2).and_then(|slot| slot.form),
                })
                .collect(),
        }
    }
}

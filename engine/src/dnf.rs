//! Disjunctive-normal-form filter evaluation over [`FortLookup`].
//!
//! A filter list matches when any clause matches; an empty list matches every fort of the
//! requested type. Inside a clause every present constraint must pass. Empty lists are
//! treated as absent constraints. Raid constraints only match gyms whose raid has not
//! ended at `now` (seconds since the epoch).

use crate::lookup::FortLookup;
use crate::lookup::IncidentLookup;
use crate::lookup::QuestLookup;
use fortwatch_wire::DnfClause;
use fortwatch_wire::FortType;
use fortwatch_wire::PokemonDisplay;
use fortwatch_wire::PokemonFilter;
use fortwatch_wire::RangeFilter;

pub fn matches(
    fort_type: FortType,
    lookup: &FortLookup,
    filters: &[DnfClause],
    now: i64,
) -> bool {
    if lookup.fort_type != fort_type {
        return false;
    }
    filters.is_empty() || filters.iter().any(|clause| matches_clause(lookup, clause, now))
}

/// Evaluates one AND-clause. Gym constraints are skipped for pokestops and vice versa.
pub fn matches_clause(lookup: &FortLookup, clause: &DnfClause, now: i64) -> bool {
    if !in_range(&clause.power_up_level, i64::from(lookup.power_up_level))
        || !required(clause.is_ar_scan_eligible, lookup.ar_scan_eligible)
    {
        return false;
    }
    match lookup.fort_type {
        FortType::Gym => matches_gym(lookup, clause, now),
        FortType::Pokestop => matches_pokestop(lookup, clause),
    }
}

fn matches_gym(lookup: &FortLookup, clause: &DnfClause, now: i64) -> bool {
    if !in_range(&clause.available_slots, i64::from(lookup.available_slots))
        || !in_set(&clause.team_id, lookup.team_id)
        || !required(clause.in_battle, lookup.in_battle)
    {
        return false;
    }
    if !constrains(&clause.raid_level) && !constrains(&clause.raid_pokemon) {
        return true;
    }
    let raid_active = lookup.raid_battle_timestamp > now || lookup.raid_end_timestamp > now;
    raid_active
        && in_set(&clause.raid_level, lookup.raid_level)
        && pokemon_in(&clause.raid_pokemon, lookup.raid_pokemon)
}

fn matches_pokestop(lookup: &FortLookup, clause: &DnfClause) -> bool {
    if !in_set(&clause.lure_id, lookup.lure_id) {
        return false;
    }

    let ar = QuestConstraints {
        reward_type: &clause.ar_quest_reward_type,
        reward_amount: &clause.ar_quest_reward_amount,
        reward_item_id: &clause.ar_quest_reward_item_id,
        reward_pokemon: &clause.ar_quest_reward_pokemon,
        quest_type: &clause.ar_quest_type,
        target: &clause.ar_quest_target,
        template: &clause.ar_quest_template,
    };
    let no_ar = QuestConstraints {
        reward_type: &clause.no_ar_quest_reward_type,
        reward_amount: &clause.no_ar_quest_reward_amount,
        reward_item_id: &clause.no_ar_quest_reward_item_id,
        reward_pokemon: &clause.no_ar_quest_reward_pokemon,
        quest_type: &clause.no_ar_quest_type,
        target: &clause.no_ar_quest_target,
        template: &clause.no_ar_quest_template,
    };
    if !ar.matches(&lookup.ar_quest) || !no_ar.matches(&lookup.no_ar_quest) {
        return false;
    }

    if clause.has_incident_constraint()
        && !lookup
            .incidents
            .iter()
            .any(|incident| incident_matches(incident, clause))
    {
        return false;
    }

    let contest = &lookup.contest;
    pokemon_in(&clause.contest_pokemon, contest.pokemon)
        && in_set(&clause.contest_pokemon_type_1, contest.pokemon_type_1)
        && in_set(&clause.contest_pokemon_type_2, contest.pokemon_type_2)
        && in_set(&clause.contest_ranking_standard, contest.ranking_standard)
        && in_range(&clause.contest_total_entries, contest.total_entries)
}

struct QuestConstraints<'a> {
    reward_type: &'a Option<Vec<i16>>,
    reward_amount: &'a Option<RangeFilter>,
    reward_item_id: &'a Option<Vec<i16>>,
    reward_pokemon: &'a Option<Vec<PokemonFilter>>,
    quest_type: &'a Option<Vec<i16>>,
    target: &'a Option<Vec<i16>>,
    template: &'a Option<Vec<String>>,
}

impl QuestConstraints<'_> {
    fn matches(&self, quest: &QuestLookup) -> bool {
        in_set(self.reward_type, quest.reward_type)
            && in_range(self.reward_amount, quest.reward_amount)
            && in_set(self.reward_item_id, quest.reward_item_id)
            && pokemon_in(self.reward_pokemon, quest.reward_pokemon)
            && in_set(self.quest_type, quest.quest_type)
            && in_set(self.target, quest.target)
            && template_in(self.template, quest.template.as_deref())
    }
}

/// Every present incident sub-constraint must hold for this one incident.
fn incident_matches(incident: &IncidentLookup, clause: &DnfClause) -> bool {
    in_set(&clause.incident_display_type, incident.display_type)
        && in_set(&clause.incident_style, incident.style)
        && in_set(&clause.incident_character, incident.character)
        && pokemon_in(&clause.incident_slot_1, incident.slots[0])
        && pokemon_in(&clause.incident_slot_2, incident.slots[1])
        && pokemon_in(&clause.incident_slot_3, incident.slots[2])
}

fn constrains<T>(filter: &Option<Vec<T>>) -> bool {
    filter.as_ref().is_some_and(|values| !values.is_empty())
}

fn in_range(filter: &Option<RangeFilter>, value: i64) -> bool {
    filter.as_ref().is_none_or(|range| range.contains(value))
}

fn in_set(filter: &Option<Vec<i16>>, value: i16) -> bool {
    match filter {
        Some(values) if !values.is_empty() => values.contains(&value),
        _ => true,
    }
}

/// `Some(true)` demands a true value; `false` or absent places no constraint.
fn required(filter: Option<bool>, value: bool) -> bool {
    filter != Some(true) || value
}

fn template_in(filter: &Option<Vec<String>>, template: Option<&str>) -> bool {
    match filter {
        Some(values) if !values.is_empty() => template.is_some_and(|template| {
            values
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(template))
        }),
        _ => true,
    }
}

/// A `null` filter form matches any form; an absent form on the fort counts as form 0.
fn pokemon_in(filter: &Option<Vec<PokemonFilter>>, pokemon: Option<PokemonDisplay>) -> bool {
    match filter {
        Some(values) if !values.is_empty() => pokemon.is_some_and(|pokemon| {
            values.iter().any(|wanted| {
                wanted.pokemon_id == pokemon.pokemon_id
                    && wanted
                        .form
                        .is_none_or(|form| form == pokemon.form.unwrap_or(0))
            })
        }),
        _ => true,
    }
}

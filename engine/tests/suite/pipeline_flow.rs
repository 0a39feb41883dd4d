use crate::suite::harness::Harness;
use crate::suite::harness::cell;
use crate::suite::harness::details;
use crate::suite::harness::gmo_fort;
use crate::suite::harness::map_fort;
use crate::suite::harness::scan;
use crate::suite::harness::test_area;
use fortwatch_engine::EngineError;
use fortwatch_engine::FortRecord;
use fortwatch_engine::UpdateStatus;
use fortwatch_engine::stats::FortCountChange;
use fortwatch_wire::FortType;
use fortwatch_wire::InboundMessage;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn change(kind: &str, id: &str) -> (String, String) {
    (kind.to_string(), id.to_string())
}

fn statuses(outcomes: &[fortwatch_engine::UpdateOutcome]) -> Vec<UpdateStatus> {
    outcomes.iter().map(|outcome| outcome.status).collect()
}

#[tokio::test]
async fn details_create_then_edit() {
    let mut harness = Harness::new();
    let created = harness.send(details("P", "pokestop", "A", 10.0, 10.0)).await;
    assert_eq!(statuses(&created), vec![UpdateStatus::Created]);

    let renamed = harness.send(details("P", "pokestop", "B", 10.0, 10.0)).await;
    assert_eq!(statuses(&renamed), vec![UpdateStatus::Updated]);
    harness.send(details("P", "pokestop", "B", 10.0, 10.0)).await;

    let messages = harness.drain();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_type, "fort_update");
    assert_eq!(messages[0].areas, vec![test_area()]);
    assert_eq!(messages[0].message["change_type"], "new");
    assert_eq!(messages[1].message["change_type"], "edit");
    assert_eq!(messages[1].message["edit_types"], json!(["name"]));
    assert_eq!(messages[1].message["old"]["name"], "A");
    assert_eq!(messages[1].message["new"]["name"], "B");

    assert_eq!(
        harness
            .stats
            .fort_changes(&test_area(), FortType::Pokestop, FortCountChange::Addition),
        1
    );
    let stored = harness.persistence.stored_fort("P").expect("persisted");
    assert_eq!(stored.common().name.as_deref(), Some("B"));
}

#[tokio::test]
async fn unknown_details_type_is_skipped() {
    let harness = Harness::new();
    let mut message = details("X", "gym", "Nowhere", 10.0, 10.0);
    message["fort_type"] = serde_json::Value::Null;
    let outcomes = harness.send(message).await;
    assert_eq!(statuses(&outcomes), vec![UpdateStatus::Skipped]);
    assert_eq!(outcomes[0].detail, "unknown fort type");
    assert!(harness.record("X").await.is_none());
}

#[tokio::test]
async fn map_fort_waits_for_classification() {
    let mut harness = Harness::new();
    let buffered = harness.send(map_fort("X", "Fountain", 10.0, 10.0)).await;
    assert_eq!(statuses(&buffered), vec![UpdateStatus::Buffered]);
    assert_eq!(harness.engine.pipeline().pending_classifications(), 1);
    assert!(harness.record("X").await.is_none());
    assert_eq!(harness.engine.sizes(), (0, 0));
    assert!(harness.drain().is_empty());

    let classified = harness.send(cell(3, vec![gmo_fort("X", "pokestop", 10.0, 10.0)])).await;
    assert_eq!(statuses(&classified), vec![UpdateStatus::Created]);
    assert_eq!(harness.engine.pipeline().pending_classifications(), 0);

    let record = harness.record("X").await.expect("classified record");
    assert_eq!(record.fort_type(), FortType::Pokestop);
    assert_eq!(record.common().name.as_deref(), Some("Fountain"));
    assert_eq!(
        record.common().url.as_deref(),
        Some("https://img.example/forts/fountain.png")
    );
    let messages = harness.drain();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message["new"]["name"], "Fountain");
}

#[tokio::test]
async fn map_fort_merges_into_a_known_fort() {
    let mut harness = Harness::new();
    harness.send(cell(3, vec![gmo_fort("G", "gym", 10.0, 10.0)])).await;
    let merged = harness.send(map_fort("G", "Hall", 10.0, 10.0)).await;
    assert_eq!(statuses(&merged), vec![UpdateStatus::Updated]);
    assert_eq!(harness.engine.pipeline().pending_classifications(), 0);

    let messages = harness.drain();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].message["change_type"], "edit");
    assert_eq!(messages[1].message["edit_types"], json!(["name", "image_url"]));
}

#[tokio::test]
async fn reclassification_keeps_identity_fields() {
    let mut harness = Harness::new();
    let mut gym = details("F", "gym", "Old Hall", 10.0, 10.0);
    gym["description"] = json!("Built 1901");
    gym["image_urls"] = json!(["https://img.example/hall.png"]);
    harness.send(gym).await;

    let mut stop = gmo_fort("F", "pokestop", 10.0, 10.0);
    stop["image_url"] = json!("https://img.example/stop.png");
    let outcomes = harness.send(cell(9, vec![stop])).await;
    assert_eq!(statuses(&outcomes), vec![UpdateStatus::Updated]);

    let record = harness.record("F").await.expect("reclassified");
    let FortRecord::Pokestop(stop) = &record else {
        panic!("expected a pokestop, got {record:?}");
    };
    assert_eq!(stop.common.name.as_deref(), Some("Old Hall"));
    assert_eq!(stop.common.description.as_deref(), Some("Built 1901"));
    // the new record's own value wins over the shared one
    assert_eq!(stop.common.url.as_deref(), Some("https://img.example/stop.png"));

    assert_eq!(
        harness.changes(),
        vec![change("new", "F"), change("removal", "F"), change("new", "F")]
    );
    let scanner = harness.engine.scanner();
    let request = scan((9.0, 9.0), (11.0, 11.0), 0, json!([]));
    assert_eq!(scanner.scan(Some(FortType::Pokestop), &request).ids, vec!["F".to_string()]);
    assert!(scanner.scan(Some(FortType::Gym), &request).ids.is_empty());
    assert_eq!(
        harness
            .stats
            .fort_changes(&test_area(), FortType::Gym, FortCountChange::Removal),
        1
    );
}

#[tokio::test]
async fn fort_search_fills_the_quest_slot() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .send(cell(
            1,
            vec![gmo_fort("P", "pokestop", 10.0, 10.0), gmo_fort("G", "gym", 10.5, 10.5)],
        ))
        .await;
    let quest = json!({
        "quest_type": 4,
        "target": 3,
        "template_id": "CHALLENGE_CATCH_X",
        "title": "Catch 3",
        "rewards": [{ "reward_type": 2, "amount": 5, "item_id": 701 }],
    });

    let outcomes = harness
        .send(json!({ "kind": "fort_search", "fort_id": "P", "have_ar": true, "challenge_quest": quest }))
        .await;
    assert_eq!(statuses(&outcomes), vec![UpdateStatus::Updated]);
    let Some(FortRecord::Pokestop(stop)) = harness.record("P").await else {
        panic!("expected pokestop");
    };
    assert_eq!(stop.ar_quest.template.as_deref(), Some("challenge_catch_x"));
    assert_eq!(stop.ar_quest.reward_item_id, Some(701));
    assert!(!stop.no_ar_quest.is_set());

    let scanner = harness.engine.scanner();
    let by_template = scan(
        (9.0, 9.0),
        (11.0, 11.0),
        0,
        json!([{ "ar_quest_template": ["Challenge_Catch_X"] }]),
    );
    assert_eq!(scanner.pokestop_scan(&by_template, &harness.cancel).await?.pokestops.len(), 1);
    let wrong_slot = scan((9.0, 9.0), (11.0, 11.0), 0, json!([{ "no_ar_quest_type": [4] }]));
    assert!(scanner.pokestop_scan(&wrong_slot, &harness.cancel).await?.pokestops.is_empty());

    let blank = harness
        .send(json!({ "kind": "fort_search", "fort_id": "P", "have_ar": false }))
        .await;
    assert_eq!(statuses(&blank), vec![UpdateStatus::Blank]);
    let unknown = harness
        .send(json!({ "kind": "fort_search", "fort_id": "nope", "challenge_quest": quest }))
        .await;
    assert_eq!(statuses(&unknown), vec![UpdateStatus::NotFound]);
    let gym = harness
        .send(json!({ "kind": "fort_search", "fort_id": "G", "challenge_quest": quest }))
        .await;
    assert_eq!(statuses(&gym), vec![UpdateStatus::Skipped]);

    assert_eq!(harness.stats.quest_decodes("ar"), 1);
    assert_eq!(harness.stats.quest_decodes("blank"), 1);
    Ok(())
}

#[tokio::test]
async fn contests_and_leaderboards() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;
    let contest = json!({ "contest_id": "P-1", "ranking_standard": 1, "pokemon_type_1": 12 });

    let err = harness
        .try_send(json!({ "kind": "contest_data", "contests": [contest, contest] }))
        .await;
    assert!(matches!(err, Err(EngineError::Malformed(_))));
    let none = harness
        .send(json!({ "kind": "contest_data", "fort_id": "P", "contests": [] }))
        .await;
    assert_eq!(statuses(&none), vec![UpdateStatus::Skipped]);
    let applied = harness
        .send(json!({ "kind": "contest_data", "fort_id": "P", "contests": [contest] }))
        .await;
    assert_eq!(statuses(&applied), vec![UpdateStatus::Updated]);

    let entries: Vec<_> = (1..=5)
        .rev()
        .map(|rank| json!({ "rank": rank, "score": 1.0 / f64::from(rank), "pokemon_id": 129 }))
        .collect();
    let board = harness
        .send(json!({
            "kind": "size_leaderboard",
            "contest_id": "P-1",
            "total_entries": 12,
            "entries": entries,
        }))
        .await;
    assert_eq!(statuses(&board), vec![UpdateStatus::Updated]);

    let Some(FortRecord::Pokestop(stop)) = harness.record("P").await else {
        panic!("expected pokestop");
    };
    let rankings: serde_json::Value =
        serde_json::from_str(stop.contest.rankings.as_deref().unwrap_or_default())?;
    let ranks: Vec<i64> = rankings["contest_entries"]
        .as_array()
        .map(|entries| entries.iter().filter_map(|entry| entry["rank"].as_i64()).collect())
        .unwrap_or_default();
    assert_eq!(ranks, vec![1, 2, 3]);

    let request = scan(
        (9.0, 9.0),
        (11.0, 11.0),
        0,
        json!([{ "contest_total_entries": { "min": 10 }, "contest_pokemon_type_1": [12] }]),
    );
    let found = harness.engine.scanner().pokestop_scan(&request, &harness.cancel).await?;
    assert_eq!(found.pokestops.len(), 1);
    assert_eq!(found.pokestops[0].showcase_pokemon_type_id, Some(12));
    Ok(())
}

#[tokio::test]
async fn failed_saves_update_memory_but_not_webhooks() {
    let mut harness = Harness::new();
    harness.send(details("P", "pokestop", "A", 10.0, 10.0)).await;
    harness.drain();

    harness.persistence.set_fail_writes(true);
    let renamed = harness.try_send(details("P", "pokestop", "B", 10.0, 10.0)).await;
    assert!(matches!(renamed, Err(EngineError::Persistence(_))));
    let created = harness
        .send(cell(2, vec![gmo_fort("Q", "gym", 10.5, 10.5), gmo_fort("R", "pokestop", 10.6, 10.6)]))
        .await;
    let statuses: Vec<UpdateStatus> = created.iter().map(|outcome| outcome.status).collect();
    assert_eq!(statuses, vec![UpdateStatus::Skipped, UpdateStatus::Skipped]);
    assert!(created[1].detail.contains("write rejected for R"));
    assert!(harness.record("R").await.is_some());
    assert!(harness.drain().is_empty());

    let record = harness.record("P").await.expect("still resident");
    assert_eq!(record.common().name.as_deref(), Some("B"));
    assert_eq!(
        harness
            .persistence
            .stored_fort("P")
            .and_then(|stored| stored.common().name.clone())
            .as_deref(),
        Some("A")
    );
    assert_eq!(harness.engine.sizes(), (3, 3));

    harness.persistence.set_fail_writes(false);
    harness.send(details("P", "pokestop", "C", 10.0, 10.0)).await;
    assert_eq!(harness.changes(), vec![change("edit", "P")]);
}

#[tokio::test]
async fn cancelled_requests_fail_fast() {
    let harness = Harness::new();
    harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let message: InboundMessage =
        serde_json::from_value(details("P", "pokestop", "B", 10.0, 10.0)).expect("parses");
    let result = harness.engine.pipeline().handle(message, &cancelled).await;
    assert!(result.is_err_and(|err| err.is_cancelled()));

    let request = scan((9.0, 9.0), (11.0, 11.0), 0, json!([]));
    let scanned = harness.engine.scanner().pokestop_scan(&request, &cancelled).await;
    assert!(matches!(scanned, Err(EngineError::Cancelled)));

    let record = harness.record("P").await.expect("untouched");
    assert_eq!(record.common().name, None);
}

#[tokio::test]
async fn stations_are_created_and_read_back() -> anyhow::Result<()> {
    let harness = Harness::new();
    let station = json!({
        "kind": "station",
        "id": "S1",
        "name": "Power Spot",
        "latitude": 10.0,
        "longitude": 10.0,
        "start_time_ms": 1_700_000_000_000_i64,
        "end_time_ms": 1_700_086_400_000_i64,
        "is_battle_available": true,
        "battle": { "level": 3, "start_ms": 1_700_000_000_000_i64, "end_ms": 1_700_003_600_000_i64, "pokemon": { "pokemon_id": 6 } },
    });
    assert_eq!(statuses(&harness.send(station.clone()).await), vec![UpdateStatus::Created]);
    assert_eq!(statuses(&harness.send(station).await), vec![UpdateStatus::Updated]);

    let api = harness
        .engine
        .pipeline()
        .station("S1", &harness.cancel)
        .await?
        .expect("station exists");
    assert_eq!(api.name, "Power Spot");
    assert_eq!(api.battle_level, Some(3));
    assert_eq!(api.battle_pokemon_id, Some(6));
    assert!(
        harness
            .engine
            .pipeline()
            .station("S2", &harness.cancel)
            .await?
            .is_none()
    );
    Ok(())
}

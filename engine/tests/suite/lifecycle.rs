use crate::suite::harness::Harness;
use crate::suite::harness::cell;
use crate::suite::harness::details;
use crate::suite::harness::gmo_fort;
use crate::suite::harness::scan;
use fortwatch_engine::Backend;
use fortwatch_engine::EngineConfig;
use fortwatch_engine::EngineError;
use fortwatch_engine::FortEngine;
use fortwatch_engine::FortRecord;
use fortwatch_engine::Geofence;
use fortwatch_engine::InMemoryPersistence;
use fortwatch_engine::UpdateStatus;
use fortwatch_engine::spawn_webhook_sender;
use fortwatch_engine::webhooks::RecordingTransport;
use fortwatch_wire::FortType;
use fortwatch_wire::InboundMessage;
use fortwatch_wire::Location;
use fortwatch_wire::QuestStatus;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

fn change(kind: &str, id: &str) -> (String, String) {
    (kind.to_string(), id.to_string())
}

#[tokio::test]
async fn removal_tombstones_until_seen_again() {
    let mut harness = Harness::new();
    harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;
    harness.drain();

    let removed = harness.send(json!({ "kind": "fort_removal", "fort_id": "P" })).await;
    assert_eq!(removed[0].status, UpdateStatus::Removed);
    assert_eq!(harness.changes(), vec![change("removal", "P")]);
    assert!(harness.record("P").await.is_some_and(|record| record.is_deleted()));
    assert!(harness.persistence.stored_fort("P").is_none());
    assert_eq!(harness.engine.sizes(), (0, 0));

    let again = harness.send(json!({ "kind": "fort_removal", "fort_id": "P" })).await;
    assert_eq!(again[0].status, UpdateStatus::Skipped);
    let unknown = harness.send(json!({ "kind": "fort_removal", "fort_id": "Z" })).await;
    assert_eq!(unknown[0].status, UpdateStatus::NotFound);
    assert!(harness.drain().is_empty());

    let seen = harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;
    assert_eq!(seen[0].status, UpdateStatus::Updated);
    assert_eq!(harness.changes(), vec![change("new", "P")]);
    assert!(harness.record("P").await.is_some_and(|record| !record.is_deleted()));
    assert!(harness.persistence.stored_fort("P").is_some());
    assert_eq!(harness.engine.sizes(), (1, 1));
}

#[tokio::test]
async fn failed_removal_can_be_retried() {
    let mut harness = Harness::new();
    harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;
    harness.drain();

    harness.persistence.set_fail_writes(true);
    let failed = harness.try_send(json!({ "kind": "fort_removal", "fort_id": "P" })).await;
    assert!(matches!(failed, Err(EngineError::Persistence(_))));
    assert!(harness.drain().is_empty());
    assert!(harness.record("P").await.is_some_and(|record| !record.is_deleted()));
    assert!(harness.persistence.stored_fort("P").is_some());
    assert_eq!(harness.engine.sizes(), (1, 1));

    harness.persistence.set_fail_writes(false);
    let removed = harness.send(json!({ "kind": "fort_removal", "fort_id": "P" })).await;
    assert_eq!(removed[0].status, UpdateStatus::Removed);
    assert_eq!(harness.changes(), vec![change("removal", "P")]);
    assert!(harness.persistence.stored_fort("P").is_none());
    assert_eq!(harness.engine.sizes(), (0, 0));
}

#[tokio::test]
async fn quests_on_tombstones_are_not_indexed() {
    let mut harness = Harness::new();
    harness.send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)])).await;
    harness.send(json!({ "kind": "fort_removal", "fort_id": "P" })).await;
    harness.drain();

    harness
        .send(json!({
            "kind": "fort_search",
            "fort_id": "P",
            "challenge_quest": { "quest_type": 4, "template_id": "t" },
        }))
        .await;
    assert!(harness.drain().is_empty());
    assert_eq!(harness.engine.sizes(), (0, 0));
}

#[tokio::test]
async fn stale_forts_leave_their_cell() {
    let mut config = EngineConfig::default();
    config.tuning.stale_fort_threshold_secs = 600;
    let mut harness = Harness::with_config(config);
    harness
        .send(cell(
            7,
            vec![gmo_fort("A", "gym", 10.0, 10.0), gmo_fort("B", "pokestop", 10.1, 10.1)],
        ))
        .await;
    harness.drain();

    harness.advance(100);
    let outcomes = harness.send(cell(7, vec![gmo_fort("A", "gym", 10.0, 10.0)])).await;
    assert_eq!(outcomes.len(), 1);

    harness.advance(1000);
    let outcomes = harness.send(cell(7, vec![gmo_fort("A", "gym", 10.0, 10.0)])).await;
    let removed: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| outcome.status == UpdateStatus::Removed)
        .map(|outcome| outcome.fort_id.as_str())
        .collect();
    assert_eq!(removed, vec!["B"]);
    assert_eq!(harness.changes(), vec![change("removal", "B")]);
    assert!(harness.record("B").await.is_some_and(|record| record.is_deleted()));

    // B comes back somewhere else and is tracked again
    harness.send(cell(8, vec![gmo_fort("B", "pokestop", 10.1, 10.1)])).await;
    assert_eq!(harness.changes(), vec![change("new", "B")]);
}

#[tokio::test]
async fn zero_threshold_disables_stale_removal() {
    let mut config = EngineConfig::default();
    config.tuning.stale_fort_threshold_secs = 0;
    let harness = Harness::with_config(config);
    harness.send(cell(7, vec![gmo_fort("A", "gym", 10.0, 10.0)])).await;
    harness.advance(1_000_000);
    let outcomes = harness.send(cell(7, Vec::new())).await;
    assert!(outcomes.is_empty());
    assert!(harness.record("A").await.is_some_and(|record| !record.is_deleted()));
}

#[tokio::test]
async fn clear_quests_within_a_fence() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .send(cell(
            1,
            vec![
                gmo_fort("inside", "pokestop", 1.0, 1.0),
                gmo_fort("outside", "pokestop", 5.0, 5.0),
            ],
        ))
        .await;
    for id in ["inside", "outside"] {
        harness
            .send(json!({
                "kind": "fort_search",
                "fort_id": id,
                "have_ar": true,
                "challenge_quest": { "quest_type": 4, "template_id": "t" },
            }))
            .await;
    }
    let fence = Geofence::rectangle(Location::new(0.0, 0.0), Location::new(2.0, 2.0));
    let pipeline = harness.engine.pipeline();

    assert_eq!(
        pipeline.quest_status(&fence, &harness.cancel).await?,
        QuestStatus {
            ar_quests: 1,
            no_ar_quests: 0,
            total: 1
        }
    );
    assert_eq!(pipeline.clear_quests(&fence, &harness.cancel).await?, 1);
    assert_eq!(pipeline.quest_status(&fence, &harness.cancel).await?.ar_quests, 0);

    let Some(FortRecord::Pokestop(stop)) = harness.record("inside").await else {
        panic!("expected pokestop");
    };
    assert!(!stop.ar_quest.is_set());

    let request = scan((0.0, 0.0), (6.0, 6.0), 0, json!([{ "ar_quest_type": [4] }]));
    let found = harness.engine.scanner().scan(Some(FortType::Pokestop), &request);
    assert_eq!(found.ids, vec!["outside".to_string()]);

    let positions = pipeline.pokestop_positions(&fence, &harness.cancel).await?;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].id, "inside");
    Ok(())
}

#[tokio::test]
async fn preload_indexes_stored_forts() -> anyhow::Result<()> {
    let mut gym = FortRecord::empty("G", FortType::Gym);
    gym.common_mut().lat = 10.0;
    gym.common_mut().lon = 10.0;
    let mut gone = FortRecord::empty("P", FortType::Pokestop);
    gone.common_mut().deleted = true;
    let persistence = Arc::new(InMemoryPersistence::with_forts([gym, gone]));
    let harness = Harness::build(EngineConfig::default(), persistence.clone());

    assert_eq!(harness.engine.pipeline().preload(persistence.forts())?, 1);
    let request = scan((9.0, 9.0), (11.0, 11.0), 0, json!([]));
    let found = harness.engine.scanner().gym_scan(&request, &harness.cancel).await?;
    assert_eq!(found.gyms.len(), 1);
    assert_eq!(found.gyms[0].id, "G");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_to_one_fort_serialise() -> anyhow::Result<()> {
    let persistence = Arc::new(InMemoryPersistence::new());
    let (engine, mut webhooks) =
        FortEngine::from_config(&EngineConfig::default(), Backend::in_memory(persistence.clone()));
    let engine = Arc::new(engine);
    let cancel = CancellationToken::new();

    let mut tasks = JoinSet::new();
    for n in 0..20 {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let message: InboundMessage =
                serde_json::from_value(details("F", "pokestop", &format!("name {n}"), 10.0, 10.0))?;
            engine.pipeline().handle(message, &cancel).await?;
            anyhow::Ok(())
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    assert_eq!(persistence.write_count(), 20);
    let mut kinds = Vec::new();
    while let Ok(message) = webhooks.try_recv() {
        kinds.push(message.message["change_type"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(kinds.first().map(String::as_str), Some("new"));
    assert_eq!(kinds.iter().filter(|kind| kind.as_str() == "new").count(), 1);
    assert_eq!(engine.sizes(), (1, 1));
    Ok(())
}

#[tokio::test]
async fn webhook_sender_delivers_engine_changes() -> anyhow::Result<()> {
    let config = EngineConfig::from_toml_str(
        r#"
        [[webhooks]]
        url = "http://hooks.local/forts"
        areas = ["Town/*"]

        [[webhooks]]
        url = "http://hooks.local/elsewhere"
        areas = ["Elsewhere/*"]

        [[areas]]
        parent = "Town"
        name = "Centre"
        polygon = [[0.0, 0.0], [0.0, 20.0], [20.0, 20.0], [20.0, 0.0]]
        "#,
    )?;
    let (engine, receiver) =
        FortEngine::from_config(&config, Backend::in_memory(Arc::new(InMemoryPersistence::new())));
    let transport = Arc::new(RecordingTransport::new());
    let shutdown = CancellationToken::new();
    let sender = spawn_webhook_sender(&config, transport.clone(), receiver, shutdown.clone());

    let cancel = CancellationToken::new();
    for name in ["A", "B"] {
        let message: InboundMessage =
            serde_json::from_value(details("P", "pokestop", name, 10.0, 10.0))?;
        engine.pipeline().handle(message, &cancel).await?;
    }
    shutdown.cancel();
    sender.await?;

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let (url, batch) = &batches[0];
    assert_eq!(url, "http://hooks.local/forts");
    let kinds: Vec<&str> = batch
        .iter()
        .filter_map(|message| message.message["change_type"].as_str())
        .collect();
    assert_eq!(kinds, vec!["new", "edit"]);
    Ok(())
}

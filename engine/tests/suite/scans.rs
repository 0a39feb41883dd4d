use crate::suite::harness::Harness;
use crate::suite::harness::NOW;
use crate::suite::harness::cell;
use crate::suite::harness::gmo_fort;
use crate::suite::harness::scan;
use pretty_assertions::assert_eq;
use serde_json::json;

fn ids_of(pokestops: &[fortwatch_wire::ApiPokestopResult]) -> Vec<String> {
    pokestops.iter().map(|stop| stop.id.clone()).collect()
}

#[tokio::test]
async fn pokestop_scan_gates_on_type_and_box() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .send(cell(
            1,
            vec![
                gmo_fort("G", "gym", 10.0, 10.0),
                gmo_fort("P", "pokestop", 10.1, 10.1),
            ],
        ))
        .await;

    let request = scan((9.0, 9.0), (11.0, 11.0), 100, json!([]));
    let found = harness
        .engine
        .scanner()
        .pokestop_scan(&request, &harness.cancel)
        .await?;
    assert_eq!(ids_of(&found.pokestops), vec!["P".to_string()]);
    assert_eq!((found.total, found.examined, found.skipped), (2, 2, 0));

    let gyms = harness.engine.scanner().gym_scan(&request, &harness.cancel).await?;
    assert_eq!(gyms.gyms.len(), 1);
    assert_eq!(gyms.gyms[0].id, "G");

    let outside = scan((11.0, 11.0), (12.0, 12.0), 100, json!([]));
    let found = harness
        .engine
        .scanner()
        .fort_scan(&outside, &harness.cancel)
        .await?;
    assert!(found.gyms.is_empty() && found.pokestops.is_empty());
    assert_eq!(found.examined, 0);
    Ok(())
}

#[tokio::test]
async fn lure_clauses_are_ored() -> anyhow::Result<()> {
    let harness = Harness::new();
    let mut stop = gmo_fort("P", "pokestop", 10.1, 10.1);
    stop["active_fort_modifiers"] = json!([501]);
    harness.send(cell(1, vec![stop.clone()])).await;

    let request = scan(
        (9.0, 9.0),
        (11.0, 11.0),
        0,
        json!([{ "lure_id": [501] }, { "lure_id": [502] }]),
    );
    let scanner = harness.engine.scanner();
    let found = scanner.pokestop_scan(&request, &harness.cancel).await?;
    assert_eq!(ids_of(&found.pokestops), vec!["P".to_string()]);

    stop["active_fort_modifiers"] = json!([503]);
    harness.send(cell(1, vec![stop])).await;
    let found = scanner.pokestop_scan(&request, &harness.cancel).await?;
    assert!(found.pokestops.is_empty());
    assert_eq!(found.examined, 1);
    Ok(())
}

#[tokio::test]
async fn raid_filters_need_an_active_raid() -> anyhow::Result<()> {
    let harness = Harness::new();
    let mut gym = gmo_fort("G", "gym", 10.0, 10.0);
    gym["raid_info"] = json!({
        "raid_level": 5,
        "raid_spawn_ms": NOW * 1000,
        "raid_battle_ms": (NOW + 600) * 1000,
        "raid_end_ms": (NOW + 3300) * 1000,
    });
    harness.send(cell(1, vec![gym])).await;

    let raids = scan((9.0, 9.0), (11.0, 11.0), 0, json!([{ "raid_level": [5] }]));
    let anything = scan((9.0, 9.0), (11.0, 11.0), 0, json!([{}]));
    let scanner = harness.engine.scanner();
    assert_eq!(scanner.gym_scan(&raids, &harness.cancel).await?.gyms.len(), 1);

    harness.advance(3300);
    assert!(scanner.gym_scan(&raids, &harness.cancel).await?.gyms.is_empty());
    assert_eq!(scanner.gym_scan(&anything, &harness.cancel).await?.gyms.len(), 1);
    Ok(())
}

#[tokio::test]
async fn contest_form_null_is_a_wildcard() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .send(cell(1, vec![gmo_fort("P", "pokestop", 10.0, 10.0)]))
        .await;
    harness
        .send(json!({
            "kind": "contest_data",
            "contests": [{
                "contest_id": "P-1700000000",
                "focus_pokemon": { "pokemon_id": 150, "form": 0 },
                "ranking_standard": 1,
                "end_time_ms": 1_700_086_400_000_i64,
            }],
        }))
        .await;

    let scanner = harness.engine.scanner();
    let matches = |form: serde_json::Value| {
        let request = scan(
            (9.0, 9.0),
            (11.0, 11.0),
            0,
            json!([{ "contest_pokemon": [{ "pokemon_id": 150, "form": form }] }]),
        );
        scanner.scan(Some(fortwatch_wire::FortType::Pokestop), &request).ids.len() == 1
    };
    assert!(matches(serde_json::Value::Null));
    assert!(!matches(json!(1)));
    assert!(matches(json!(0)));
    Ok(())
}

#[tokio::test]
async fn one_incident_must_satisfy_the_whole_group() -> anyhow::Result<()> {
    let harness = Harness::new();
    let expiry_ms = (crate::suite::harness::NOW + 3600) * 1000;
    let mut stop = gmo_fort("P", "pokestop", 10.0, 10.0);
    stop["incidents"] = json!([
        {
            "incident_id": "i1",
            "display_type": 1,
            "style": 7,
            "expiration_ms": expiry_ms,
            "slots": [{ "pokemon_id": 10, "form": 0 }],
        },
        {
            "incident_id": "i2",
            "display_type": 2,
            "style": 7,
            "expiration_ms": expiry_ms,
            "slots": [{ "pokemon_id": 25 }],
        },
    ]);
    harness.send(cell(1, vec![stop])).await;

    let scanner = harness.engine.scanner();
    let single = scan(
        (9.0, 9.0),
        (11.0, 11.0),
        0,
        json!([{ "incident_display_type": [1], "incident_slot_1": [{ "pokemon_id": 25 }] }]),
    );
    assert!(scanner.pokestop_scan(&single, &harness.cancel).await?.pokestops.is_empty());

    let either = scan(
        (9.0, 9.0),
        (11.0, 11.0),
        0,
        json!([{ "incident_display_type": [1, 2], "incident_slot_1": [{ "pokemon_id": 25 }] }]),
    );
    let found = scanner.pokestop_scan(&either, &harness.cancel).await?;
    assert_eq!(found.pokestops.len(), 1);
    assert_eq!(found.pokestops[0].incidents.len(), 2);
    Ok(())
}

#[tokio::test]
async fn limit_stops_the_walk_early() -> anyhow::Result<()> {
    let harness = Harness::new();
    let forts = (0..1000)
        .map(|n| {
            let offset = f64::from(n) * 0.0005;
            gmo_fort(&format!("stop-{n:04}"), "pokestop", 10.0 + offset, 10.0 + offset)
        })
        .collect();
    harness.send(cell(1, forts)).await;
    assert_eq!(harness.engine.sizes(), (1000, 1000));

    let request = scan((9.0, 9.0), (11.0, 11.0), 50, json!([]));
    let found = harness
        .engine
        .scanner()
        .pokestop_scan(&request, &harness.cancel)
        .await?;
    assert_eq!(found.pokestops.len(), 50);
    assert!(found.examined >= 50);
    assert!(found.examined < 1000);
    assert_eq!(found.total, 1000);
    Ok(())
}

#[tokio::test]
async fn configured_cap_bounds_every_limit() {
    let mut config = fortwatch_engine::EngineConfig::default();
    config.tuning.max_results = 5;
    let harness = Harness::with_config(config);
    let forts = (0..20)
        .map(|n| gmo_fort(&format!("g{n}"), "gym", 10.0 + f64::from(n) * 0.01, 10.0))
        .collect();
    harness.send(cell(1, forts)).await;

    let scanner = harness.engine.scanner();
    for limit in [0, -1, 100] {
        let request = scan((9.0, 9.0), (11.0, 11.0), limit, json!([]));
        assert_eq!(scanner.scan(None, &request).ids.len(), 5, "limit {limit}");
    }
    let request = scan((9.0, 9.0), (11.0, 11.0), 3, json!([]));
    assert_eq!(scanner.scan(None, &request).ids.len(), 3);
}

#[tokio::test]
async fn fort_scan_shares_one_cap_across_types() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness
        .send(cell(
            1,
            vec![
                gmo_fort("G1", "gym", 10.0, 10.0),
                gmo_fort("P1", "pokestop", 10.2, 10.2),
                gmo_fort("G2", "gym", 10.4, 10.4),
            ],
        ))
        .await;

    let request = scan((9.0, 9.0), (11.0, 11.0), 2, json!([]));
    let found = harness
        .engine
        .scanner()
        .fort_scan(&request, &harness.cancel)
        .await?;
    assert_eq!(found.gyms.len() + found.pokestops.len(), 2);
    assert_eq!(found.total, 3);

    let everything = scan((9.0, 9.0), (11.0, 11.0), 0, json!([]));
    let found = harness
        .engine
        .scanner()
        .fort_scan(&everything, &harness.cancel)
        .await?;
    assert_eq!(found.gyms.len(), 2);
    assert_eq!(ids_of(&found.pokestops), vec!["P1".to_string()]);
    Ok(())
}

#[tokio::test]
async fn scan_results_match_a_brute_force_filter() -> anyhow::Result<()> {
    let harness = Harness::new();
    let forts = (0..60)
        .map(|n| {
            let mut fort = gmo_fort(
                &format!("f{n:02}"),
                if n % 3 == 0 { "gym" } else { "pokestop" },
                9.0 + f64::from(n % 10) * 0.25,
                9.0 + f64::from(n / 10) * 0.4,
            );
            fort["team"] = json!(n % 4);
            fort
        })
        .collect();
    harness.send(cell(1, forts)).await;

    let request = scan((9.5, 9.5), (11.0, 11.0), 0, json!([{ "team_id": [1, 2] }]));
    let mut found = harness.engine.scanner().scan(Some(fortwatch_wire::FortType::Gym), &request).ids;
    found.sort();

    let mut expected = Vec::new();
    for n in 0..60 {
        let (lat, lon) = (9.0 + f64::from(n % 10) * 0.25, 9.0 + f64::from(n / 10) * 0.4);
        let in_box = (9.5..=11.0).contains(&lat) && (9.5..=11.0).contains(&lon);
        if n % 3 == 0 && in_box && matches!(n % 4, 1 | 2) {
            expected.push(format!("f{n:02}"));
        }
    }
    assert_eq!(found, expected);
    Ok(())
}

use fortwatch_engine::Backend;
use fortwatch_engine::EngineConfig;
use fortwatch_engine::FortEngine;
use fortwatch_engine::FortRecord;
use fortwatch_engine::Geofence;
use fortwatch_engine::InMemoryPersistence;
use fortwatch_engine::InMemoryStats;
use fortwatch_engine::PolygonAreaMatcher;
use fortwatch_engine::UpdateOutcome;
use fortwatch_wire::ApiFortScan;
use fortwatch_wire::AreaName;
use fortwatch_wire::InboundMessage;
use fortwatch_wire::Location;
use fortwatch_wire::WebhookMessage;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const NOW: i64 = 1_700_000_000;

/// Engine over in-memory persistence with a settable clock and a drained webhook queue.
pub struct Harness {
    pub engine: FortEngine,
    pub persistence: Arc<InMemoryPersistence>,
    pub stats: Arc<InMemoryStats>,
    pub webhooks: mpsc::Receiver<WebhookMessage>,
    pub clock: Arc<AtomicI64>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), Arc::new(InMemoryPersistence::new()))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, Arc::new(InMemoryPersistence::new()))
    }

    pub fn build(config: EngineConfig, persistence: Arc<InMemoryPersistence>) -> Self {
        let stats = Arc::new(InMemoryStats::new());
        let areas = Arc::new(PolygonAreaMatcher::new(vec![(
            test_area(),
            Geofence::rectangle(Location::new(0.0, 0.0), Location::new(20.0, 20.0)),
        )]));
        let clock = Arc::new(AtomicI64::new(NOW));
        let tick = Arc::clone(&clock);
        let (engine, webhooks) = FortEngine::new(
            &config,
            Backend::in_memory(persistence.clone()),
            areas,
            stats.clone(),
        );
        let engine = engine.with_clock(Arc::new(move || tick.load(Ordering::SeqCst)));
        Self {
            engine,
            persistence,
            stats,
            webhooks,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn send(&self, message: Value) -> Vec<UpdateOutcome> {
        self.try_send(message).await.expect("message applies")
    }

    pub async fn try_send(&self, message: Value) -> fortwatch_engine::Result<Vec<UpdateOutcome>> {
        let message: InboundMessage = serde_json::from_value(message).expect("message parses");
        self.engine.pipeline().handle(message, &self.cancel).await
    }

    pub fn advance(&self, secs: i64) {
        self.clock.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn drain(&mut self) -> Vec<WebhookMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.webhooks.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// `(change_type, fort id)` of every queued webhook, in emission order.
    pub fn changes(&mut self) -> Vec<(String, String)> {
        self.drain()
            .into_iter()
            .map(|message| {
                let change = message.message["change_type"].as_str().unwrap_or_default().to_string();
                let view = if change == "removal" { "old" } else { "new" };
                let id = message.message[view]["id"].as_str().unwrap_or_default().to_string();
                (change, id)
            })
            .collect()
    }

    pub async fn record(&self, id: &str) -> Option<FortRecord> {
        self.engine
            .pipeline()
            .fort(id, &self.cancel)
            .await
            .expect("record reads")
    }
}

pub fn test_area() -> AreaName {
    AreaName::new("Test", "Box")
}

pub fn gmo_fort(id: &str, fort_type: &str, lat: f64, lon: f64) -> Value {
    json!({
        "fort_id": id,
        "fort_type": fort_type,
        "latitude": lat,
        "longitude": lon,
        "enabled": true,
        "last_modified_ms": NOW * 1000,
    })
}

pub fn cell(cell_id: u64, forts: Vec<Value>) -> Value {
    json!({ "kind": "map_cell", "cell_id": cell_id, "forts": forts })
}

pub fn details(id: &str, fort_type: &str, name: &str, lat: f64, lon: f64) -> Value {
    json!({
        "kind": "fort_details",
        "id": id,
        "fort_type": fort_type,
        "name": name,
        "latitude": lat,
        "longitude": lon,
    })
}

pub fn map_fort(id: &str, name: &str, lat: f64, lon: f64) -> Value {
    json!({
        "kind": "map_fort",
        "id": id,
        "name": name,
        "latitude": lat,
        "longitude": lon,
        "image_url": "https://img.example/forts/fountain.png",
    })
}

pub fn scan(min: (f64, f64), max: (f64, f64), limit: i64, filters: Value) -> ApiFortScan {
    serde_json::from_value(json!({
        "min": { "lat": min.0, "lon": min.1 },
        "max": { "lat": max.0, "lon": max.1 },
        "limit": limit,
        "filters": filters,
    }))
    .expect("scan request parses")
}

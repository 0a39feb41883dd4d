/*!
# fortwatch engine

Keeps gyms and pokestops current from decoded game messages and answers filtered
bounding-box scans over them.

- **Record store**: per-id locked records loaded lazily from a [`persistence::Persistence`] backend
- **Spatial index + attribute cache**: scans never touch record locks while matching
- **Change notifier**: new/edit/removal webhooks tagged with areas
- **Ambiguity cache**: map forts that arrive before anything classified them

## Example

```rust,no_run
use fortwatch_engine::Backend;
use fortwatch_engine::EngineConfig;
use fortwatch_engine::FortEngine;
use fortwatch_engine::InMemoryPersistence;
use fortwatch_wire::ApiFortScan;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> fortwatch_engine::Result<()> {
    let backend = Backend::in_memory(Arc::new(InMemoryPersistence::new()));
    let (engine, _webhooks) = FortEngine::from_config(&EngineConfig::default(), backend);
    let cancel = CancellationToken::new();
    let found = engine.scanner().fort_scan(&ApiFortScan::default(), &cancel).await?;
    println!("{} gyms, {} pokestops", found.gyms.len(), found.pokestops.len());
    Ok(())
}
```
*/

pub mod ambiguity;
pub mod areas;
pub mod config;
pub mod dnf;
mod error;
pub mod geofence;
pub mod lookup;
pub mod notifier;
pub mod persistence;
pub mod pipeline;
pub mod records;
pub mod scan;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod webhooks;

pub use areas::AreaMatcher;
pub use areas::NoAreas;
pub use areas::PolygonAreaMatcher;
pub use config::EngineConfig;
pub use error::EngineError;
pub use error::Result;
pub use geofence::Geofence;
pub use persistence::Backend;
pub use persistence::InMemoryPersistence;
pub use pipeline::UpdateOutcome;
pub use pipeline::UpdatePipeline;
pub use pipeline::UpdateStatus;
pub use records::FortRecord;
pub use scan::FortScanner;
pub use stats::InMemoryStats;
pub use stats::NoopStats;
pub use stats::StatsCollector;
pub use webhooks::WebhookCollector;
pub use webhooks::WebhookSender;
pub use webhooks::WebhookTransport;

use ambiguity::AmbiguityCache;
use fortwatch_spatial::FortIndex;
use fortwatch_wire::WebhookMessage;
use lookup::LookupCache;
use notifier::ChangeNotifier;
use pipeline::PipelineParts;
use std::sync::Arc;
use store::RecordStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracker::FortTracker;

/// Every component of the query core wired around one index and one set of stores.
pub struct FortEngine {
    pipeline: UpdatePipeline,
    scanner: FortScanner,
    index: Arc<FortIndex>,
    lookups: Arc<LookupCache>,
}

impl FortEngine {
    /// Builds the engine. The returned receiver feeds a [`WebhookSender`].
    pub fn new(
        config: &EngineConfig,
        backend: Backend,
        areas: Arc<dyn AreaMatcher>,
        stats: Arc<dyn StatsCollector>,
    ) -> (Self, mpsc::Receiver<WebhookMessage>) {
        let tuning = &config.tuning;
        let index = Arc::new(FortIndex::new());
        let lookups = Arc::new(LookupCache::new());
        let forts = Arc::new(RecordStore::new(backend.forts));
        let stations = Arc::new(RecordStore::new(backend.stations));
        let (collector, receiver) = WebhookCollector::channel(tuning.webhook_queue_capacity);

        let tracker = (tuning.stale_fort_threshold_secs > 0)
            .then(|| FortTracker::new(tuning.stale_fort_threshold_secs));
        let pipeline = UpdatePipeline::new(PipelineParts {
            forts: forts.clone(),
            stations,
            index: index.clone(),
            lookups: lookups.clone(),
            queries: backend.queries,
            ambiguity: AmbiguityCache::new(tuning.ambiguity_ttl()),
            notifier: ChangeNotifier::new(areas, stats.clone(), collector),
            stats,
            tracker,
            lure_duration: tuning.lure_duration_secs,
        });
        let scanner = FortScanner::new(index.clone(), lookups.clone(), forts, tuning.max_results);

        (
            Self {
                pipeline,
                scanner,
                index,
                lookups,
            },
            receiver,
        )
    }

    /// Areas come from the configured fences; stats are discarded.
    pub fn from_config(
        config: &EngineConfig,
        backend: Backend,
    ) -> (Self, mpsc::Receiver<WebhookMessage>) {
        let areas: Arc<dyn AreaMatcher> = if config.areas.is_empty() {
            Arc::new(NoAreas)
        } else {
            Arc::new(PolygonAreaMatcher::from_config(&config.areas))
        };
        Self::new(config, backend, areas, Arc::new(NoopStats))
    }

    pub fn pipeline(&self) -> &UpdatePipeline {
        &self.pipeline
    }

    /// Replaces the pipeline and scanner clock, in seconds since the epoch.
    pub fn with_clock(mut self, clock: pipeline::Clock) -> Self {
        self.scanner = self.scanner.with_clock(Arc::clone(&clock));
        self.pipeline = self.pipeline.with_clock(clock);
        self
    }

    pub fn scanner(&self) -> &FortScanner {
        &self.scanner
    }

    /// `(indexed forts, cached lookups)`.
    pub fn sizes(&self) -> (usize, usize) {
        (self.index.len(), self.lookups.len())
    }
}

/// Starts delivering webhooks to the configured destinations.
pub fn spawn_webhook_sender(
    config: &EngineConfig,
    transport: Arc<dyn WebhookTransport>,
    receiver: mpsc::Receiver<WebhookMessage>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    WebhookSender::new(&config.webhooks, transport).spawn(
        receiver,
        config.tuning.webhook_flush_interval(),
        shutdown,
    )
}

//! Merges inbound protocol messages into fort records.
//!
//! Every mutation happens under the record store's write handle for the fort id and is
//! published in a fixed order: persist, refresh the lookup cache, re-index, notify. A
//! failed or cancelled save still leaves the cache and the index reflecting the in-memory
//! record, but nothing is notified.

use crate::ambiguity::AmbiguityCache;
use crate::error::EngineError;
use crate::error::Result;
use crate::geofence::Geofence;
use crate::lookup::LookupCache;
use crate::notifier::ChangeNotifier;
use crate::persistence::FortQueries;
use crate::records::FortRecord;
use crate::records::Station;
use crate::stats::StatsCollector;
use crate::store::RecordStore;
use crate::store::WriteHandle;
use crate::tracker::FortTracker;
use fortwatch_spatial::FortIndex;
use fortwatch_wire::ApiStationResult;
use fortwatch_wire::ChangeType;
use fortwatch_wire::FortType;
use fortwatch_wire::FortWebhook;
use fortwatch_wire::InboundMessage;
use fortwatch_wire::QuestLocation;
use fortwatch_wire::QuestStatus;
use fortwatch_wire::inbound::ContestData;
use fortwatch_wire::inbound::FortDetails;
use fortwatch_wire::inbound::FortSearch;
use fortwatch_wire::inbound::MapCell;
use fortwatch_wire::inbound::MapFort;
use fortwatch_wire::inbound::PokemonFort;
use fortwatch_wire::inbound::SizeLeaderboard;
use fortwatch_wire::inbound::StationDetails;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    Updated,
    Created,
    /// Unclassified map fort held in the ambiguity cache.
    Buffered,
    NotFound,
    /// Fort search without a challenge quest.
    Blank,
    Skipped,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub fort_id: String,
    pub status: UpdateStatus,
    pub detail: String,
}

impl UpdateOutcome {
    fn new(fort_id: &str, status: UpdateStatus, detail: impl Into<String>) -> Self {
        Self {
            fort_id: fort_id.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}: {}", self.fort_id, self.status, self.detail)
    }
}

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// View of a record before a mutation, used to pick the change type.
struct Prior {
    view: FortWebhook,
    deleted: bool,
}

impl Prior {
    fn of(handle: &WriteHandle<FortRecord>) -> Option<Self> {
        (!handle.is_new()).then(|| Self {
            view: handle.record().webhook_view(),
            deleted: handle.record().is_deleted(),
        })
    }
}

pub struct UpdatePipeline {
    forts: Arc<RecordStore<FortRecord>>,
    stations: Arc<RecordStore<Station>>,
    index: Arc<FortIndex>,
    lookups: Arc<LookupCache>,
    queries: Arc<dyn FortQueries>,
    ambiguity: AmbiguityCache,
    notifier: ChangeNotifier,
    stats: Arc<dyn StatsCollector>,
    tracker: Option<FortTracker>,
    lure_duration: i64,
    clock: Clock,
}

pub struct PipelineParts {
    pub forts: Arc<RecordStore<FortRecord>>,
    pub stations: Arc<RecordStore<Station>>,
    pub index: Arc<FortIndex>,
    pub lookups: Arc<LookupCache>,
    pub queries: Arc<dyn FortQueries>,
    pub ambiguity: AmbiguityCache,
    pub notifier: ChangeNotifier,
    pub stats: Arc<dyn StatsCollector>,
    pub tracker: Option<FortTracker>,
    pub lure_duration: i64,
}

impl UpdatePipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            forts: parts.forts,
            stations: parts.stations,
            index: parts.index,
            lookups: parts.lookups,
            queries: parts.queries,
            ambiguity: parts.ambiguity,
            notifier: parts.notifier,
            stats: parts.stats,
            tracker: parts.tracker,
            lure_duration: parts.lure_duration,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }

    /// Replaces the wall clock, in seconds since the epoch.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    pub async fn handle(
        &self,
        message: InboundMessage,
        cancel: &CancellationToken,
    ) -> Result<Vec<UpdateOutcome>> {
        let outcomes = match message {
            InboundMessage::FortDetails(details) => vec![self.fort_details(&details, cancel).await?],
            InboundMessage::MapFort(fort) => vec![self.map_fort(fort, cancel).await?],
            InboundMessage::MapCell(cell) => self.map_cell(&cell, cancel).await?,
            InboundMessage::FortSearch(search) => vec![self.fort_search(&search, cancel).await?],
            InboundMessage::ContestData(data) => vec![self.contest_data(&data, cancel).await?],
            InboundMessage::SizeLeaderboard(board) => {
                vec![self.size_leaderboard(&board, cancel).await?]
            }
            InboundMessage::Station(details) => vec![self.station_details(&details, cancel).await?],
            InboundMessage::FortRemoval(removal) => {
                vec![self.remove_fort(&removal.fort_id, cancel).await?]
            }
        };
        for outcome in &outcomes {
            debug!("{outcome}");
        }
        Ok(outcomes)
    }

    /// Fort details classify the id; any buffered map fort is merged underneath them.
    pub async fn fort_details(
        &self,
        details: &FortDetails,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let Some(fort_type) = details.fort_type else {
            return Ok(UpdateOutcome::new(&details.id, UpdateStatus::Skipped, "unknown fort type"));
        };
        ensure_finite(&details.id, details.latitude, details.longitude)?;
        let now = self.now();
        let mut handle = self
            .forts
            .get_or_create(&details.id, cancel, || FortRecord::empty(&details.id, fort_type))
            .await?;
        let prior = Prior::of(&handle);
        let replaced = reclassify(&mut handle, fort_type);
        self.undelete(&mut handle, now);
        self.apply_buffered(&mut handle, now);

        let lure_duration = self.lure_duration;
        match handle.record_mut() {
            FortRecord::Gym(gym) => gym.common.apply_details(details, now),
            FortRecord::Pokestop(stop) => stop.apply_details(details, now, lure_duration),
        }
        share_identity(&mut handle, replaced.as_ref());

        let status = creation_status(&handle);
        self.commit(&handle, prior, cancel).await?;
        Ok(UpdateOutcome::new(
            &details.id,
            status,
            format!("{fort_type} {}", details.name),
        ))
    }

    /// Map forts carry no type: merge into a known record or buffer until one classifies it.
    pub async fn map_fort(&self, fort: MapFort, cancel: &CancellationToken) -> Result<UpdateOutcome> {
        ensure_finite(&fort.id, fort.latitude, fort.longitude)?;
        let Some(mut handle) = self.forts.for_update(&fort.id, cancel).await? else {
            let id = fort.id.clone();
            self.ambiguity.insert(fort);
            debug!("buffered unclassified map fort {id}");
            return Ok(UpdateOutcome::new(&id, UpdateStatus::Buffered, "awaiting classification"));
        };
        let prior = Prior::of(&handle);
        let now = self.now();
        handle.record_mut().common_mut().apply_map_fort(&fort, now);
        self.commit(&handle, prior, cancel).await?;
        let fort_type = handle.record().fort_type();
        Ok(UpdateOutcome::new(
            &fort.id,
            UpdateStatus::Updated,
            format!("{fort_type} {}", fort.name),
        ))
    }

    /// Merges every fort of one cell, then removes forts the cell stopped reporting.
    pub async fn map_cell(&self, cell: &MapCell, cancel: &CancellationToken) -> Result<Vec<UpdateOutcome>> {
        let mut outcomes = Vec::with_capacity(cell.forts.len());
        let mut seen = Vec::with_capacity(cell.forts.len());
        for fort in &cell.forts {
            if let Err(err) = ensure_finite(&fort.fort_id, fort.latitude, fort.longitude) {
                warn!("skipping map object: {err}");
                outcomes.push(UpdateOutcome::new(&fort.fort_id, UpdateStatus::Skipped, err.to_string()));
                continue;
            }
            let outcome = self.map_object(fort, cell.cell_id, cancel).await;
            outcomes.push(per_fort(&fort.fort_id, outcome)?);
            seen.push(fort.fort_id.clone());
        }

        if let Some(tracker) = &self.tracker {
            for id in tracker.process_cell(cell.cell_id, &seen, self.now()) {
                info!("fort {id} missing from cell {} past the stale threshold", cell.cell_id);
                let outcome = self.remove_fort(&id, cancel).await;
                outcomes.push(per_fort(&id, outcome)?);
            }
        }
        Ok(outcomes)
    }

    async fn map_object(
        &self,
        fort: &PokemonFort,
        cell_id: u64,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let now = self.now();
        let mut handle = self
            .forts
            .get_or_create(&fort.fort_id, cancel, || {
                FortRecord::empty(&fort.fort_id, fort.fort_type)
            })
            .await?;
        let prior = Prior::of(&handle);
        let replaced = reclassify(&mut handle, fort.fort_type);
        self.undelete(&mut handle, now);
        self.apply_buffered(&mut handle, now);

        let lure_duration = self.lure_duration;
        match handle.record_mut() {
            FortRecord::Gym(gym) => gym.apply_map_object(fort, cell_id, now),
            FortRecord::Pokestop(stop) => stop.apply_map_object(fort, cell_id, now, lure_duration),
        }
        share_identity(&mut handle, replaced.as_ref());

        let status = creation_status(&handle);
        self.commit(&handle, prior, cancel).await?;
        Ok(UpdateOutcome::new(
            &fort.fort_id,
            status,
            format!("{} in cell {cell_id}", fort.fort_type),
        ))
    }

    pub async fn fort_search(
        &self,
        search: &FortSearch,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let Some(quest) = &search.challenge_quest else {
            self.stats.decode_quest("blank");
            return Ok(UpdateOutcome::new(&search.fort_id, UpdateStatus::Blank, "blank quest"));
        };
        let Some(mut handle) = self.forts.for_update(&search.fort_id, cancel).await? else {
            return Ok(not_found(&search.fort_id));
        };
        let prior = Prior::of(&handle);
        let now = self.now();
        let Some(stop) = handle.record_mut().as_pokestop_mut() else {
            return Ok(UpdateOutcome::new(&search.fort_id, UpdateStatus::Skipped, "not a pokestop"));
        };
        stop.apply_quest(quest, search.have_ar, now)?;
        self.commit(&handle, prior, cancel).await?;
        self.stats.decode_quest(if search.have_ar { "ar" } else { "no_ar" });
        Ok(UpdateOutcome::new(
            &search.fort_id,
            UpdateStatus::Updated,
            format!("quest {} (ar: {})", quest.template_id.to_lowercase(), search.have_ar),
        ))
    }

    /// One contest per message; the fort comes from the request or the contest id prefix.
    pub async fn contest_data(
        &self,
        data: &ContestData,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let contest = match data.contests.as_slice() {
            [contest] => contest,
            [] => {
                let id = data.fort_id.clone().unwrap_or_default();
                return Ok(UpdateOutcome::new(&id, UpdateStatus::Skipped, "no contest"));
            }
            contests => {
                return Err(EngineError::malformed(format!(
                    "expected one contest, got {}",
                    contests.len()
                )));
            }
        };
        let fort_id = data
            .fort_id
            .clone()
            .unwrap_or_else(|| fort_id_from_contest(&contest.contest_id).to_string());
        let Some(mut handle) = self.forts.for_update(&fort_id, cancel).await? else {
            return Ok(not_found(&fort_id));
        };
        let prior = Prior::of(&handle);
        let now = self.now();
        let Some(stop) = handle.record_mut().as_pokestop_mut() else {
            return Ok(UpdateOutcome::new(&fort_id, UpdateStatus::Skipped, "not a pokestop"));
        };
        stop.apply_contest(contest, now);
        self.commit(&handle, prior, cancel).await?;
        Ok(UpdateOutcome::new(
            &fort_id,
            UpdateStatus::Updated,
            format!("contest {}", contest.contest_id),
        ))
    }

    pub async fn size_leaderboard(
        &self,
        board: &SizeLeaderboard,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let fort_id = fort_id_from_contest(&board.contest_id);
        let Some(mut handle) = self.forts.for_update(fort_id, cancel).await? else {
            return Ok(not_found(fort_id));
        };
        let prior = Prior::of(&handle);
        let now = self.now();
        let Some(stop) = handle.record_mut().as_pokestop_mut() else {
            return Ok(UpdateOutcome::new(fort_id, UpdateStatus::Skipped, "not a pokestop"));
        };
        stop.apply_leaderboard(board, now)?;
        self.commit(&handle, prior, cancel).await?;
        Ok(UpdateOutcome::new(
            fort_id,
            UpdateStatus::Updated,
            format!("leaderboard with {} entries", board.total_entries),
        ))
    }

    pub async fn station_details(
        &self,
        details: &StationDetails,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        let now = self.now();
        let mut handle = self
            .stations
            .get_or_create(&details.id, cancel, || Station::new(&details.id))
            .await?;
        handle.record_mut().apply_details(details, now)?;
        handle.save(cancel).await?;
        let status = if handle.is_new() {
            UpdateStatus::Created
        } else {
            UpdateStatus::Updated
        };
        Ok(UpdateOutcome::new(&details.id, status, format!("station {}", details.name)))
    }

    pub async fn station(&self, id: &str, cancel: &CancellationToken) -> Result<Option<ApiStationResult>> {
        let handle = self.stations.read_only(id, cancel).await?;
        Ok(handle.record().map(Station::to_api))
    }

    /// Current record for `id`, including tombstones.
    pub async fn fort(&self, id: &str, cancel: &CancellationToken) -> Result<Option<FortRecord>> {
        let handle = self.forts.read_only(id, cancel).await?;
        Ok(handle.record().cloned())
    }

    /// Deletes the persisted row, then tombstones the fort, evicts it from the index and
    /// the lookup cache and notifies the removal. A failed delete leaves the fort live so a
    /// retry can complete it.
    pub async fn remove_fort(&self, id: &str, cancel: &CancellationToken) -> Result<UpdateOutcome> {
        self.ambiguity.remove(id);
        let Some(mut handle) = self.forts.for_update(id, cancel).await? else {
            self.evict(id);
            return Ok(not_found(id));
        };
        if handle.record().is_deleted() {
            self.evict(id);
            return Ok(UpdateOutcome::new(id, UpdateStatus::Skipped, "already removed"));
        }
        if let Err(err) = handle.remove(cancel).await {
            warn!("fort {id} not removed: {err}");
            return Err(err);
        }

        let before = handle.record().webhook_view();
        let now = self.now();
        let common = handle.record_mut().common_mut();
        common.deleted = true;
        common.updated = now;
        self.evict(id);
        self.notifier.notify(Some(&before), None, ChangeType::Removal);
        Ok(UpdateOutcome::new(id, UpdateStatus::Removed, before.fort_type.to_string()))
    }

    /// Clears quests of every pokestop inside `fence`, in persistence and in memory.
    pub async fn clear_quests(&self, fence: &Geofence, cancel: &CancellationToken) -> Result<u64> {
        let cleared = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            cleared = self.queries.remove_quests_within(fence) => cleared?,
        };
        let Some(area) = fence.bounding_box() else {
            return Ok(cleared);
        };
        let mut candidates = Vec::new();
        self.index.snapshot().search(&area, |id| {
            if self.lookups.with(id, |lookup| lookup.fort_type) == Some(FortType::Pokestop) {
                candidates.push(id.to_string());
            }
            true
        });
        for id in candidates {
            let Some(mut handle) = self.forts.for_update(&id, cancel).await? else {
                continue;
            };
            let record = handle.record_mut();
            if !record.is_deleted()
                && fence.contains(record.common().location())
                && let Some(stop) = record.as_pokestop_mut()
                && stop.clear_quests()
            {
                self.lookups.store(&id, handle.record().lookup());
            }
        }
        info!("cleared quests of {cleared} pokestops");
        Ok(cleared)
    }

    pub async fn quest_status(&self, fence: &Geofence, cancel: &CancellationToken) -> Result<QuestStatus> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            status = self.queries.quest_status(fence) => status,
        }
    }

    pub async fn pokestop_positions(
        &self,
        fence: &Geofence,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestLocation>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            positions = self.queries.pokestop_positions(fence) => positions,
        }
    }

    /// Indexes records that already exist in persistence, skipping tombstones.
    pub fn preload(&self, records: impl IntoIterator<Item = FortRecord>) -> Result<usize> {
        let mut indexed = 0;
        for record in records {
            if record.is_deleted() {
                continue;
            }
            let location = record.common().location();
            self.lookups.store(record.id(), record.lookup());
            self.index.insert(record.id(), location.lon, location.lat)?;
            indexed += 1;
        }
        info!("preloaded {indexed} forts");
        Ok(indexed)
    }

    /// Number of unclassified map forts waiting; expired ones are purged first.
    pub fn pending_classifications(&self) -> usize {
        self.ambiguity.purge_expired();
        self.ambiguity.len()
    }

    fn apply_buffered(&self, handle: &mut WriteHandle<FortRecord>, now: i64) {
        if let Some(fort) = self.ambiguity.take(handle.id()) {
            debug!("applying buffered map fort to {}", handle.id());
            handle.record_mut().common_mut().apply_map_fort(&fort, now);
        }
    }

    fn undelete(&self, handle: &mut WriteHandle<FortRecord>, now: i64) {
        let common = handle.record_mut().common_mut();
        if !common.deleted {
            return;
        }
        common.deleted = false;
        info!("fort {} seen again, restoring it", common.id);
        if let (Some(tracker), Some(cell_id)) = (&self.tracker, common.cell_id) {
            tracker.restore_fort(&common.id, cell_id, now);
        }
    }

    fn evict(&self, id: &str) {
        self.index.remove(id);
        self.lookups.delete(id);
        if let Some(tracker) = &self.tracker {
            tracker.remove_fort(id);
        }
    }

    /// Persist, refresh the lookup cache and the index, then notify.
    async fn commit(
        &self,
        handle: &WriteHandle<FortRecord>,
        prior: Option<Prior>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let saved = handle.save(cancel).await;
        let record = handle.record();
        if record.is_deleted() {
            return saved;
        }
        self.lookups.store(handle.id(), record.lookup());
        let location = record.common().location();
        self.index.insert(handle.id(), location.lon, location.lat)?;
        if let Err(err) = saved {
            warn!("fort {} not persisted: {err}", handle.id());
            return Err(err);
        }

        let after = record.webhook_view();
        match prior {
            Some(prior) if !prior.deleted && prior.view.fort_type == after.fort_type => {
                self.notifier
                    .notify(Some(&prior.view), Some(&after), ChangeType::Edit);
            }
            Some(prior) if !prior.deleted => {
                self.notifier.notify(Some(&prior.view), None, ChangeType::Removal);
                self.notifier.notify(None, Some(&after), ChangeType::New);
            }
            _ => {
                self.notifier.notify(None, Some(&after), ChangeType::New);
            }
        }
        Ok(())
    }
}

/// Swaps the record for an empty one of `target` when the type differs, returning the old.
fn reclassify(handle: &mut WriteHandle<FortRecord>, target: FortType) -> Option<FortRecord> {
    let current = handle.record().fort_type();
    if current == target {
        return None;
    }
    info!("fort {} reclassified from {current} to {target}", handle.id());
    let fresh = FortRecord::empty(handle.id(), target);
    Some(handle.replace(fresh))
}

fn share_identity(handle: &mut WriteHandle<FortRecord>, replaced: Option<&FortRecord>) {
    if let Some(old) = replaced {
        handle.record_mut().common_mut().share_from(old.common());
    }
}

fn creation_status(handle: &WriteHandle<FortRecord>) -> UpdateStatus {
    if handle.is_new() {
        UpdateStatus::Created
    } else {
        UpdateStatus::Updated
    }
}

/// Turns a per-fort failure into a skipped outcome so the rest of a batch proceeds.
/// Cancellation still aborts the batch.
fn per_fort(id: &str, outcome: Result<UpdateOutcome>) -> Result<UpdateOutcome> {
    match outcome {
        Err(err) if !err.is_cancelled() => {
            warn!("fort {id} failed: {err}");
            Ok(UpdateOutcome::new(id, UpdateStatus::Skipped, err.to_string()))
        }
        outcome => outcome,
    }
}

fn not_found(id: &str) -> UpdateOutcome {
    UpdateOutcome::new(id, UpdateStatus::NotFound, "fort not found")
}

fn ensure_finite(id: &str, lat: f64, lon: f64) -> Result<()> {
    if lat.is_finite() && lon.is_finite() {
        Ok(())
    } else {
        Err(EngineError::malformed(format!("{id} has non-finite position ({lat}, {lon})")))
    }
}

/// Contest ids look like `<fort id>-<suffix>`.
fn fort_id_from_contest(contest_id: &str) -> &str {
    contest_id
        .split_once('-')
        .map_or(contest_id, |(fort_id, _)| fort_id)
}

//! Bounding-box scans over an index snapshot.
//!
//! Matching runs against the attribute cache only; record locks are taken afterwards, one
//! id at a time, to build presentation records.

use crate::dnf;
use crate::error::Result;
use crate::lookup::LookupCache;
use crate::pipeline::Clock;
use crate::records::FortRecord;
use crate::store::RecordStore;
use fortwatch_spatial::BoundingBox;
use fortwatch_spatial::FortIndex;
use fortwatch_wire::ApiFortScan;
use fortwatch_wire::ApiGymResult;
use fortwatch_wire::ApiPokestopResult;
use fortwatch_wire::FortScanResponse;
use fortwatch_wire::FortType;
use fortwatch_wire::GymScanResponse;
use fortwatch_wire::PokestopScanResponse;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub ids: Vec<String>,
    /// Ids visited inside the box.
    pub examined: usize,
    /// Visited ids with no cached lookup.
    pub skipped: usize,
    /// Size of the snapshot the scan ran against.
    pub total: usize,
}

pub struct FortScanner {
    index: Arc<FortIndex>,
    lookups: Arc<LookupCache>,
    forts: Arc<RecordStore<FortRecord>>,
    max_results: usize,
    clock: Clock,
}

impl FortScanner {
    pub fn new(
        index: Arc<FortIndex>,
        lookups: Arc<LookupCache>,
        forts: Arc<RecordStore<FortRecord>>,
        max_results: usize,
    ) -> Self {
        Self {
            index,
            lookups,
            forts,
            max_results,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }

    /// Replaces the clock raid filters are evaluated against.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// `min(limit, max_results)`, where `limit <= 0` means the configured cap.
    pub fn effective_limit(&self, limit: i64) -> usize {
        match usize::try_from(limit) {
            Ok(limit) if limit > 0 => limit.min(self.max_results),
            _ => self.max_results,
        }
    }

    /// Matches ids of `fort_type` (or of either type when `None`) inside the request box.
    pub fn scan(&self, fort_type: Option<FortType>, request: &ApiFortScan) -> ScanResult {
        let snapshot = self.index.snapshot();
        let mut result = ScanResult {
            total: snapshot.len(),
            ..Default::default()
        };
        let cap = self.effective_limit(request.limit);
        if cap == 0 {
            return result;
        }
        let now = (self.clock)();
        let area = BoundingBox::new(
            request.min.lon,
            request.min.lat,
            request.max.lon,
            request.max.lat,
        );

        snapshot.search(&area, |id| {
            result.examined += 1;
            let matched = self.lookups.with(id, |lookup| {
                let requested = fort_type.unwrap_or(lookup.fort_type);
                dnf::matches(requested, lookup, &request.filters, now)
            });
            match matched {
                None => result.skipped += 1,
                Some(true) => result.ids.push(id.to_string()),
                Some(false) => {}
            }
            result.ids.len() < cap
        });

        debug!(
            "scan {fort_type:?}: {} matched, {} examined, {} skipped of {}",
            result.ids.len(),
            result.examined,
            result.skipped,
            result.total
        );
        result
    }

    pub async fn gym_scan(
        &self,
        request: &ApiFortScan,
        cancel: &CancellationToken,
    ) -> Result<GymScanResponse> {
        let scan = self.scan(Some(FortType::Gym), request);
        let (gyms, _) = self.materialise(&scan.ids, cancel).await?;
        Ok(GymScanResponse {
            gyms,
            examined: scan.examined,
            skipped: scan.skipped,
            total: scan.total,
        })
    }

    pub async fn pokestop_scan(
        &self,
        request: &ApiFortScan,
        cancel: &CancellationToken,
    ) -> Result<PokestopScanResponse> {
        let scan = self.scan(Some(FortType::Pokestop), request);
        let (_, pokestops) = self.materialise(&scan.ids, cancel).await?;
        Ok(PokestopScanResponse {
            pokestops,
            examined: scan.examined,
            skipped: scan.skipped,
            total: scan.total,
        })
    }

    /// Both types in one pass sharing one cap.
    pub async fn fort_scan(
        &self,
        request: &ApiFortScan,
        cancel: &CancellationToken,
    ) -> Result<FortScanResponse> {
        let scan = self.scan(None, request);
        let (gyms, pokestops) = self.materialise(&scan.ids, cancel).await?;
        Ok(FortScanResponse {
            gyms,
            pokestops,
            examined: scan.examined,
            skipped: scan.skipped,
            total: scan.total,
        })
    }

    /// Projects ids through read handles. Ids removed since the scan are omitted.
    async fn materialise(
        &self,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<(Vec<ApiGymResult>, Vec<ApiPokestopResult>)> {
        let mut gyms = Vec::new();
        let mut pokestops = Vec::new();
        for id in ids {
            let handle = self.forts.read_only(id, cancel).await?;
            match handle.record() {
                Some(FortRecord::Gym(gym)) if !gym.common.deleted => gyms.push(gym.to_api()),
                Some(FortRecord::Pokestop(stop)) if !stop.common.deleted => {
                    pokestops.push(stop.to_api())
                }
                _ => debug!("scan result {id} vanished before materialisation"),
            }
        }
        Ok((gyms, pokestops))
    }
}

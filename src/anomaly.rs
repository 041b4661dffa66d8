/// Inter-reading speed estimation and anomaly detection.
///
/// Two consecutive reads of the same vehicle on the same road give a travel
/// distance (difference of kilometer points) and an elapsed time, hence an
/// estimated speed. Vehicles whose estimated speed exceeds the configured
/// threshold are flagged as anomalies — a proxy signal for fleeing or
/// non-standard movements.
///
/// Two deliberate scope limits carried over from the reference behavior:
///
/// - Only *adjacent* pairs within a plate's timeline are compared. A vehicle
///   that leaves the monitored road via an untracked detour between two
///   monitored points is not evaluated against the earlier point.
/// - When several pairs of one plate exceed the threshold, the *last* one
///   wins; earlier exceedances are overwritten.

use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use tracing::debug;

use crate::analysis::groupings::group_by_plate;
use crate::location::{extract_from_reader_id, parse_kilometer_point, parse_road_code};
use crate::model::{Read, SourceType, SpeedObservation};
use crate::roads::CircularRoads;

/// Default flagging threshold in km/h.
pub const DEFAULT_SPEED_THRESHOLD_KMH: f64 = 140.0;

// ---------------------------------------------------------------------------
// Filters and diagnostics
// ---------------------------------------------------------------------------

/// Optional pre-filters applied before pairing. Each bound is independent
/// and inclusive; the road filter compares normalized road codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub time_from: Option<NaiveTime>,
    pub time_to: Option<NaiveTime>,
    pub road: Option<String>,
}

/// Diagnostic counters for one detection run. Unmeasurable pairs reduce the
/// output silently, never error; these counters let operators notice
/// data-quality problems instead of just missing rows in the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionStats {
    /// Reads dropped by the pre-filters, GPS exclusion, or a missing
    /// timestamp.
    pub reads_filtered: usize,
    /// Plates with fewer than two surviving reads.
    pub singleton_plates: usize,
    /// Pairs where a kilometer point would not resolve.
    pub pairs_missing_km: usize,
    /// Pairs where a road code would not resolve on one side.
    pub pairs_unresolved_road: usize,
    /// Pairs whose resolved road codes differ.
    pub pairs_road_mismatch: usize,
    /// Pairs with zero elapsed time.
    pub pairs_zero_elapsed: usize,
    /// Pairs that produced a speed observation (flagged or not).
    pub pairs_evaluated: usize,
}

impl DetectionStats {
    fn absorb(&mut self, other: &DetectionStats) {
        self.reads_filtered += other.reads_filtered;
        self.singleton_plates += other.singleton_plates;
        self.pairs_missing_km += other.pairs_missing_km;
        self.pairs_unresolved_road += other.pairs_unresolved_road;
        self.pairs_road_mismatch += other.pairs_road_mismatch;
        self.pairs_zero_elapsed += other.pairs_zero_elapsed;
        self.pairs_evaluated += other.pairs_evaluated;
    }
}

/// Result of one detection run: flagged observations (one per plate, last
/// exceedance wins, in plate order) plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub observations: Vec<SpeedObservation>,
    pub stats: DetectionStats,
}

// ---------------------------------------------------------------------------
// Per-read location resolution
// ---------------------------------------------------------------------------

/// Kilometer point of a read: the structured field when present, otherwise
/// recovered from the reader id. A present-but-unparseable structured field
/// does NOT fall back — that mirrors the reference resolution order.
pub fn resolve_kilometer_point(read: &Read) -> Option<f64> {
    match read.km_point_raw.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_kilometer_point(raw),
        None => read
            .reader_id
            .as_deref()
            .and_then(|id| extract_from_reader_id(id).km_point),
    }
}

/// Normalized road code of a read, with the same structured-field-first
/// resolution order as `resolve_kilometer_point`.
pub fn resolve_road_code(read: &Read) -> Option<String> {
    match read.road.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(parse_road_code(raw)),
        None => read
            .reader_id
            .as_deref()
            .and_then(|id| extract_from_reader_id(id).road)
            .map(|road| parse_road_code(&road)),
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

enum PairSkip {
    MissingTimestamp,
    MissingKilometerPoint,
    UnresolvedRoad,
    RoadMismatch,
    ZeroElapsed,
}

#[derive(Debug, Clone)]
pub struct SpeedAnomalyDetector {
    threshold_kmh: f64,
    circular: CircularRoads,
}

impl Default for SpeedAnomalyDetector {
    /// 140 km/h threshold with the seed ring-road registry.
    fn default() -> Self {
        SpeedAnomalyDetector::new(DEFAULT_SPEED_THRESHOLD_KMH, CircularRoads::seed())
    }
}

impl SpeedAnomalyDetector {
    pub fn new(threshold_kmh: f64, circular: CircularRoads) -> Self {
        SpeedAnomalyDetector {
            threshold_kmh,
            circular,
        }
    }

    pub fn threshold_kmh(&self) -> f64 {
        self.threshold_kmh
    }

    /// Estimates the travel speed between two reads of one vehicle.
    ///
    /// Returns `None` (never an error) when the pair is unmeasurable: a
    /// kilometer point or road code fails to resolve, the road codes
    /// differ, or the elapsed time is zero.
    pub fn compute_speed(&self, read1: &Read, read2: &Read) -> Option<SpeedObservation> {
        self.evaluate_pair(read1, read2).ok()
    }

    fn evaluate_pair(&self, read1: &Read, read2: &Read) -> Result<SpeedObservation, PairSkip> {
        let ts1 = read1.timestamp.ok_or(PairSkip::MissingTimestamp)?;
        let ts2 = read2.timestamp.ok_or(PairSkip::MissingTimestamp)?;

        let km1 = resolve_kilometer_point(read1).ok_or(PairSkip::MissingKilometerPoint)?;
        let km2 = resolve_kilometer_point(read2).ok_or(PairSkip::MissingKilometerPoint)?;

        let road1 = resolve_road_code(read1).ok_or(PairSkip::UnresolvedRoad)?;
        let road2 = resolve_road_code(read2).ok_or(PairSkip::UnresolvedRoad)?;
        if road1 != road2 {
            return Err(PairSkip::RoadMismatch);
        }

        let raw_distance = (km2 - km1).abs();

        // On a ring road the shorter wraparound path is the real distance.
        let distance_km = match self.circular.circumference(&road1) {
            Some(length) if raw_distance > length / 2.0 => length - raw_distance,
            _ => raw_distance,
        };

        // Microsecond precision: only truly simultaneous reads count as
        // zero-elapsed. `num_microseconds` is `None` on overflow, which no
        // pair of real timestamps reaches.
        let elapsed_micros = (ts2 - ts1).num_microseconds().unwrap_or(i64::MAX).abs();
        if elapsed_micros == 0 {
            return Err(PairSkip::ZeroElapsed);
        }
        let elapsed_hours = elapsed_micros as f64 / 3_600_000_000.0;

        let speed_kmh = distance_km / elapsed_hours;

        Ok(SpeedObservation {
            plate: read1.plate.clone(),
            from: read1.clone(),
            to: read2.clone(),
            road: road1,
            km_from: km1,
            km_to: km2,
            distance_km,
            elapsed_hours,
            speed_kmh,
            flagged: speed_kmh > self.threshold_kmh,
        })
    }

    /// Scans a read set for speed anomalies.
    ///
    /// Applies the pre-filters, groups by plate, walks each plate's timeline
    /// in adjacent pairs, and keeps the last flagged pair per plate.
    pub fn detect_anomalies(&self, reads: &[Read], filters: &AnomalyFilters) -> Detection {
        let mut stats = DetectionStats::default();
        let surviving = self.apply_filters(reads, filters, &mut stats);

        let mut flagged: BTreeMap<String, SpeedObservation> = BTreeMap::new();

        for (plate, plate_reads) in group_by_plate(&surviving) {
            if let Some(observation) = self.scan_plate(plate_reads, &mut stats) {
                flagged.insert(plate, observation);
            }
        }

        Detection {
            observations: flagged.into_values().collect(),
            stats,
        }
    }

    /// Parallel variant of `detect_anomalies` for large read sets: plate
    /// groups are fanned out over a thread pool and the per-partition
    /// results merged. Plates partition disjointly, so the outcome is
    /// identical to the sequential scan.
    pub fn detect_anomalies_parallel(
        &self,
        reads: &[Read],
        filters: &AnomalyFilters,
        workers: usize,
    ) -> Detection {
        let mut stats = DetectionStats::default();
        let surviving = self.apply_filters(reads, filters, &mut stats);

        // Owned partitions so each job is 'static.
        let groups: Vec<(String, Vec<Read>)> = group_by_plate(&surviving)
            .into_iter()
            .map(|(plate, reads)| (plate, reads.into_iter().cloned().collect()))
            .collect();

        let workers = workers.max(1);
        let chunk_size = groups.len().div_ceil(workers).max(1);
        let pool = threadpool::ThreadPool::new(workers);
        let (tx, rx) = std::sync::mpsc::channel();

        let mut jobs = 0usize;
        for chunk in groups.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let detector = self.clone();
            let tx = tx.clone();
            jobs += 1;
            pool.execute(move || {
                let mut local_stats = DetectionStats::default();
                let mut local_flagged: BTreeMap<String, SpeedObservation> = BTreeMap::new();
                for (plate, plate_reads) in chunk {
                    let refs: Vec<&Read> = plate_reads.iter().collect();
                    if let Some(observation) = detector.scan_plate(refs, &mut local_stats) {
                        local_flagged.insert(plate, observation);
                    }
                }
                // The receiver only hangs up if the caller gave up; nothing
                // useful to do with the result then.
                let _ = tx.send((local_flagged, local_stats));
            });
        }
        drop(tx);

        let mut flagged: BTreeMap<String, SpeedObservation> = BTreeMap::new();
        for (partition, partition_stats) in rx.iter().take(jobs) {
            flagged.extend(partition);
            stats.absorb(&partition_stats);
        }
        pool.join();

        Detection {
            observations: flagged.into_values().collect(),
            stats,
        }
    }

    fn apply_filters<'a>(
        &self,
        reads: &'a [Read],
        filters: &AnomalyFilters,
        stats: &mut DetectionStats,
    ) -> Vec<&'a Read> {
        let road_filter = filters
            .road
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(parse_road_code);

        let mut surviving = Vec::with_capacity(reads.len());
        for read in reads {
            if self.read_passes_filters(read, filters, road_filter.as_deref()) {
                surviving.push(read);
            } else {
                stats.reads_filtered += 1;
            }
        }
        surviving
    }

    fn read_passes_filters(
        &self,
        read: &Read,
        filters: &AnomalyFilters,
        road_filter: Option<&str>,
    ) -> bool {
        if read.source_type != SourceType::Camera {
            return false;
        }
        let Some(ts) = read.timestamp else {
            return false;
        };

        if let Some(from) = filters.date_from {
            if ts.date() < from {
                return false;
            }
        }
        if let Some(to) = filters.date_to {
            if ts.date() > to {
                return false;
            }
        }
        if let Some(from) = filters.time_from {
            if ts.time() < from {
                return false;
            }
        }
        if let Some(to) = filters.time_to {
            if ts.time() > to {
                return false;
            }
        }
        if let Some(wanted) = road_filter {
            if resolve_road_code(read).as_deref() != Some(wanted) {
                return false;
            }
        }
        true
    }

    /// Walks one plate's reads in timestamp order, evaluating adjacent pairs
    /// only, and returns the last flagged observation, if any.
    fn scan_plate(
        &self,
        mut plate_reads: Vec<&Read>,
        stats: &mut DetectionStats,
    ) -> Option<SpeedObservation> {
        if plate_reads.len() < 2 {
            stats.singleton_plates += 1;
            return None;
        }

        plate_reads.sort_by_key(|r| r.timestamp);

        let mut last_flagged: Option<SpeedObservation> = None;
        for pair in plate_reads.windows(2) {
            match self.evaluate_pair(pair[0], pair[1]) {
                Ok(observation) => {
                    stats.pairs_evaluated += 1;
                    if observation.flagged {
                        debug!(
                            plate = %observation.plate,
                            speed_kmh = observation.speed_kmh,
                            "speed anomaly"
                        );
                        last_flagged = Some(observation);
                    }
                }
                Err(PairSkip::MissingTimestamp) => {} // filtered out earlier
                Err(PairSkip::MissingKilometerPoint) => stats.pairs_missing_km += 1,
                Err(PairSkip::UnresolvedRoad) => stats.pairs_unresolved_road += 1,
                Err(PairSkip::RoadMismatch) => stats.pairs_road_mismatch += 1,
                Err(PairSkip::ZeroElapsed) => stats.pairs_zero_elapsed += 1,
            }
        }
        last_flagged
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

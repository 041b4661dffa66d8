/// Shared data types for the LPR analysis core.
///
/// The engine operates on `Read` — one raw plate-reader observation as
/// delivered by the surrounding case-management application — and derives
/// two kinds of records from it:
///
/// - `ConsolidatedPass` — several near-simultaneous multi-lane reads of the
///   same vehicle at one gantry, merged into a single logical pass.
/// - `SpeedObservation` — the estimated travel speed between two consecutive
///   reads of the same vehicle on the same road.
///
/// Timestamps are transmitted without a timezone offset, so all comparisons
/// are local-clock relative (`NaiveDateTime`).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Read identifiers
// ---------------------------------------------------------------------------

/// Identifier of a read. Raw reads carry numeric database ids; consolidated
/// passes carry a synthetic string id (`"<original>_consolidated"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadId {
    Numeric(i64),
    Synthetic(String),
}

impl ReadId {
    /// Derives the synthetic id of a consolidated pass built from the read
    /// with this id.
    pub fn consolidated(&self) -> ReadId {
        ReadId::Synthetic(format!("{}_consolidated", self))
    }
}

impl fmt::Display for ReadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadId::Numeric(n) => write!(f, "{}", n),
            ReadId::Synthetic(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// Source type
// ---------------------------------------------------------------------------

/// Origin of a read. Only camera (LPR) reads participate in consolidation
/// and speed analysis; GPS points are handled by other layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Camera,
    Gps,
}

impl SourceType {
    /// Maps the wire `Tipo_Fuente` value. Anything that is not GPS is
    /// treated as camera-sourced.
    pub fn from_wire(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("GPS") {
            SourceType::Gps
        } else {
            SourceType::Camera
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            SourceType::Camera => "LPR",
            SourceType::Gps => "GPS",
        }
    }
}

// ---------------------------------------------------------------------------
// Raw read
// ---------------------------------------------------------------------------

/// One raw plate-reader observation.
///
/// Location fields (`road`, `km_point_raw`, and sometimes `reader_id`
/// itself) are free text entered by operators over many years and follow no
/// single format; the `location` module tolerates the known conventions.
#[derive(Debug, Clone, PartialEq)]
pub struct Read {
    pub id: ReadId,
    /// Uppercase alphanumeric vehicle identifier; multiple national plate
    /// formats are legal, so no shape is enforced.
    pub plate: String,
    /// `None` when the wire timestamp was absent or unparseable. Such reads
    /// are skipped (and counted) by the consolidator and the detector.
    pub timestamp: Option<NaiveDateTime>,
    pub lane: Option<String>,
    /// Free-text physical reader identifier; may itself encode road and
    /// kilometer point when the structured fields are missing.
    pub reader_id: Option<String>,
    /// Human label of the reader; the lane number is frequently embedded as
    /// a trailing `" C<n>"` token.
    pub reader_name: Option<String>,
    pub road: Option<String>,
    pub km_point_raw: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub source_type: SourceType,
}

// ---------------------------------------------------------------------------
// Consolidated pass
// ---------------------------------------------------------------------------

/// Several reads of one vehicle taken by adjacent lanes of the same gantry
/// within the consolidation window, merged into one logical pass.
///
/// Immutable once built: the consolidator produces these in a single run and
/// recomputes from scratch if the input read set changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedPass {
    /// Template read's id with the `_consolidated` suffix.
    pub id: ReadId,
    pub plate: String,
    /// Timestamp of the template (earliest) member.
    pub timestamp: NaiveDateTime,
    /// Reader name with the lane suffix removed (or the reader id, or
    /// `"Unknown"` when both are absent).
    pub base_reader_id: String,
    /// Base reader id plus the detected lane list and, when the pass spans
    /// more than zero seconds, a `[Δt=<n>s]` suffix.
    pub display_name: String,
    /// Sorted, deduplicated lane tokens (`"C1"`, `"C2"`, …) found among the
    /// member reads.
    pub lanes: Vec<String>,
    /// Seconds between the first and last member timestamps.
    pub span_seconds: i64,
    /// The original member reads, ascending by timestamp. Always at least
    /// two; the first is the template. A read belongs to at most one pass.
    pub members: Vec<Read>,
}

// ---------------------------------------------------------------------------
// Speed observation
// ---------------------------------------------------------------------------

/// Estimated travel speed between two consecutive reads of the same vehicle
/// on the same road.
///
/// Only produced when both reads resolve to the same normalized road code,
/// both kilometer points parse, and the elapsed time is non-zero; any other
/// pair is silently skipped rather than erred.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedObservation {
    pub plate: String,
    pub from: Read,
    pub to: Read,
    /// Normalized road code shared by both reads.
    pub road: String,
    pub km_from: f64,
    pub km_to: f64,
    /// Kilometers travelled, after circular-road wraparound correction.
    pub distance_km: f64,
    pub elapsed_hours: f64,
    pub speed_kmh: f64,
    /// True when `speed_kmh` exceeds the configured threshold.
    pub flagged: bool,
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors raised at the ingest boundary. The analysis core itself is total:
/// malformed records inside an otherwise well-formed payload are skipped and
/// counted, never propagated.
#[derive(Debug)]
pub enum IngestError {
    /// Malformed or structurally unexpected JSON.
    ParseError(String),
    /// Structurally valid payload containing no reads.
    NoReads(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::ParseError(msg) => write!(f, "parse error: {}", msg),
            IngestError::NoReads(msg) => write!(f, "no reads: {}", msg),
        }
    }
}

impl std::error::Error for IngestError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

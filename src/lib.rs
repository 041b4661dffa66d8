/// lpr_core: lane-read consolidation and speed-anomaly analysis for LPR
/// (license plate reader) investigations.
///
/// # Module structure
///
/// ```text
/// lpr_core
/// ├── model       — shared data types (Read, ConsolidatedPass, SpeedObservation, …)
/// ├── location    — free-text location parsing (kilometer points, road codes, lanes)
/// ├── roads       — circular-road registry loader (roads.toml)
/// ├── ingest
/// │   ├── reads   — Lectura wire-format JSON parsing
/// │   └── fixtures (test only) — representative wire payloads
/// ├── consolidate — multi-lane pass consolidation (2-second anchor window)
/// ├── anomaly     — inter-reading speed estimation and anomaly detection
/// ├── analysis
/// │   └── groupings — per-vehicle timelines, minimum-passes filter
/// └── export      — wire-shaped output for the read table and anomaly panel
/// ```

/// Public modules
pub mod analysis;
pub mod anomaly;
pub mod consolidate;
pub mod export;
pub mod ingest;
pub mod location;
pub mod model;
pub mod roads;

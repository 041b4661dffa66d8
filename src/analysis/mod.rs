/// Cross-cutting analysis helpers for the LPR core.
///
/// Submodules:
/// - `groupings` — organizes flat read lists into per-vehicle timelines and
///   applies the minimum-passes filter of the recurring-vehicle view.
///
/// The heavier analyses (pass consolidation, speed anomalies) live in their
/// own top-level modules and build on these helpers.

pub mod groupings;

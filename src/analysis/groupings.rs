/// Plate grouping and data organization utilities.
///
/// `group_by_plate` takes a flat list of `Read`s and organizes them into
/// per-vehicle timelines, making it convenient to ask "where was 5678XYZ
/// seen?" without filtering a flat list every time. The consolidator and the
/// anomaly detector both start from this grouping.
///
/// `pass_counts` / `filter_min_passes` support the recurring-vehicle view:
/// during an investigation over a date range, vehicles seen only once or
/// twice are usually noise, and the panel lets the operator require a
/// minimum number of passes per plate.

use std::collections::HashMap;

use crate::model::Read;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Groups reads into a map keyed by plate. Reads whose plate is blank are
/// dropped; they cannot be attributed to a vehicle.
pub fn group_by_plate<'a>(reads: &[&'a Read]) -> HashMap<String, Vec<&'a Read>> {
    let mut grouped: HashMap<String, Vec<&'a Read>> = HashMap::new();

    for read in reads {
        if read.plate.trim().is_empty() {
            continue;
        }
        grouped.entry(read.plate.clone()).or_default().push(read);
    }

    grouped
}

/// Number of reads per plate. Blank plates are excluded, as in
/// `group_by_plate`.
pub fn pass_counts(reads: &[Read]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for read in reads {
        if read.plate.trim().is_empty() {
            continue;
        }
        *counts.entry(read.plate.clone()).or_insert(0) += 1;
    }
    counts
}

/// Keeps only reads of vehicles seen at least `min_passes` times.
///
/// A threshold of zero or one keeps everything, including blank-plate reads:
/// it expresses "no minimum", not "attributable reads only".
pub fn filter_min_passes(reads: Vec<Read>, min_passes: usize) -> Vec<Read> {
    if min_passes <= 1 {
        return reads;
    }

    let counts = pass_counts(&reads);
    reads
        .into_iter()
        .filter(|read| {
            counts
                .get(&read.plate)
                .is_some_and(|&count| count >= min_passes)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

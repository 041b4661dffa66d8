/// Lane-read pass consolidation.
///
/// One vehicle crossing a multi-lane gantry is often read by two or three
/// adjacent lane cameras within a second or two, producing near-duplicate
/// rows in the UI. `consolidate` collapses those into a single logical pass
/// while leaving genuinely distinct passes untouched.
///
/// Grouping is a first-fit scan with a fixed anchor, not an interval merge:
/// a read can only join a group whose *initial* member's timestamp is within
/// the 2-second window. A chain of reads each within 2 s of its predecessor
/// but drifting past the anchor splits into separate groups. This matches
/// the reference behavior and is kept deliberately.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::location::{lane_token, strip_lane_suffix};
use crate::model::{ConsolidatedPass, Read, SourceType};

/// Reads of the same vehicle at the same gantry within this many seconds of
/// a group's anchor read are merged into one pass.
pub const CONSOLIDATION_WINDOW_SECONDS: i64 = 2;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One entry of the consolidated view: either an untouched single read or a
/// multi-member pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassEntry {
    Single(Read),
    Pass(ConsolidatedPass),
}

impl PassEntry {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            PassEntry::Single(read) => read.timestamp,
            PassEntry::Pass(pass) => Some(pass.timestamp),
        }
    }

    pub fn plate(&self) -> &str {
        match self {
            PassEntry::Single(read) => &read.plate,
            PassEntry::Pass(pass) => &pass.plate,
        }
    }

    /// Collapses the entry back into a `Read`, so consolidated output can be
    /// re-fed through read-shaped interfaces. For a pass, the template
    /// member supplies the location fields and the display name (with lane
    /// list) becomes the reader name; re-consolidating such reads yields
    /// degenerate single-member output, never an error.
    pub fn into_read(self) -> Read {
        match self {
            PassEntry::Single(read) => read,
            PassEntry::Pass(pass) => {
                let ConsolidatedPass {
                    id,
                    plate,
                    timestamp,
                    display_name,
                    members,
                    ..
                } = pass;

                let template = members.into_iter().next();
                let (reader_id, road, km_point_raw, coordinates) = match &template {
                    Some(t) => (
                        t.reader_id.clone(),
                        t.road.clone(),
                        t.km_point_raw.clone(),
                        t.coordinates,
                    ),
                    None => (None, None, None, None),
                };

                Read {
                    id,
                    plate,
                    timestamp: Some(timestamp),
                    lane: None,
                    reader_id,
                    reader_name: Some(display_name),
                    road,
                    km_point_raw,
                    coordinates,
                    source_type: SourceType::Camera,
                }
            }
        }
    }
}

/// Result of one consolidation run. `skipped` counts reads excluded from
/// grouping (missing timestamp or plate, or GPS-sourced) so operators can
/// detect silent data-quality problems.
#[derive(Debug, Clone, PartialEq)]
pub struct Consolidation {
    /// Passes and untouched reads, sorted descending by timestamp.
    pub entries: Vec<PassEntry>,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Base reader identity
// ---------------------------------------------------------------------------

/// Logical gantry identity of a read: the reader display name with the lane
/// suffix removed, falling back to the reader id, falling back to "Unknown".
pub fn base_reader_id(read: &Read) -> String {
    if let Some(name) = read.reader_name.as_deref().filter(|n| !n.trim().is_empty()) {
        return strip_lane_suffix(name);
    }
    if let Some(id) = read.reader_id.as_deref().filter(|i| !i.trim().is_empty()) {
        return id.trim().to_string();
    }
    "Unknown".to_string()
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

struct Group<'a> {
    /// Timestamp of the group's initial member; the window never slides.
    anchor: NaiveDateTime,
    plate: &'a str,
    base: String,
    members: Vec<(NaiveDateTime, &'a Read)>,
}

/// Groups raw reads into consolidated passes.
///
/// Reads missing a timestamp or a plate, and GPS-sourced reads, are dropped
/// from grouping and counted in `Consolidation::skipped`. The operation is
/// total: no input produces an error.
pub fn consolidate(reads: &[Read]) -> Consolidation {
    let mut eligible: Vec<(NaiveDateTime, &Read)> = Vec::with_capacity(reads.len());
    let mut skipped = 0usize;

    for read in reads {
        if read.source_type != SourceType::Camera {
            skipped += 1;
            continue;
        }
        match read.timestamp {
            Some(ts) if !read.plate.trim().is_empty() => eligible.push((ts, read)),
            _ => {
                debug!(id = %read.id, "read skipped: missing timestamp or plate");
                skipped += 1;
            }
        }
    }

    // Stable sort: ties keep input order.
    eligible.sort_by_key(|(ts, _)| *ts);

    let mut groups: Vec<Group> = Vec::new();

    for (ts, read) in eligible {
        let base = base_reader_id(read);

        // First-fit scan against existing group anchors. Compared in
        // milliseconds: whole-second truncation would let a read up to
        // 2.999 s past the anchor slip into the window.
        let slot = groups.iter_mut().find(|g| {
            g.plate == read.plate
                && g.base == base
                && (ts - g.anchor).num_milliseconds().abs()
                    <= CONSOLIDATION_WINDOW_SECONDS * 1000
        });

        match slot {
            Some(group) => group.members.push((ts, read)),
            None => groups.push(Group {
                anchor: ts,
                plate: &read.plate,
                base,
                members: vec![(ts, read)],
            }),
        }
    }

    let mut entries: Vec<PassEntry> = groups.into_iter().map(build_entry).collect();

    // Most recent first for the UI.
    entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

    Consolidation { entries, skipped }
}

fn build_entry(mut group: Group) -> PassEntry {
    group.members.sort_by_key(|(ts, _)| *ts);

    if group.members.len() == 1 {
        let (_, only) = group.members[0];
        return PassEntry::Single(only.clone());
    }

    let (first_ts, template) = group.members[0];
    let (last_ts, _) = group.members[group.members.len() - 1];
    let span_seconds = (last_ts - first_ts).num_seconds();

    let mut lanes: Vec<String> = group
        .members
        .iter()
        .filter_map(|(_, read)| read.reader_name.as_deref().and_then(lane_token))
        .collect();
    lanes.sort();
    lanes.dedup();

    let mut display_name = group.base.clone();
    if !lanes.is_empty() {
        display_name.push_str(&format!(" [{}]", lanes.join(", ")));
    }
    if span_seconds > 0 {
        display_name.push_str(&format!(" [Δt={}s]", span_seconds));
    }

    PassEntry::Pass(ConsolidatedPass {
        id: template.id.consolidated(),
        plate: template.plate.clone(),
        timestamp: first_ts,
        base_reader_id: group.base,
        display_name,
        lanes,
        span_seconds,
        members: group.members.into_iter().map(|(_, r)| r.clone()).collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReadId;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn read(id: i64, plate: &str, reader_name: &str, when: NaiveDateTime) -> Read {
        Read {
            id: ReadId::Numeric(id),
            plate: plate.to_string(),
            timestamp: Some(when),
            lane: None,
            reader_id: Some("A1-PK25-N".to_string()),
            reader_name: Some(reader_name.to_string()),
            road: Some("A-1".to_string()),
            km_point_raw: Some("PK25+000".to_string()),
            coordinates: None,
            source_type: SourceType::Camera,
        }
    }

    fn passes(result: &Consolidation) -> Vec<&ConsolidatedPass> {
        result
            .entries
            .iter()
            .filter_map(|e| match e {
                PassEntry::Pass(p) => Some(p),
                PassEntry::Single(_) => None,
            })
            .collect()
    }

    // --- Grouping ------------------------------------------------------------

    #[test]
    fn test_two_lanes_one_second_apart_merge_into_one_pass() {
        let reads = vec![
            read(101, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(102, "1234ABC", "A1 C2", ts(10, 0, 1)),
        ];

        let result = consolidate(&reads);
        assert_eq!(result.entries.len(), 1, "both lanes belong to one pass");
        assert_eq!(result.skipped, 0);

        let pass = match &result.entries[0] {
            PassEntry::Pass(p) => p,
            other => panic!("expected a consolidated pass, got {:?}", other),
        };
        assert_eq!(pass.lanes, vec!["C1", "C2"]);
        assert_eq!(pass.base_reader_id, "A1");
        assert_eq!(pass.span_seconds, 1);
        assert_eq!(pass.id, ReadId::Synthetic("101_consolidated".to_string()));
        assert_eq!(pass.members.len(), 2);
        assert_eq!(pass.display_name, "A1 [C1, C2] [Δt=1s]");
    }

    #[test]
    fn test_single_member_groups_pass_through_unchanged() {
        let lone = read(1, "1234ABC", "A1 C1", ts(10, 0, 0));
        let result = consolidate(&[lone.clone()]);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0], PassEntry::Single(lone));
    }

    #[test]
    fn test_window_boundary_two_seconds_joins_three_does_not() {
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts(10, 0, 2)),
            read(3, "1234ABC", "A1 C3", ts(10, 0, 5)),
        ];

        let result = consolidate(&reads);
        let merged = passes(&result);
        assert_eq!(merged.len(), 1, "reads 1+2 merge; read 3 is beyond the window");
        assert_eq!(merged[0].lanes, vec!["C1", "C2"]);
    }

    #[test]
    fn test_fractional_seconds_past_the_window_do_not_merge() {
        let ts_milli = |s: u32, milli: u32| {
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_milli_opt(10, 0, s, milli)
                .unwrap()
        };

        // 2.5 s past the anchor is outside the window even though it
        // truncates to 2 whole seconds.
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts_milli(2, 500)),
        ];
        let result = consolidate(&reads);
        assert_eq!(result.entries.len(), 2, "2.5 s must not join the anchor group");
        assert!(passes(&result).is_empty());

        // 1.999 s is inside.
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts_milli(1, 999)),
        ];
        let result = consolidate(&reads);
        assert_eq!(passes(&result).len(), 1, "1.999 s is within the window");
    }

    #[test]
    fn test_first_fit_anchor_does_not_slide() {
        // Each consecutive pair is within 2 s, but the third read is 4 s
        // past the anchor: the window is fixed at the initial member, so the
        // chain splits. Deliberate reference behavior, not interval merge.
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts(10, 0, 2)),
            read(3, "1234ABC", "A1 C3", ts(10, 0, 4)),
        ];

        let result = consolidate(&reads);
        assert_eq!(result.entries.len(), 2, "chain must split at the anchor window");

        let merged = passes(&result);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].lanes, vec!["C1", "C2"]);
    }

    #[test]
    fn test_different_plates_never_merge() {
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "5678XYZ", "A1 C2", ts(10, 0, 0)),
        ];
        let result = consolidate(&reads);
        assert_eq!(result.entries.len(), 2);
        assert!(passes(&result).is_empty());
    }

    #[test]
    fn test_different_gantries_never_merge() {
        let reads = vec![
            read(1, "1234ABC", "A1 PK25 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 PK30 C1", ts(10, 0, 0)),
        ];
        let result = consolidate(&reads);
        assert_eq!(result.entries.len(), 2, "base reader ids differ");
    }

    #[test]
    fn test_duplicate_lane_tokens_deduplicated() {
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C1", ts(10, 0, 1)),
            read(3, "1234ABC", "A1 C2", ts(10, 0, 1)),
        ];

        let result = consolidate(&reads);
        let merged = passes(&result);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].lanes, vec!["C1", "C2"]);
    }

    #[test]
    fn test_zero_span_omits_delta_suffix() {
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts(10, 0, 0)),
        ];
        let result = consolidate(&reads);
        let merged = passes(&result);
        assert_eq!(merged[0].span_seconds, 0);
        assert_eq!(merged[0].display_name, "A1 [C1, C2]");
    }

    // --- Fallback identity ---------------------------------------------------

    #[test]
    fn test_base_reader_id_fallbacks() {
        let mut r = read(1, "1234ABC", "A1 PK25 C1", ts(10, 0, 0));
        assert_eq!(base_reader_id(&r), "A1 PK25");

        r.reader_name = None;
        assert_eq!(base_reader_id(&r), "A1-PK25-N");

        r.reader_id = None;
        assert_eq!(base_reader_id(&r), "Unknown");
    }

    // --- Skips ---------------------------------------------------------------

    #[test]
    fn test_incomplete_and_gps_reads_are_skipped_and_counted() {
        let mut no_ts = read(1, "1234ABC", "A1 C1", ts(10, 0, 0));
        no_ts.timestamp = None;

        let mut no_plate = read(2, "", "A1 C1", ts(10, 0, 0));
        no_plate.plate = "   ".to_string();

        let mut gps = read(3, "1234ABC", "A1 C1", ts(10, 0, 0));
        gps.source_type = SourceType::Gps;

        let ok = read(4, "1234ABC", "A1 C1", ts(10, 0, 0));

        let result = consolidate(&[no_ts, no_plate, gps, ok.clone()]);
        assert_eq!(result.skipped, 3);
        assert_eq!(result.entries, vec![PassEntry::Single(ok)]);
    }

    // --- Output ordering -----------------------------------------------------

    #[test]
    fn test_entries_sorted_descending_by_timestamp() {
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts(10, 0, 1)),
            read(3, "5678XYZ", "B2 C1", ts(11, 0, 0)),
            read(4, "9999ZZZ", "B2 C1", ts(9, 0, 0)),
        ];

        let result = consolidate(&reads);
        let stamps: Vec<_> = result.entries.iter().map(|e| e.timestamp()).collect();
        assert_eq!(
            stamps,
            vec![
                Some(ts(11, 0, 0)),
                Some(ts(10, 0, 0)),
                Some(ts(9, 0, 0)),
            ],
            "most recent entry first"
        );
    }

    // --- Re-consolidation ----------------------------------------------------

    #[test]
    fn test_reconsolidating_own_output_is_degenerate_but_stable() {
        // Consolidated ids carry a `_consolidated` suffix and the display
        // name embeds the lane list, so a second run cannot reproduce the
        // original grouping. It must still complete and emit single-member
        // entries.
        let reads = vec![
            read(1, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(2, "1234ABC", "A1 C2", ts(10, 0, 1)),
            read(3, "5678XYZ", "B2 C1", ts(11, 0, 0)),
        ];

        let first = consolidate(&reads);
        let refed: Vec<Read> = first.entries.into_iter().map(PassEntry::into_read).collect();

        let second = consolidate(&refed);
        assert_eq!(second.skipped, 0);
        assert_eq!(second.entries.len(), refed.len());
        assert!(
            second
                .entries
                .iter()
                .all(|e| matches!(e, PassEntry::Single(_))),
            "second run must not form multi-member passes"
        );
    }

    #[test]
    fn test_pass_into_read_keeps_template_location() {
        let reads = vec![
            read(7, "1234ABC", "A1 C1", ts(10, 0, 0)),
            read(8, "1234ABC", "A1 C2", ts(10, 0, 1)),
        ];

        let result = consolidate(&reads);
        let entry = result.entries.into_iter().next().expect("one entry");
        let merged = entry.into_read();

        assert_eq!(merged.id, ReadId::Synthetic("7_consolidated".to_string()));
        assert_eq!(merged.road.as_deref(), Some("A-1"));
        assert_eq!(merged.km_point_raw.as_deref(), Some("PK25+000"));
        assert_eq!(merged.reader_name.as_deref(), Some("A1 [C1, C2] [Δt=1s]"));
    }
}

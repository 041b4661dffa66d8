/// Free-text location field parsing.
///
/// Kilometer points, road codes, and reader names are operator-entered text
/// accumulated over years of inconsistent conventions. This module converts
/// them into typed values while tolerating every historical format:
///
///   Kilometer point:  PK045+600, PK45.600, 45,800, PK 25+800, 25.800,
///                     25, P.K. 25+800
///   Road code:        A-1, N340, AP7, C-31, A 1, M-40 (Madrid)
///   Lane suffix:      trailing " C<digits>" on a reader's display name,
///                     e.g. "A1 PK25 C1"
///
/// All functions are total: unparseable input yields `None` (or the input
/// passed through, for road codes), never an error.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

fn km_point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Optional "PK" / "P.K." prefix, integer kilometers, optional meter
    // group separated by '.', ',' or '+'. Unanchored: the first digit run
    // anywhere in the text is taken, so only fully digit-free input fails.
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:P\.?\s*K\.?\s*)?(\d+)(?:[.,+](\d+))?")
            .unwrap_or_else(|e| panic!("invalid kilometer-point pattern: {}", e))
    })
}

fn road_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leading run of letters, then digits, with optional spaces or dashes
    // between. Trailing text ("M-40 (Madrid)") is ignored by the leading match.
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z]+)[\s-]*(\d+)")
            .unwrap_or_else(|e| panic!("invalid road-code pattern: {}", e))
    })
}

fn reader_road_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Z]+\d+").unwrap_or_else(|e| panic!("invalid reader-road pattern: {}", e))
    })
}

fn reader_km_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"PK\s*\d+[.,+]?\d*")
            .unwrap_or_else(|e| panic!("invalid reader-km pattern: {}", e))
    })
}

fn lane_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s+C\d+$").unwrap_or_else(|e| panic!("invalid lane-suffix pattern: {}", e))
    })
}

fn lane_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"C\d+$").unwrap_or_else(|e| panic!("invalid lane-token pattern: {}", e))
    })
}

// ---------------------------------------------------------------------------
// Kilometer points
// ---------------------------------------------------------------------------

/// Parses a free-text kilometer-point string into decimal kilometers.
///
/// The fractional group is meters, not a decimal fraction: `"PK25+800"` is
/// 25.800 km and `"PK25+8"` is 25.008 km. A 3-digit meter group is
/// indistinguishable from true decimal kilometers; callers must supply
/// meter-style input for correct results.
///
/// Returns `None` only when the text contains no digits at all.
pub fn parse_kilometer_point(text: &str) -> Option<f64> {
    let caps = km_point_re().captures(text)?;

    let km: f64 = caps.get(1)?.as_str().parse().ok()?;

    let meters = match caps.get(2) {
        Some(group) => {
            let value: f64 = group.as_str().parse().ok()?;
            value / 1000.0
        }
        None => 0.0,
    };

    Some(km + meters)
}

// ---------------------------------------------------------------------------
// Road codes
// ---------------------------------------------------------------------------

/// Normalizes a road code to `"<LETTERS>-<digits>"` (`"a 1"` → `"A-1"`,
/// `"N340"` → `"N-340"`).
///
/// When the text does not start with a letters-then-digits run, the
/// uppercased, trimmed input is returned unchanged; callers must treat that
/// as "unparsed" when comparing road codes across reads.
pub fn parse_road_code(text: &str) -> String {
    let normalized = text.trim().to_uppercase();

    match road_code_re().captures(&normalized) {
        Some(caps) => format!("{}-{}", &caps[1], &caps[2]),
        None => normalized,
    }
}

// ---------------------------------------------------------------------------
// Reader-id fallback extraction
// ---------------------------------------------------------------------------

/// Road and kilometer point recovered from a free-text reader identifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReaderLocation {
    /// Raw road run (`"A1"`), not yet normalized; feed through
    /// `parse_road_code` before comparing.
    pub road: Option<String>,
    pub km_point: Option<f64>,
}

/// Fallback heuristic for reads that lack structured road/PK fields: some
/// deployments encode both into the reader id (`"A1-PK25+800-N"`).
///
/// Extracts the first `[A-Z]+\d+` run as the road and the first
/// `PK<digits>` run as the kilometer point. Returns an empty result (not an
/// error) when neither pattern is present.
pub fn extract_from_reader_id(reader_id: &str) -> ReaderLocation {
    let normalized = reader_id.trim().to_uppercase();

    let road = reader_road_re()
        .find(&normalized)
        .map(|m| m.as_str().to_string());

    let km_point = reader_km_re()
        .find(&normalized)
        .and_then(|m| parse_kilometer_point(m.as_str()));

    if road.is_none() && km_point.is_none() {
        debug!(reader_id, "no road or kilometer point encoded in reader id");
    }

    ReaderLocation { road, km_point }
}

// ---------------------------------------------------------------------------
// Lane suffix conventions
// ---------------------------------------------------------------------------

/// Strips the trailing `" C<digits>"` lane suffix from a reader display
/// name: `"A1 PK25 C1"` → `"A1 PK25"`. Names without the suffix pass
/// through trimmed.
pub fn strip_lane_suffix(reader_name: &str) -> String {
    lane_suffix_re()
        .replace(reader_name.trim_end(), "")
        .trim_end()
        .to_string()
}

/// Returns the trailing lane token of a reader display name, if present:
/// `"A1 PK25 C2"` → `Some("C2")`.
pub fn lane_token(reader_name: &str) -> Option<String> {
    lane_token_re()
        .find(reader_name.trim_end())
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

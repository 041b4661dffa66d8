/// Wire-format read parsing.
///
/// The import/REST layer delivers reads as a JSON array of Lectura-shaped
/// objects. See `fixtures.rs` for annotated examples of the payload.
///
/// Lectura shape:
///   ID_Lectura    — numeric id (string for re-fed consolidated records)
///   Matricula     — plate
///   Fecha_y_Hora  — ISO-8601-like local timestamp, no offset
///   Carril        — optional lane, string or number
///   ID_Lector     — optional free-text reader id
///   Tipo_Fuente   — "LPR" (camera) or "GPS"
///   Coordenada_X/Y — optional coordinates
///   lector        — optional nested reader object:
///     Nombre, Carretera, PK, Coordenada_X, Coordenada_Y
///
/// A record with an unparseable timestamp still produces a `Read` (with
/// `timestamp: None`) so the analysis layers can count the skip; only a
/// structurally broken payload fails the whole parse.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::model::{IngestError, Read, ReadId, SourceType};

// ---------------------------------------------------------------------------
// Serde structures for Lectura JSON deserialization
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireRead {
    #[serde(rename = "ID_Lectura")]
    id: ReadId,
    #[serde(rename = "Matricula")]
    plate: String,
    #[serde(rename = "Fecha_y_Hora", default)]
    timestamp: Option<String>,
    #[serde(rename = "Carril", default, deserialize_with = "text_or_number")]
    lane: Option<String>,
    #[serde(rename = "ID_Lector", default)]
    reader_id: Option<String>,
    #[serde(rename = "Coordenada_X", default)]
    coordinate_x: Option<f64>,
    #[serde(rename = "Coordenada_Y", default)]
    coordinate_y: Option<f64>,
    #[serde(rename = "Tipo_Fuente", default)]
    source_type: Option<String>,
    #[serde(default)]
    lector: Option<WireReader>,
}

#[derive(Deserialize)]
struct WireReader {
    #[serde(rename = "Nombre", default)]
    name: Option<String>,
    #[serde(rename = "Carretera", default)]
    road: Option<String>,
    #[serde(rename = "PK", default, deserialize_with = "text_or_number")]
    km_point: Option<String>,
    #[serde(rename = "Coordenada_X", default)]
    coordinate_x: Option<f64>,
    #[serde(rename = "Coordenada_Y", default)]
    coordinate_y: Option<f64>,
}

/// Historical imports serialize lanes and kilometer points as either JSON
/// strings or bare numbers; accept both.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Accepted local-timestamp layouts. No offset is ever transmitted.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

/// Parses a JSON array of Lectura-shaped objects into domain `Read`s.
///
/// # Errors
/// - `IngestError::ParseError` — malformed or structurally unexpected JSON.
/// - `IngestError::NoReads` — a well-formed but empty array.
pub fn parse_reads(json: &str) -> Result<Vec<Read>, IngestError> {
    let wire: Vec<WireRead> = serde_json::from_str(json)
        .map_err(|e| IngestError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    if wire.is_empty() {
        return Err(IngestError::NoReads("empty read array".to_string()));
    }

    Ok(wire.into_iter().map(into_read).collect())
}

fn into_read(wire: WireRead) -> Read {
    let timestamp = match wire.timestamp.as_deref() {
        Some(text) => {
            let parsed = parse_timestamp(text);
            if parsed.is_none() {
                warn!(id = %wire.id, timestamp = text, "unparseable read timestamp");
            }
            parsed
        }
        None => None,
    };

    let reader = wire.lector;
    let (reader_name, road, km_point_raw, reader_x, reader_y) = match reader {
        Some(r) => (r.name, r.road, r.km_point, r.coordinate_x, r.coordinate_y),
        None => (None, None, None, None, None),
    };

    // Read-level coordinates take precedence over the reader's.
    let coordinates = match (wire.coordinate_x, wire.coordinate_y) {
        (Some(x), Some(y)) => Some((x, y)),
        _ => match (reader_x, reader_y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        },
    };

    Read {
        id: wire.id,
        plate: wire.plate.trim().to_uppercase(),
        timestamp,
        lane: wire.lane,
        reader_id: wire.reader_id,
        reader_name,
        road,
        km_point_raw,
        coordinates,
        source_type: SourceType::from_wire(wire.source_type.as_deref().unwrap_or("")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

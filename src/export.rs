/// Output shaping for the surrounding case-management application.
///
/// The consolidated view is serialized back into the same Lectura wire shape
/// the ingest layer accepts, so the UI's existing read table renders it
/// without changes. Consolidated passes are annotated with two extension
/// fields:
///
///   carriles_detectados   — the detected lane list
///   _lecturas_originales  — the original member reads, for drill-down
///
/// Anomaly results use the flat row shape of the speed-anomaly panel.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::consolidate::{Consolidation, PassEntry};
use crate::model::{Read, SpeedObservation};

const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ---------------------------------------------------------------------------
// Consolidated view
// ---------------------------------------------------------------------------

/// Serializes one `Read` into the Lectura wire shape. Absent optional fields
/// are omitted rather than emitted as null, matching the historical payloads.
fn wire_read(read: &Read) -> Value {
    let mut row = Map::new();
    row.insert("ID_Lectura".to_string(), json!(read.id));
    row.insert("Matricula".to_string(), json!(read.plate));
    if let Some(ts) = read.timestamp {
        row.insert(
            "Fecha_y_Hora".to_string(),
            json!(ts.format(WIRE_TIMESTAMP_FORMAT).to_string()),
        );
    }
    if let Some(lane) = &read.lane {
        row.insert("Carril".to_string(), json!(lane));
    }
    if let Some(reader_id) = &read.reader_id {
        row.insert("ID_Lector".to_string(), json!(reader_id));
    }
    row.insert("Tipo_Fuente".to_string(), json!(read.source_type.as_wire()));

    let mut lector = Map::new();
    if let Some(name) = &read.reader_name {
        lector.insert("Nombre".to_string(), json!(name));
    }
    if let Some(road) = &read.road {
        lector.insert("Carretera".to_string(), json!(road));
    }
    if let Some(pk) = &read.km_point_raw {
        lector.insert("PK".to_string(), json!(pk));
    }
    if let Some((x, y)) = read.coordinates {
        lector.insert("Coordenada_X".to_string(), json!(x));
        lector.insert("Coordenada_Y".to_string(), json!(y));
    }
    if !lector.is_empty() {
        row.insert("lector".to_string(), Value::Object(lector));
    }

    Value::Object(row)
}

/// Serializes a consolidation result for the read table, most recent entry
/// first (the order `consolidate` already produces).
pub fn consolidated_view(consolidation: &Consolidation) -> Vec<Value> {
    consolidation
        .entries
        .iter()
        .map(|entry| match entry {
            PassEntry::Single(read) => wire_read(read),
            PassEntry::Pass(pass) => {
                // Pass rows reuse the template member's wire shape, with the
                // synthetic id and the annotated display name on top.
                let template = pass.members.first();
                let mut row = match template {
                    Some(t) => wire_read(t),
                    None => Value::Object(Map::new()),
                };
                if let Value::Object(fields) = &mut row {
                    fields.insert("ID_Lectura".to_string(), json!(pass.id));
                    fields.insert(
                        "Fecha_y_Hora".to_string(),
                        json!(pass.timestamp.format(WIRE_TIMESTAMP_FORMAT).to_string()),
                    );
                    fields.remove("Carril");
                    if let Some(Value::Object(lector)) = fields.get_mut("lector") {
                        lector.insert("Nombre".to_string(), json!(pass.display_name));
                    }
                    fields.insert("carriles_detectados".to_string(), json!(pass.lanes));
                    fields.insert(
                        "_lecturas_originales".to_string(),
                        Value::Array(pass.members.iter().map(wire_read).collect()),
                    );
                }
                row
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Anomaly rows
// ---------------------------------------------------------------------------

/// One row of the speed-anomaly panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub matricula: String,
    /// Estimated speed in km/h, rounded to the nearest integer for display.
    pub velocidad: i64,
    #[serde(rename = "fechaHoraInicio")]
    pub start_time: String,
    #[serde(rename = "fechaHoraFin")]
    pub end_time: String,
    #[serde(rename = "lectorInicio")]
    pub start_reader: String,
    #[serde(rename = "lectorFin")]
    pub end_reader: String,
    #[serde(rename = "pkInicio")]
    pub start_km: f64,
    #[serde(rename = "pkFin")]
    pub end_km: f64,
    pub carretera: String,
}

/// Display label of the reader behind a read, for the panel's endpoint
/// columns.
fn reader_label(read: &Read) -> String {
    read.reader_name
        .as_deref()
        .or(read.reader_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn format_timestamp(read: &Read) -> String {
    match read.timestamp {
        Some(ts) => ts.format(WIRE_TIMESTAMP_FORMAT).to_string(),
        None => String::new(),
    }
}

pub fn anomaly_rows(observations: &[SpeedObservation]) -> Vec<AnomalyRow> {
    observations
        .iter()
        .map(|obs| AnomalyRow {
            matricula: obs.plate.clone(),
            velocidad: obs.speed_kmh.round() as i64,
            start_time: format_timestamp(&obs.from),
            end_time: format_timestamp(&obs.to),
            start_reader: reader_label(&obs.from),
            end_reader: reader_label(&obs.to),
            start_km: obs.km_from,
            end_km: obs.km_to,
            carretera: obs.road.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

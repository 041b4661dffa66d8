/// Test fixtures: representative Lectura payloads from the import/REST layer.
///
/// Structurally complete but truncated to the minimum needed to exercise the
/// parser and the analysis layers. They reflect the real wire shape:
///
///   [
///     {
///       "ID_Lectura": 101,            — numeric (string once consolidated)
///       "Matricula": "1234ABC",
///       "Fecha_y_Hora": "2024-03-01T10:00:00",  — local, no offset
///       "Carril": "1",                — string OR bare number
///       "ID_Lector": "A1-PK25-N",
///       "Tipo_Fuente": "LPR",
///       "lector": {
///         "Nombre": "A1 PK25 C1",     — lane suffix " C<n>" on the name
///         "Carretera": "A-1",
///         "PK": "PK25+000",
///         "Coordenada_X": -3.6883,
///         "Coordenada_Y": 40.4530
///       }
///     }, …
///   ]

/// Same vehicle read by two adjacent lanes of one gantry one second apart,
/// plus an unrelated read from a different vehicle. Exercises multi-lane
/// consolidation and the string-or-number Carril encoding.
#[cfg(test)]
pub(crate) fn fixture_multi_lane_json() -> &'static str {
    r#"[
      {
        "ID_Lectura": 101,
        "Matricula": "1234ABC",
        "Fecha_y_Hora": "2024-03-01T10:00:00",
        "Carril": "1",
        "ID_Lector": "A1-PK25-N",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "A1 PK25 C1",
          "Carretera": "A-1",
          "PK": "PK25+000",
          "Coordenada_X": -3.6883,
          "Coordenada_Y": 40.4530
        }
      },
      {
        "ID_Lectura": 102,
        "Matricula": "1234ABC",
        "Fecha_y_Hora": "2024-03-01T10:00:01",
        "Carril": 2,
        "ID_Lector": "A1-PK25-N",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "A1 PK25 C2",
          "Carretera": "A-1",
          "PK": "PK25+000",
          "Coordenada_X": -3.6883,
          "Coordenada_Y": 40.4530
        }
      },
      {
        "ID_Lectura": 103,
        "Matricula": "9999ZZZ",
        "Fecha_y_Hora": "2024-03-01 10:05:00",
        "Carril": "1",
        "ID_Lector": "A1-PK25-N",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "A1 PK25 C1",
          "Carretera": "A-1",
          "PK": "PK25+000",
          "Coordenada_X": -3.6883,
          "Coordenada_Y": 40.4530
        }
      }
    ]"#
}

/// The messy historical cases: unnormalized plate, missing lector object
/// (location only recoverable from ID_Lector), a re-fed consolidated record
/// with a synthetic string id, and an unparseable timestamp.
#[cfg(test)]
pub(crate) fn fixture_messy_fields_json() -> &'static str {
    r#"[
      {
        "ID_Lectura": 50,
        "Matricula": "  5678xyz ",
        "Fecha_y_Hora": "2024-03-01T09:00:00",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "AP7 PK102 C1",
          "Carretera": "AP7",
          "PK": "102,500"
        }
      },
      {
        "ID_Lectura": 51,
        "Matricula": "5678XYZ",
        "Fecha_y_Hora": "2024-03-01T09:20:00",
        "ID_Lector": "M30-PK4+500-S",
        "Tipo_Fuente": "LPR"
      },
      {
        "ID_Lectura": "77_consolidated",
        "Matricula": "5678XYZ",
        "Fecha_y_Hora": "2024-03-01T09:40:00",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "AP7 PK110 [C1, C2]",
          "Carretera": "AP7",
          "PK": "110"
        }
      },
      {
        "ID_Lectura": 53,
        "Matricula": "5678XYZ",
        "Fecha_y_Hora": "not-a-date",
        "Tipo_Fuente": "LPR",
        "lector": {
          "Nombre": "AP7 PK120 C1",
          "Carretera": "AP7",
          "PK": "120"
        }
      }
    ]"#
}

/// A GPS-sourced point. GPS reads never participate in consolidation or
/// speed analysis; the analysis layers must count them as skipped.
#[cfg(test)]
pub(crate) fn fixture_gps_source_json() -> &'static str {
    r#"[
      {
        "ID_Lectura": 900,
        "Matricula": "1234ABC",
        "Fecha_y_Hora": "2024-03-01T10:00:00",
        "Coordenada_X": -3.70379,
        "Coordenada_Y": 40.41678,
        "Tipo_Fuente": "GPS"
      }
    ]"#
}

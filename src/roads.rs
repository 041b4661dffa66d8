/// Circular-road registry — loads roads.toml.
///
/// Ring roads have two kilometer-point paths between any two points; speed
/// estimation must use the shorter one. That correction needs the total
/// circumference of each ring road, which is configuration data rather than
/// code: circumferences live in `roads.toml` so new rings can be added
/// without recompiling the engine.
///
/// A compiled-in seed table (M-30, M-40) covers deployments that ship no
/// configuration file.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ---------------------------------------------------------------------------
// TOML configuration structures
// ---------------------------------------------------------------------------

/// Root structure for roads.toml parsing.
#[derive(Debug, Deserialize)]
struct RoadRegistry {
    road: Vec<CircularRoadConfig>,
}

/// One ring-road entry from roads.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct CircularRoadConfig {
    /// Road code as written in the file; normalized on load, so `"m30"` and
    /// `"M-30"` are the same road.
    pub code: String,
    /// Total ring circumference in kilometers.
    pub circumference_km: f64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Mapping from normalized road code to ring circumference in kilometers.
#[derive(Debug, Clone)]
pub struct CircularRoads {
    lengths: HashMap<String, f64>,
}

impl CircularRoads {
    /// Empty registry — no road is treated as circular.
    pub fn empty() -> Self {
        CircularRoads {
            lengths: HashMap::new(),
        }
    }

    /// Built-in seed table: the Madrid ring roads.
    pub fn seed() -> Self {
        let mut roads = CircularRoads::empty();
        roads.insert("M-30", 32.5);
        roads.insert("M-40", 63.3);
        roads
    }

    /// Loads the registry from a roads.toml file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a roads.toml document.
    pub fn from_toml_str(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let registry: RoadRegistry = toml::from_str(contents)?;

        let mut roads = CircularRoads::empty();
        for entry in registry.road {
            roads.insert(&entry.code, entry.circumference_km);
        }
        Ok(roads)
    }

    /// Adds or replaces a ring road. The code is normalized, so callers may
    /// pass any accepted road-code format.
    pub fn insert(&mut self, code: &str, circumference_km: f64) {
        self.lengths
            .insert(crate::location::parse_road_code(code), circumference_km);
    }

    /// Circumference of a ring road, looked up by normalized code. `None`
    /// means the road is not circular.
    pub fn circumference(&self, normalized_code: &str) -> Option<f64> {
        self.lengths.get(normalized_code).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl Default for CircularRoads {
    fn default() -> Self {
        CircularRoads::seed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

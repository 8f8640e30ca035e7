use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::aggregate::AggregateRow;
use crate::data::loader::LoadError;

/// Feature property names that carry the state name across the GeoJSON
/// sources in circulation, tried in order.
const NAME_PROPERTIES: [&str; 5] = ["NAME_1", "name", "st_nm", "STATE", "State"];

// ---------------------------------------------------------------------------
// Boundary index
// ---------------------------------------------------------------------------

/// Index of boundary identifiers from the external polygon collection,
/// keyed by normalized state name. Geometry is never interpreted here;
/// the pipeline's only obligation is producing a join key the rendering
/// layer can hand back to the same GeoJSON.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    /// normalized name → boundary identifier (the property value verbatim).
    by_key: BTreeMap<String, String>,
}

impl BoundaryIndex {
    /// Build the index from a parsed GeoJSON FeatureCollection.
    pub fn from_geojson(root: &JsonValue) -> Self {
        let mut by_key = BTreeMap::new();
        let features = root
            .get("features")
            .and_then(|f| f.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for feature in features {
            let Some(props) = feature.get("properties").and_then(|p| p.as_object()) else {
                continue;
            };
            let name = NAME_PROPERTIES
                .iter()
                .find_map(|key| props.get(*key).and_then(|v| v.as_str()));
            if let Some(name) = name {
                by_key.insert(boundary_key(name), name.to_string());
            }
        }
        BoundaryIndex { by_key }
    }

    pub fn resolve(&self, state: &str) -> Option<&str> {
        self.by_key.get(&boundary_key(state)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Load the boundary index from a GeoJSON file. Total unavailability is
/// fatal, same as the raw CSV source.
pub fn load_boundaries(path: &Path) -> Result<BoundaryIndex, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue =
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| {
            LoadError::BadGeoJson {
                path: path.to_path_buf(),
                source,
            }
        })?;
    let index = BoundaryIndex::from_geojson(&root);
    log::info!("indexed {} boundary features from {}", index.len(), path.display());
    Ok(index)
}

/// Join key for state names: case-insensitive, whitespace-insensitive.
pub fn boundary_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// One state's aggregate metrics, re-keyed by the boundary identifier the
/// map layer understands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRow {
    pub boundary_id: String,
    pub state: String,
    pub area: f64,
    pub production: f64,
    pub mean_yield: Option<f64>,
}

/// The join result, with the unmapped-row count kept for observability.
#[derive(Debug, Clone, Default)]
pub struct GeoJoinOutcome {
    pub rows: Vec<GeoRow>,
    /// State rows that matched no boundary feature. They stay in every
    /// non-geo aggregate; only the map omits them.
    pub unmapped: usize,
}

/// Map state-keyed aggregate rows onto boundary identifiers. Rows whose
/// state has no boundary match are dropped from the geo output and
/// counted — a missing polygon is a rendering gap, not an error.
pub fn join_boundaries(state_rows: &[AggregateRow], boundaries: &BoundaryIndex) -> GeoJoinOutcome {
    let mut outcome = GeoJoinOutcome::default();

    for row in state_rows {
        let Some(state) = row.single_key().and_then(|key| key.as_text()) else {
            outcome.unmapped += 1;
            continue;
        };
        match boundaries.resolve(state) {
            Some(boundary_id) => outcome.rows.push(GeoRow {
                boundary_id: boundary_id.to_string(),
                state: state.to_string(),
                area: row.area,
                production: row.production,
                mean_yield: row.mean_yield,
            }),
            None => {
                log::debug!("no boundary feature for state '{state}'");
                outcome.unmapped += 1;
            }
        }
    }

    if outcome.unmapped > 0 {
        log::warn!(
            "{} state rows had no boundary match and were left off the map",
            outcome.unmapped
        );
    }
    outcome
}

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Record – one row of the normalized table
// ---------------------------------------------------------------------------

/// A single normalized observation: one (state, district, year, season, crop)
/// cell with its cultivated area, total production and derived yield.
///
/// Missing numeric values are represented as `None`, never as NaN or ±∞.
///
/// Serializes with the field names the rendering layer depends on
/// (`yield`, not `yield_`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub state: String,
    pub district: String,
    /// Calendar year, taken from the leading 4-digit run of the raw label.
    pub year: i32,
    /// May be empty (the raw source leaves season blank for annual crops).
    pub season: String,
    pub crop: String,
    /// Cultivated area in hectares.
    pub area: f64,
    /// Total output in tonnes.
    pub production: f64,
    /// Production per hectare; `None` when area is zero (guarded divide).
    /// Named with a trailing underscore because `yield` is reserved.
    #[serde(rename = "yield")]
    pub yield_: Option<f64>,
}

// ---------------------------------------------------------------------------
// DimensionValue – a single component of a group key
// ---------------------------------------------------------------------------

/// One component of an aggregation group key. Years sort numerically,
/// text values lexically; `Ord` lets keys live in `BTreeMap`s so grouped
/// output comes back in a deterministic ascending order. Serializes
/// untagged (a plain string or number), matching what chart axes expect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Text(String),
    Year(i32),
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Text(s) => write!(f, "{s}"),
            DimensionValue::Year(y) => write!(f, "{y}"),
        }
    }
}

impl DimensionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DimensionValue::Text(s) => Some(s),
            DimensionValue::Year(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// NormalizeStats – per-load observability counters
// ---------------------------------------------------------------------------

/// Counts of rows repaired or dropped while normalizing the raw source.
/// Data-quality problems are recovered at the row they occur on; these
/// counters are the only trace they leave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Rows that could not be parsed into the minimal schema at all.
    pub malformed_rows: usize,
    /// Rows dropped because the year label carried no 4-digit run.
    pub unparsable_years: usize,
    /// Rows dropped because the crop cell was blank.
    pub missing_crop: usize,
    /// Rows kept with a missing yield (area was zero or the divide
    /// produced a non-finite value).
    pub zero_area_yields: usize,
}

impl NormalizeStats {
    /// Total rows that did not make it into the table.
    pub fn dropped(&self) -> usize {
        self.malformed_rows + self.unparsable_years + self.missing_crop
    }
}

// ---------------------------------------------------------------------------
// CropDataset – the complete normalized table
// ---------------------------------------------------------------------------

/// The full normalized dataset with pre-computed unique-value indices.
///
/// The indices back the dashboard's filter widgets: sorted sets of every
/// state, crop, season and year, plus a per-state district index used for
/// the cascading state → district filter.
#[derive(Debug, Clone)]
pub struct CropDataset {
    /// All normalized records (rows), in source order.
    pub records: Vec<Record>,
    /// Sorted unique states.
    pub states: BTreeSet<String>,
    /// Sorted unique crops.
    pub crops: BTreeSet<String>,
    /// Sorted unique seasons (may contain the empty string).
    pub seasons: BTreeSet<String>,
    /// Sorted unique years.
    pub years: BTreeSet<i32>,
    /// Districts observed under each state (the cascade index).
    pub districts_by_state: BTreeMap<String, BTreeSet<String>>,
    /// Counters left behind by normalization.
    pub stats: NormalizeStats,
}

impl CropDataset {
    /// Build the unique-value indices from normalized records.
    pub fn from_records(records: Vec<Record>, stats: NormalizeStats) -> Self {
        let mut states = BTreeSet::new();
        let mut crops = BTreeSet::new();
        let mut seasons = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut districts_by_state: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for rec in &records {
            states.insert(rec.state.clone());
            crops.insert(rec.crop.clone());
            seasons.insert(rec.season.clone());
            years.insert(rec.year);
            districts_by_state
                .entry(rec.state.clone())
                .or_default()
                .insert(rec.district.clone());
        }

        CropDataset {
            records,
            states,
            crops,
            seasons,
            years,
            districts_by_state,
            stats,
        }
    }

    /// All districts across every state.
    pub fn all_districts(&self) -> BTreeSet<String> {
        self.districts_by_state
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

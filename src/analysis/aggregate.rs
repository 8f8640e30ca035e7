use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{DimensionValue, Record};

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// A groupable dimension of the normalized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    State,
    District,
    Crop,
    Season,
    Year,
}

impl Dimension {
    fn value_of(self, rec: &Record) -> DimensionValue {
        match self {
            Dimension::State => DimensionValue::Text(rec.state.clone()),
            Dimension::District => DimensionValue::Text(rec.district.clone()),
            Dimension::Crop => DimensionValue::Text(rec.crop.clone()),
            Dimension::Season => DimensionValue::Text(rec.season.clone()),
            Dimension::Year => DimensionValue::Year(rec.year),
        }
    }
}

// ---------------------------------------------------------------------------
// Group-by aggregation
// ---------------------------------------------------------------------------

/// One output group: the projected key plus summed area/production and the
/// mean of the group's non-missing yields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Vec<DimensionValue>,
    pub area: f64,
    pub production: f64,
    /// `None` when the group has no non-missing yield at all.
    pub mean_yield: Option<f64>,
}

impl AggregateRow {
    /// The key component for single-dimension groupings; `None` for the
    /// grand-total row an empty dimension slice produces.
    pub fn single_key(&self) -> Option<&DimensionValue> {
        self.key.first()
    }
}

#[derive(Default)]
struct Accumulator {
    area: f64,
    production: f64,
    yield_sum: f64,
    yield_count: usize,
}

/// Group records by one or more dimensions.
///
/// Per group: `area` and `production` are exact sums; `mean_yield`
/// averages only non-missing yields and is `None` (not zero) when every
/// member's yield is missing. Output is sorted ascending by group key,
/// which makes repeated runs byte-for-byte reproducible.
pub fn aggregate(records: &[&Record], dimensions: &[Dimension]) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<Vec<DimensionValue>, Accumulator> = BTreeMap::new();

    for rec in records {
        let key: Vec<DimensionValue> = dimensions.iter().map(|d| d.value_of(rec)).collect();
        let acc = groups.entry(key).or_default();
        acc.area += rec.area;
        acc.production += rec.production;
        if let Some(y) = rec.yield_ {
            acc.yield_sum += y;
            acc.yield_count += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| AggregateRow {
            key,
            area: acc.area,
            production: acc.production,
            mean_yield: (acc.yield_count > 0).then(|| acc.yield_sum / acc.yield_count as f64),
        })
        .collect()
}

/// The `n` largest groups of `dimension` by total production, descending.
/// Ties keep ascending key order (the underlying sort is stable).
pub fn top_n_by_production(
    records: &[&Record],
    dimension: Dimension,
    n: usize,
) -> Vec<AggregateRow> {
    let mut rows = aggregate(records, &[dimension]);
    rows.sort_by(|a, b| b.production.total_cmp(&a.production));
    rows.truncate(n);
    rows
}

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// The three numeric columns the dashboard correlates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Area,
    Production,
    Yield,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Area, Metric::Production, Metric::Yield];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Area => "Area",
            Metric::Production => "Production",
            Metric::Yield => "Yield",
        }
    }

    fn index(self) -> usize {
        match self {
            Metric::Area => 0,
            Metric::Production => 1,
            Metric::Yield => 2,
        }
    }
}

/// Symmetric 3×3 Pearson matrix over {Area, Production, Yield}.
/// Diagonal is fixed at 1.0; an off-diagonal entry is `None` when it is
/// undefined (fewer than 2 complete rows, or a zero-variance column).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    values: [[Option<f64>; 3]; 3],
}

impl CorrelationMatrix {
    pub fn get(&self, row: Metric, col: Metric) -> Option<f64> {
        self.values[row.index()][col.index()]
    }
}

/// Pearson correlation pairwise over area, production and yield, using
/// only rows where all three are present. Normalization guarantees the
/// kept values are finite, so no further screening is needed here.
pub fn correlate(records: &[&Record]) -> CorrelationMatrix {
    let complete: Vec<[f64; 3]> = records
        .iter()
        .filter_map(|rec| rec.yield_.map(|y| [rec.area, rec.production, y]))
        .collect();

    let mut values = [[None; 3]; 3];
    for m in Metric::ALL {
        values[m.index()][m.index()] = Some(1.0);
    }

    if complete.len() < 2 {
        return CorrelationMatrix { values };
    }

    for a in Metric::ALL {
        for b in Metric::ALL {
            if a.index() < b.index() {
                let r = pearson(&complete, a.index(), b.index());
                values[a.index()][b.index()] = r;
                values[b.index()][a.index()] = r;
            }
        }
    }
    CorrelationMatrix { values }
}

fn pearson(rows: &[[f64; 3]], i: usize, j: usize) -> Option<f64> {
    let n = rows.len() as f64;
    let mean_i = rows.iter().map(|r| r[i]).sum::<f64>() / n;
    let mean_j = rows.iter().map(|r| r[j]).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_i = 0.0;
    let mut var_j = 0.0;
    for r in rows {
        let di = r[i] - mean_i;
        let dj = r[j] - mean_j;
        cov += di * dj;
        var_i += di * di;
        var_j += dj * dj;
    }

    let denom = (var_i * var_j).sqrt();
    // Zero variance in either column: correlation is undefined, not 0.
    if denom == 0.0 {
        return None;
    }
    // Clamp rounding spill so consumers can rely on [-1, 1].
    Some((cov / denom).clamp(-1.0, 1.0))
}

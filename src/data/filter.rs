use std::collections::BTreeSet;

use super::model::{CropDataset, Record};

// ---------------------------------------------------------------------------
// Filter selection: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Multi-select state for the five filterable dimensions.
///
/// An empty set means "no constraint, pass all" for that dimension.
/// Dimensions compose with AND; within a dimension membership is OR.
/// Values that no longer exist in the data (stale UI state) simply match
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub states: BTreeSet<String>,
    pub districts: BTreeSet<String>,
    pub crops: BTreeSet<String>,
    pub seasons: BTreeSet<String>,
    pub years: BTreeSet<i32>,
}

impl FilterSelection {
    /// True when no dimension constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.states.is_empty()
            && self.districts.is_empty()
            && self.crops.is_empty()
            && self.seasons.is_empty()
            && self.years.is_empty()
    }

    /// Whether a single record passes every active dimension.
    pub fn matches(&self, rec: &Record) -> bool {
        passes(&self.states, &rec.state)
            && passes(&self.districts, &rec.district)
            && passes(&self.crops, &rec.crop)
            && passes(&self.seasons, &rec.season)
            && (self.years.is_empty() || self.years.contains(&rec.year))
    }
}

fn passes(selected: &BTreeSet<String>, value: &str) -> bool {
    selected.is_empty() || selected.contains(value)
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of records that pass all active filters, in source
/// order. The dataset is never mutated.
pub fn filtered_indices(dataset: &CropDataset, selection: &FilterSelection) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| selection.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Borrowing convenience over [`filtered_indices`]: the filtered view as
/// record references, in source order.
pub fn select<'a>(dataset: &'a CropDataset, selection: &FilterSelection) -> Vec<&'a Record> {
    dataset
        .records
        .iter()
        .filter(|rec| selection.matches(rec))
        .collect()
}

/// District candidates for the cascading state → district widget: the
/// union of districts under the selected states, or every district when
/// no state is selected. Recompute whenever the state selection changes.
pub fn available_districts(dataset: &CropDataset, states: &BTreeSet<String>) -> BTreeSet<String> {
    if states.is_empty() {
        return dataset.all_districts();
    }
    states
        .iter()
        .filter_map(|state| dataset.districts_by_state.get(state))
        .flat_map(|set| set.iter().cloned())
        .collect()
}

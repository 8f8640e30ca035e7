use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::data::model::Record;

/// Distinct years of history a (crop, state) pair is judged over.
pub const DEFAULT_WINDOW_YEARS: usize = 5;

/// Minimum decline percentage that produces an alert at all.
pub const ALERT_THRESHOLD_PCT: f64 = 10.0;

// ---------------------------------------------------------------------------
// Severity bands
// ---------------------------------------------------------------------------

/// Alert tier for a detected yield decline. Band edges are exclusive on
/// the lower bound: 20.0% is still Moderate, 20.01% is High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Decline in (10%, 20%].
    Moderate,
    /// Decline in (20%, 30%].
    High,
    /// Decline above 30%.
    Critical,
}

impl Severity {
    /// Band for a decline percentage, or `None` below the alert threshold.
    pub fn classify(decline_pct: f64) -> Option<Severity> {
        if decline_pct > 30.0 {
            Some(Severity::Critical)
        } else if decline_pct > 20.0 {
            Some(Severity::High)
        } else if decline_pct > ALERT_THRESHOLD_PCT {
            Some(Severity::Moderate)
        } else {
            None
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        })
    }
}

// ---------------------------------------------------------------------------
// DeclineRecord
// ---------------------------------------------------------------------------

/// One yield-decline alert for a (crop, state) pair. The field names are
/// the rendering layer's contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclineRecord {
    pub crop: String,
    pub state: String,
    /// Relative drop from the early-period to the recent-period average
    /// yield, as a percentage of the early value. Always above
    /// [`ALERT_THRESHOLD_PCT`] — smaller or negative movements (yield
    /// improved) are not alerts.
    pub decline_percentage: f64,
    pub early_yield: f64,
    pub recent_yield: f64,
    pub severity: Severity,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detect (crop, state) pairs whose average yield dropped by more than
/// 10% between the early and recent end of their own history.
///
/// Per pair: restrict to the most recent `window_years` distinct years
/// *present in that pair's records* (not a fixed calendar window), then
/// compare the mean yield of the 2 earliest of those years against the
/// 2 latest. With 3 distinct years the periods overlap in the middle
/// year; with 2 they coincide. Both are fine — the comparison just
/// flattens toward zero. Pairs with fewer than 2 distinct years, or
/// without a usable early-period yield, are silently skipped: absence of
/// evidence is not an alert, so data-quality gaps never raise.
///
/// Output is sorted by decline percentage descending.
pub fn detect_decline(records: &[&Record], window_years: usize) -> Vec<DeclineRecord> {
    let mut partitions: BTreeMap<(&str, &str), Vec<&Record>> = BTreeMap::new();
    for rec in records {
        partitions
            .entry((rec.crop.as_str(), rec.state.as_str()))
            .or_default()
            .push(rec);
    }

    let mut alerts = Vec::new();

    for ((crop, state), members) in partitions {
        let distinct_years: BTreeSet<i32> = members.iter().map(|r| r.year).collect();
        if distinct_years.len() < 2 {
            continue;
        }

        // The pair's own most recent `window_years` distinct years.
        let window: Vec<i32> = {
            let mut years: Vec<i32> = distinct_years.into_iter().collect();
            let skip = years.len().saturating_sub(window_years);
            years.split_off(skip)
        };
        if window.len() < 2 {
            continue;
        }

        let early_years = &window[..2.min(window.len())];
        let recent_years = &window[window.len().saturating_sub(2)..];

        let early_yield = period_mean_yield(&members, early_years);
        let recent_yield = period_mean_yield(&members, recent_years);

        // A missing or non-positive early yield leaves no safe baseline
        // to divide by.
        let (Some(early_yield), Some(recent_yield)) = (early_yield, recent_yield) else {
            continue;
        };
        if early_yield <= 0.0 {
            continue;
        }

        let decline_percentage = (early_yield - recent_yield) / early_yield * 100.0;
        let Some(severity) = Severity::classify(decline_percentage) else {
            continue;
        };

        alerts.push(DeclineRecord {
            crop: crop.to_string(),
            state: state.to_string(),
            decline_percentage,
            early_yield,
            recent_yield,
            severity,
        });
    }

    // Worst first; ties keep (crop, state) order from the partition map.
    alerts.sort_by(|a, b| b.decline_percentage.total_cmp(&a.decline_percentage));
    alerts
}

/// Mean of the non-missing yields of records falling in `years`, or
/// `None` when the period holds no usable yield.
fn period_mean_yield(members: &[&Record], years: &[i32]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for rec in members {
        if years.contains(&rec.year) {
            if let Some(y) = rec.yield_ {
                sum += y;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(crop: &str, state: &str, year: i32, yield_: Option<f64>) -> Record {
        Record {
            state: state.to_string(),
            district: "D".to_string(),
            year,
            season: "Kharif".to_string(),
            crop: crop.to_string(),
            area: 1.0,
            production: yield_.unwrap_or(0.0),
            yield_,
        }
    }

    /// One record per year: two early years at `early`, two recent at
    /// `recent`.
    fn four_year_pair(crop: &str, state: &str, early: f64, recent: f64) -> Vec<Record> {
        vec![
            rec(crop, state, 2016, Some(early)),
            rec(crop, state, 2017, Some(early)),
            rec(crop, state, 2018, Some(recent)),
            rec(crop, state, 2019, Some(recent)),
        ]
    }

    fn detect(records: &[Record]) -> Vec<DeclineRecord> {
        let refs: Vec<&Record> = records.iter().collect();
        detect_decline(&refs, DEFAULT_WINDOW_YEARS)
    }

    #[test]
    fn severity_bands_at_reference_points() {
        let cases = [
            (65.0, Some(Severity::Critical)), // 35%
            (75.0, Some(Severity::High)),     // 25%
            (85.0, Some(Severity::Moderate)), // 15%
            (95.0, None),                     // 5% → below threshold
            (105.0, None),                    // improvement → never an alert
        ];
        for (recent, expected) in cases {
            let records = four_year_pair("Rice", "Gujarat", 100.0, recent);
            let alerts = detect(&records);
            match expected {
                Some(severity) => {
                    assert_eq!(alerts.len(), 1, "recent={recent}");
                    let alert = &alerts[0];
                    assert_eq!(alert.severity, severity);
                    assert!((alert.decline_percentage - (100.0 - recent)).abs() < 1e-9);
                    assert_eq!(alert.early_yield, 100.0);
                    assert_eq!(alert.recent_yield, recent);
                }
                None => assert!(alerts.is_empty(), "recent={recent}"),
            }
        }
    }

    #[test]
    fn band_edges_are_inclusive_on_the_upper_bound() {
        assert_eq!(Severity::classify(30.0), Some(Severity::High));
        assert_eq!(Severity::classify(30.001), Some(Severity::Critical));
        assert_eq!(Severity::classify(20.0), Some(Severity::Moderate));
        assert_eq!(Severity::classify(10.0), None);
    }

    #[test]
    fn single_distinct_year_is_skipped() {
        let records = vec![
            rec("Rice", "Gujarat", 2019, Some(100.0)),
            rec("Rice", "Gujarat", 2019, Some(10.0)),
        ];
        assert!(detect(&records).is_empty());
    }

    #[test]
    fn two_distinct_years_coincide_and_never_alert() {
        // Early and recent periods are the same two years, so the
        // computed decline is exactly zero.
        let records = vec![
            rec("Rice", "Gujarat", 2018, Some(100.0)),
            rec("Rice", "Gujarat", 2019, Some(10.0)),
        ];
        assert!(detect(&records).is_empty());
    }

    #[test]
    fn three_distinct_years_overlap_in_the_middle() {
        // early = {2017, 2018}, recent = {2018, 2019}.
        let records = vec![
            rec("Rice", "Gujarat", 2017, Some(100.0)),
            rec("Rice", "Gujarat", 2018, Some(100.0)),
            rec("Rice", "Gujarat", 2019, Some(10.0)),
        ];
        let alerts = detect(&records);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].early_yield, 100.0);
        assert_eq!(alerts[0].recent_yield, 55.0);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn window_restricts_to_each_pairs_recent_years() {
        // The collapse sits 10 years back; inside the last 5 distinct
        // years the yield is flat, so no alert.
        let mut records: Vec<Record> = (2006..=2009)
            .map(|y| rec("Rice", "Gujarat", y, Some(100.0)))
            .collect();
        records.extend((2016..=2020).map(|y| rec("Rice", "Gujarat", y, Some(10.0))));
        assert!(detect(&records).is_empty());

        // Shrink nothing and widen the window: the old highs re-enter the
        // early period and the drop becomes visible.
        let refs: Vec<&Record> = records.iter().collect();
        let alerts = detect_decline(&refs, 9);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn unusable_early_period_is_skipped_not_an_error() {
        // Early yields all missing.
        let records = vec![
            rec("Rice", "Gujarat", 2016, None),
            rec("Rice", "Gujarat", 2017, None),
            rec("Rice", "Gujarat", 2018, Some(50.0)),
            rec("Rice", "Gujarat", 2019, Some(40.0)),
        ];
        assert!(detect(&records).is_empty());

        // Early yield exactly zero: no safe percentage baseline.
        let records = four_year_pair("Rice", "Gujarat", 0.0, 40.0);
        assert!(detect(&records).is_empty());
    }

    #[test]
    fn output_sorted_by_decline_descending() {
        let mut records = four_year_pair("Rice", "Gujarat", 100.0, 85.0); // 15%
        records.extend(four_year_pair("Wheat", "Punjab", 100.0, 60.0)); // 40%
        records.extend(four_year_pair("Maize", "Bihar", 100.0, 75.0)); // 25%

        let alerts = detect(&records);
        let order: Vec<&str> = alerts.iter().map(|a| a.crop.as_str()).collect();
        assert_eq!(order, vec!["Wheat", "Maize", "Rice"]);
        assert!(alerts
            .windows(2)
            .all(|w| w[0].decline_percentage >= w[1].decline_percentage));
    }

    #[test]
    fn alerts_serialize_with_contract_field_names() {
        let records = four_year_pair("Rice", "Gujarat", 100.0, 65.0);
        let alerts = detect(&records);
        let value = serde_json::to_value(&alerts[0]).unwrap();

        assert_eq!(value["crop"], "Rice");
        assert_eq!(value["state"], "Gujarat");
        assert_eq!(value["decline_percentage"], 35.0);
        assert_eq!(value["early_yield"], 100.0);
        assert_eq!(value["recent_yield"], 65.0);
        assert_eq!(value["severity"], "Critical");
    }

    #[test]
    fn partitions_are_independent_per_crop_and_state() {
        // Same crop declining in one state only.
        let mut records = four_year_pair("Rice", "Gujarat", 100.0, 60.0);
        records.extend(four_year_pair("Rice", "Punjab", 100.0, 100.0));
        let alerts = detect(&records);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].state, "Gujarat");
    }
}

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{CropDataset, NormalizeStats, Record};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal load failures. Per-row data-quality problems never show up here;
/// they are skipped and counted in [`NormalizeStats`]. Only total
/// unavailability of a source escalates, so the caller (the dashboard
/// shell) can recognize it and render a fallback.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("source unreadable as CSV: {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("source missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("boundary source is not valid GeoJSON: {path}: {source}")]
    BadGeoJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw rows – the pre-normalization view of the source
// ---------------------------------------------------------------------------

/// The seven raw columns, still as text. Everything the normalizer needs
/// passes through this struct, so normalization is testable without a file.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub state: &'a str,
    pub district: &'a str,
    /// Compound label, e.g. `"2019-20"`, or a bare year.
    pub year: &'a str,
    pub season: &'a str,
    pub crop: &'a str,
    pub area: &'a str,
    pub production: &'a str,
}

/// Column names expected in the raw source header (matched after trimming,
/// case-insensitively).
const REQUIRED_COLUMNS: [&str; 7] = [
    "State",
    "District",
    "Year",
    "Season",
    "Crop",
    "Area",
    "Production",
];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and normalize the raw agriculture CSV.
///
/// A missing or unreadable file is fatal ([`LoadError`]); malformed rows
/// are skipped and counted. The returned dataset carries the skip
/// counters in [`CropDataset::stats`].
pub fn load_csv(path: &Path) -> Result<CropDataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_csv(file, path)?;
    log::info!(
        "loaded {} records from {} ({} states, {} crops, {} distinct years)",
        dataset.len(),
        path.display(),
        dataset.states.len(),
        dataset.crops.len(),
        dataset.years.len(),
    );
    let stats = dataset.stats;
    if stats.dropped() > 0 {
        log::warn!(
            "dropped {} raw rows (malformed: {}, unparsable year: {}, missing crop: {})",
            stats.dropped(),
            stats.malformed_rows,
            stats.unparsable_years,
            stats.missing_crop,
        );
    }
    if stats.zero_area_yields > 0 {
        log::debug!("{} records kept with missing yield", stats.zero_area_yields);
    }
    Ok(dataset)
}

/// Parse and normalize CSV content from any reader. `path` is only used
/// for error messages.
pub fn read_csv<R: Read>(reader: R, path: &Path) -> Result<CropDataset, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    // Header names arrive with stray whitespace in the wild; trim before
    // resolving column positions.
    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut col = [0usize; 7];
    for (slot, name) in col.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))?;
    }
    let [state_idx, district_idx, year_idx, season_idx, crop_idx, area_idx, production_idx] = col;

    let mut records = Vec::new();
    let mut stats = NormalizeStats::default();

    for row in csv_reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(err) => {
                log::debug!("skipping unreadable row: {err}");
                stats.malformed_rows += 1;
                continue;
            }
        };
        let raw = RawRecord {
            state: row.get(state_idx).unwrap_or(""),
            district: row.get(district_idx).unwrap_or(""),
            year: row.get(year_idx).unwrap_or(""),
            season: row.get(season_idx).unwrap_or(""),
            crop: row.get(crop_idx).unwrap_or(""),
            area: row.get(area_idx).unwrap_or(""),
            production: row.get(production_idx).unwrap_or(""),
        };
        if let Some(rec) = normalize_record(&raw, &mut stats) {
            records.push(rec);
        }
    }

    Ok(CropDataset::from_records(records, stats))
}

// ---------------------------------------------------------------------------
// Normalization – pure, row at a time
// ---------------------------------------------------------------------------

/// Normalize one raw row. Returns `None` when the row is dropped (missing
/// crop, unparsable year, unparsable numerics); the reason is counted in
/// `stats`. Normalization is a fixed point: feeding a normalized record's
/// fields back through produces an identical record.
pub fn normalize_record(raw: &RawRecord<'_>, stats: &mut NormalizeStats) -> Option<Record> {
    let crop = raw.crop.trim();
    if crop.is_empty() {
        stats.missing_crop += 1;
        return None;
    }

    // Whole-record drop on an unparsable year label: a record that cannot
    // be placed on the time axis would silently skew year-bucketed views
    // while still counting in year-agnostic ones.
    let Some(year) = parse_year(raw.year) else {
        stats.unparsable_years += 1;
        return None;
    };

    let (Some(area), Some(production)) = (parse_float(raw.area), parse_float(raw.production))
    else {
        stats.malformed_rows += 1;
        return None;
    };

    let yield_ = guarded_div(production, area);
    if yield_.is_none() {
        stats.zero_area_yields += 1;
    }

    Some(Record {
        state: raw.state.trim().to_string(),
        district: raw.district.trim().to_string(),
        year,
        // Blank season is data, not damage; keep the record.
        season: raw.season.trim().to_string(),
        crop: crop.to_string(),
        area,
        production,
        yield_,
    })
}

/// Extract the calendar year from a `"YYYY-YY"` style label (or a bare
/// year) by taking the first 4-digit run.
pub fn parse_year(label: &str) -> Option<i32> {
    let bytes = label.trim().as_bytes();
    let mut run_start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            let start = *run_start.get_or_insert(i);
            if i - start + 1 == 4 {
                // First 4 digits of the first long-enough run.
                return label.trim()[start..start + 4].parse().ok();
            }
        } else {
            run_start = None;
        }
    }
    None
}

fn parse_float(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Division that can never leak a non-finite value: `x / 0` and `0 / 0`
/// both come back as `None`.
pub fn guarded_div(numerator: f64, denominator: f64) -> Option<f64> {
    let q = numerator / denominator;
    q.is_finite().then_some(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
State ,District,Year,Season,Crop,Area,Production
Gujarat , Rajkot ,2018-19,Kharif , Rice ,100,250
Gujarat,Surat,2019-20,,Wheat,0,50
Punjab,Amritsar,2019-20,Rabi,Rice,80,abc
Punjab,Ludhiana,nineteen,Rabi,Rice,80,160
Punjab,Patiala,2020-21,Rabi,,80,160
Haryana,Karnal,2021,Rabi,Rice,50,175
";

    fn load_fixture() -> CropDataset {
        read_csv(CSV.as_bytes(), Path::new("fixture.csv")).unwrap()
    }

    #[test]
    fn trims_headers_and_cells() {
        let ds = load_fixture();
        let first = &ds.records[0];
        assert_eq!(first.state, "Gujarat");
        assert_eq!(first.district, "Rajkot");
        assert_eq!(first.crop, "Rice");
        assert_eq!(first.season, "Kharif");
        assert_eq!(first.year, 2018);
    }

    #[test]
    fn derives_yield_and_guards_zero_area() {
        let ds = load_fixture();
        assert_eq!(ds.records[0].yield_, Some(2.5));
        // Surat row: area 0 → yield missing, record kept.
        let surat = ds.records.iter().find(|r| r.district == "Surat").unwrap();
        assert_eq!(surat.yield_, None);
        assert_eq!(ds.stats.zero_area_yields, 1);
        // Invariant: nothing non-finite survives normalization.
        assert!(ds
            .records
            .iter()
            .all(|r| r.yield_.map_or(true, f64::is_finite)));
    }

    #[test]
    fn drops_and_counts_bad_rows() {
        let ds = load_fixture();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.stats.malformed_rows, 1); // non-numeric production
        assert_eq!(ds.stats.unparsable_years, 1); // "nineteen"
        assert_eq!(ds.stats.missing_crop, 1);
        assert!(ds.records.iter().all(|r| !r.crop.is_empty()));
    }

    #[test]
    fn missing_season_becomes_empty_string() {
        let ds = load_fixture();
        let surat = ds.records.iter().find(|r| r.district == "Surat").unwrap();
        assert_eq!(surat.season, "");
        assert!(ds.seasons.contains(""));
    }

    #[test]
    fn year_parsing_takes_leading_four_digit_run() {
        assert_eq!(parse_year("2019-20"), Some(2019));
        assert_eq!(parse_year(" 2019 "), Some(2019));
        assert_eq!(parse_year("1997-1998"), Some(1997));
        assert_eq!(parse_year("20195"), Some(2019));
        assert_eq!(parse_year("19-20"), None);
        assert_eq!(parse_year("nineteen"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn missing_file_is_a_distinct_fatal_error() {
        let err = load_csv(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
    }

    #[test]
    fn missing_column_is_fatal() {
        let bad = "State,District,Year,Season,Crop,Area\nGujarat,Rajkot,2018,K,Rice,1\n";
        let err = read_csv(bad.as_bytes(), Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Production")));
    }

    #[test]
    fn normalization_is_idempotent() {
        let ds = load_fixture();
        for rec in &ds.records {
            let year_label = rec.year.to_string();
            let area = rec.area.to_string();
            let production = rec.production.to_string();
            let raw = RawRecord {
                state: &rec.state,
                district: &rec.district,
                year: &year_label,
                season: &rec.season,
                crop: &rec.crop,
                area: &area,
                production: &production,
            };
            let mut stats = NormalizeStats::default();
            let again = normalize_record(&raw, &mut stats).unwrap();
            assert_eq!(&again, rec);
        }
    }
}

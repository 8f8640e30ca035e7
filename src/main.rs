use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use yieldwatch::analysis::aggregate::{self, Dimension, Metric};
use yieldwatch::analysis::{decline, geo, sample};
use yieldwatch::cache::TableCache;
use yieldwatch::data::filter::{self, FilterSelection};

/// Textual dry run of the whole pipeline: load → filter → analyze →
/// print. Stands in for the dashboard's rendering layer.
///
/// Usage: `yieldwatch <data.csv> [boundaries.geojson]`
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let data_path: PathBuf = args
        .next()
        .context("usage: yieldwatch <data.csv> [boundaries.geojson]")?
        .into();
    let geojson_path: Option<PathBuf> = args.next().map(Into::into);

    let mut cache = TableCache::new();
    let dataset = cache
        .get_or_load(&data_path)
        .context("loading raw agriculture data")?;

    // Unconstrained selection: the caller decides defaults, not the
    // pipeline.
    let selection = FilterSelection::default();
    let view = filter::select(&dataset, &selection);

    let year_span = match (dataset.years.first(), dataset.years.last()) {
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => "n/a".to_string(),
    };
    println!(
        "{} records | {} states | {} crops | years {} | {} raw rows dropped",
        view.len(),
        dataset.states.len(),
        dataset.crops.len(),
        year_span,
        dataset.stats.dropped(),
    );

    // ---- Yield decline alerts ----
    let alerts = decline::detect_decline(&view, decline::DEFAULT_WINDOW_YEARS);
    println!("\nYield decline alerts: {}", alerts.len());
    for alert in alerts.iter().take(10) {
        println!(
            "  {:<8} {:>6.2}%  {} / {}  (early {:.2} → recent {:.2})",
            alert.severity.to_string(),
            alert.decline_percentage,
            alert.crop,
            alert.state,
            alert.early_yield,
            alert.recent_yield,
        );
    }

    // ---- Time series by year ----
    println!("\nPer-year totals:");
    for row in aggregate::aggregate(&view, &[Dimension::Year]) {
        println!(
            "  {}  area {:>14.1}  production {:>16.1}  mean yield {}",
            fmt_key(&row),
            row.area,
            row.production,
            fmt_opt(row.mean_yield),
        );
    }

    // ---- Top producing districts ----
    println!("\nTop districts by production:");
    for row in aggregate::top_n_by_production(&view, Dimension::District, 10) {
        println!("  {:<24} {:>16.1}", fmt_key(&row), row.production);
    }

    // ---- Correlation matrix ----
    let matrix = aggregate::correlate(&view);
    println!("\nCorrelation (Area / Production / Yield):");
    for a in Metric::ALL {
        let cells: Vec<String> = Metric::ALL
            .iter()
            .map(|b| fmt_opt(matrix.get(a, *b)))
            .collect();
        println!("  {:<11} {}", a.label(), cells.join("  "));
    }

    // ---- Scatter sample ----
    let indices = sample::sample_indices(view.len(), sample::DEFAULT_SAMPLE_CAP, None);
    println!("\nScatter sample: {} of {} rows", indices.len(), view.len());

    // ---- Geo join ----
    if let Some(geojson_path) = geojson_path {
        print_geo_summary(&view, &geojson_path)?;
    }

    Ok(())
}

fn print_geo_summary(view: &[&yieldwatch::Record], geojson_path: &Path) -> Result<()> {
    let boundaries =
        geo::load_boundaries(geojson_path).context("loading boundary GeoJSON")?;
    let state_rows = aggregate::aggregate(view, &[Dimension::State]);
    let outcome = geo::join_boundaries(&state_rows, &boundaries);

    println!(
        "\nGeo join: {} states mapped, {} unmapped",
        outcome.rows.len(),
        outcome.unmapped
    );
    for row in &outcome.rows {
        println!(
            "  {:<24} yield {}  production {:>16.1}",
            row.boundary_id,
            fmt_opt(row.mean_yield),
            row.production,
        );
    }
    Ok(())
}

fn fmt_key(row: &aggregate::AggregateRow) -> String {
    row.single_key().map(ToString::to_string).unwrap_or_default()
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:>7.3}"),
        None => "      –".to_string(),
    }
}

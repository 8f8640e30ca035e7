use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Writes a deterministic synthetic agriculture CSV with planted yield
/// trends, so the demo binary and manual testing have an input that
/// exercises the whole pipeline (including decline alerts and the rows
/// normalization has to repair).
fn main() {
    let mut rng = StdRng::seed_from_u64(42);

    let states: [(&str, &[&str]); 3] = [
        ("Gujarat", &["Rajkot", "Surat", "Vadodara"]),
        ("Punjab", &["Amritsar", "Ludhiana", "Patiala"]),
        ("Tamil Nadu", &["Madurai", "Salem"]),
    ];
    let crops = ["Rice", "Wheat", "Maize"];
    let seasons = ["Kharif", "Rabi"];
    let years = 2014..=2023;

    // (crop, state) pairs with a planted downward yield trend; everything
    // else drifts sideways.
    let declining = [("Rice", "Gujarat", 0.08), ("Wheat", "Punjab", 0.04)];

    let output_path = "sample_agriculture.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record(["State", "District", "Year", "Season", "Crop", "Area", "Production"])
        .expect("Failed to write header");

    let mut rows: u64 = 0;
    for (state, districts) in states {
        for &district in districts {
            for crop in crops {
                let base_yield = 1.5 + rng.gen::<f64>() * 2.0;
                let decline_rate = declining
                    .iter()
                    .find(|(c, s, _)| *c == crop && *s == state)
                    .map(|(_, _, rate)| *rate)
                    .unwrap_or(0.0);

                for year in years.clone() {
                    for season in seasons {
                        let age = (year - 2014) as f64;
                        let trend = (1.0 - decline_rate * age).max(0.1);
                        let noise = 1.0 + (rng.gen::<f64>() - 0.5) * 0.1;

                        // A sprinkle of zero-area rows keeps the guarded
                        // divide honest downstream.
                        let area = if rng.gen::<f64>() < 0.01 {
                            0.0
                        } else {
                            (500.0 + rng.gen::<f64>() * 4500.0).round()
                        };
                        let production = (area * base_yield * trend * noise).round();

                        let year_label = format!("{year}-{:02}", (year + 1) % 100);
                        let area_cell = area.to_string();
                        let production_cell = production.to_string();
                        writer
                            .write_record([
                                state,
                                district,
                                year_label.as_str(),
                                season,
                                crop,
                                area_cell.as_str(),
                                production_cell.as_str(),
                            ])
                            .expect("Failed to write row");
                        rows += 1;
                    }
                }
            }
        }
    }

    // A few broken rows the normalizer must absorb: blank crop, blank
    // season, unparsable year.
    for raw in [
        ["Gujarat", "Rajkot", "2020-21", "Kharif", "", "100", "250"],
        ["Gujarat", "Surat", "2020-21", "", "Rice", "120", "300"],
        ["Punjab", "Patiala", "unknown", "Rabi", "Wheat", "80", "160"],
    ] {
        writer.write_record(raw).expect("Failed to write row");
        rows += 1;
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {rows} rows to {output_path}");
}

/// Data layer: core types, ingest/normalization, and filtering.
///
/// Architecture:
/// ```text
///  raw agriculture .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + normalize rows → CropDataset
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ CropDataset  │  Vec<Record>, unique-value indices
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply a FilterSelection → filtered indices
///   └──────────┘
/// ```
///
/// Everything past the loader is pure: filtering and the analysis layer
/// never mutate the dataset and never touch the filesystem.

pub mod filter;
pub mod loader;
pub mod model;

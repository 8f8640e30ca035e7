//! Yieldwatch – the data processing pipeline behind a crop production &
//! yield dashboard.
//!
//! The pipeline ingests a raw state/district/year/season/crop/area/
//! production CSV, normalizes it into a typed table, applies cascading
//! multi-select filters, and derives the prepared outputs the rendering
//! layer consumes: grouped time series, a correlation matrix, yield
//! decline alerts, bounded scatter samples, and state-level metrics
//! joined to geographic boundary identifiers.
//!
//! Rendering, page layout and HTTP serving live elsewhere; everything in
//! this crate is a pure function over the loaded table (plus one explicit
//! swap-on-refresh cache for the table itself).

pub mod analysis;
pub mod cache;
pub mod data;

pub use analysis::aggregate::{
    aggregate, correlate, AggregateRow, CorrelationMatrix, Dimension, Metric,
};
pub use analysis::decline::{detect_decline, DeclineRecord, Severity, DEFAULT_WINDOW_YEARS};
pub use analysis::geo::{join_boundaries, BoundaryIndex, GeoRow};
pub use analysis::sample::{sample, sample_indices, DEFAULT_SAMPLE_CAP};
pub use cache::TableCache;
pub use data::filter::{available_districts, select, FilterSelection};
pub use data::loader::LoadError;
pub use data::model::{CropDataset, Record};

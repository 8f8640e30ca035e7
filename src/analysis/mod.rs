/// Analysis layer: pure derivations over a filtered record view.
///
/// Every routine here takes borrowed records (typically the output of
/// `data::filter::select`) and produces a fresh, owned result. Nothing
/// is cached, nothing blocks, and data-quality gaps surface as skipped
/// rows or missing values, never as errors.

pub mod aggregate;
pub mod decline;
pub mod geo;
pub mod sample;

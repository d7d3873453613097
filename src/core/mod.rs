//! Core building blocks: geotransform arithmetic, cancellation budgets,
//! processing parameters, sample-type conversion and the pure raster
//! geometry in `processing`. These are internal primitives consumed by the
//! high-level `api` module.
pub mod cancel;
pub mod geotransform;
pub mod params;
pub mod pixel;
pub mod processing;

//! Output writers: atomic GeoTIFF creation and metadata embedding.
pub mod metadata;
pub mod tiff;

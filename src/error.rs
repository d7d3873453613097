//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts manifest, GDAL, geometry and I/O errors, and provides semantic
//! variants for argument validation and per-band dispatch failures.
use thiserror::Error;

use crate::core::cancel::Interrupted;
use crate::core::geotransform::GeoTransformError;
use crate::core::processing::warp::WarpError;
use crate::core::processing::window::WindowError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Catalog(#[from] crate::io::CatalogError),

    #[error("Raster error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    GeoTransform(#[from] GeoTransformError),

    #[error("Clip error: {0}")]
    Window(#[from] WindowError),

    #[error("Reprojection error: {0}")]
    Warp(#[from] WarpError),

    #[error("Interrupted: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("No resolution tag (10m/20m) in input file name: {input}")]
    UnhandledResolution { input: String },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    /// True when the failure came from cancellation or a timeout rather
    /// than from the data.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Error::Interrupted(_) | Error::Warp(WarpError::Interrupted(_))
        )
    }
}

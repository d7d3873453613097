//! I/O layer for reading Sentinel-2 products and GDAL-backed rasters.
//! Provides the `sentinel2` manifest reader, `gdal` adapters, and `writers`
//! for atomic GeoTIFF outputs and metadata embedding.
pub mod sentinel2;
pub use sentinel2::{BandCatalog, BandDescriptor, CatalogError, ProductMetadata};

pub mod gdal;
pub use self::gdal::{GdalCoordinateMapping, RasterError, RasterHandle};

pub mod writers;

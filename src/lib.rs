#![doc = r#"
s2prep: Sentinel-2 L2A band harmonizer.

This crate turns the jp2 bands of a Sentinel-2 L2A product into GeoTIFFs at
a common 10 m resolution: 20 m bands are upsampled 2x by pixel duplication,
10 m bands (and the true-colour composite) are copied into GeoTIFF with
their statistics. Outputs can additionally be reprojected to an EPSG code
or clipped to a bounding box. It powers the `s2prep` CLI and can be
embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime (with a JPEG2000 driver such as
  OpenJPEG) available on your system.
- Rust 2024 edition toolchain.

Quick start: process a product directory
----------------------------------------
```rust,no_run
use std::path::Path;
use s2prep::{process_product, CancelToken, ProcessingParams};

fn main() -> s2prep::Result<()> {
    let params = ProcessingParams {
        target_epsg: Some(3857),
        threads: Some(4),
        ..Default::default()
    };
    let report = process_product(
        Path::new("/data/S2B_MSIL2A_20190101T101411_N0211_R022_T32TQM_20190101T131547.SAFE"),
        &params,
        &CancelToken::new(),
    )?;
    report.log_summary();
    println!("outputs={} failures={}", report.completed.len(), report.failures.len());
    Ok(())
}
```

Single-raster operations
------------------------
```rust,no_run
use std::path::Path;
use s2prep::api::{clip_raster, resample_raster, RasterJob};
use s2prep::BoundingBox;

fn main() -> s2prep::Result<()> {
    let job = RasterJob::default();
    resample_raster(Path::new("T32TQM_B05_20m.jp2"), Path::new("T32TQM_B05_10m.tif"), &job)?;
    let bbox = BoundingBox::new(500000.0, 4790000.0, 500100.0, 4790100.0);
    clip_raster(Path::new("T32TQM_B05_10m.tif"), Path::new("T32TQM_B05_10m_clip.tif"), &bbox, &job)?;
    Ok(())
}
```

Error handling
--------------
All public functions return `s2prep::Result<T>`. Only an unusable manifest
aborts [`process_product`]; per-band failures are collected in the
[`BatchReport`].

```rust,no_run
use std::path::Path;
use s2prep::{process_product, CancelToken, Error, ProcessingParams};

fn main() {
    match process_product(Path::new("/bad/product"), &ProcessingParams::default(), &CancelToken::new()) {
        Ok(report) if report.is_success() => {}
        Ok(report) => eprintln!("{} band step(s) failed", report.failures.len()),
        Err(Error::Catalog(e)) => eprintln!("Manifest error: {e}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] - raster operations and the batch driver.
- [`types`] - band names, dispatch and shared enums.
- [`io`] - manifest reader, GDAL adapters and writers.
- [`core`] - geotransform math, warp and clip-window geometry.
- [`error`] - crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::cancel::{CancelToken, Interrupted, OpBudget};
pub use crate::core::params::ProcessingParams;
pub use error::{Error, Result};
pub use types::{BandName, BandOperation, BoundingBox, ProcessingStep, WarpResampling};

// Readers
pub use crate::io::gdal::{GdalCoordinateMapping, RasterError, RasterHandle};
pub use crate::io::sentinel2::{BandCatalog, BandDescriptor, CatalogError, ProductMetadata};

// Selected writer helpers
pub use crate::io::writers::metadata::{OutputMetadata, embed_tiff_metadata, extract_metadata_fields};

// High-level API re-exports
pub use api::{
    BatchReport, OpOutcome, RasterJob, clip_raster, convert_raster, process_catalog,
    process_product, reproject_raster, resample_raster,
};

//! High-level, ergonomic library API: per-raster operations (2x resample,
//! GeoTIFF conversion, reprojection, clipping) and the product-level batch
//! driver. Prefer these entrypoints over the low-level `core` and `io`
//! modules when integrating s2prep.
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::cancel::OpBudget;
use crate::core::geotransform::{GeoTransform, upsampled_geo_transform};
use crate::core::params::DEFAULT_STRIP_ROWS;
use crate::core::pixel::Pixel;
use crate::core::processing::warp::{CoordinateMapping, WarpGrid, suggest_output_grid, warp_bands};
use crate::core::processing::window::{PixelWindow, clip_window};
use crate::error::Result;
use crate::io::gdal::{
    GdalCoordinateMapping, RasterHandle, RasterPixel, copy_band_style, dispatch_band_type,
    srs_from_epsg, write_window,
};
use crate::io::writers::metadata::{BandStatistics, OutputMetadata, embed_tiff_metadata};
use crate::io::writers::tiff::PendingTiff;
use crate::types::{BoundingBox, ProcessingStep, WarpResampling};

pub mod batch;
pub use batch::{BandFailure, BatchReport, CompletedStep, process_catalog, process_product};

/// Settings shared by the single-raster operations
#[derive(Debug, Clone)]
pub struct RasterJob {
    /// Source rows per read/write strip
    pub strip_rows: usize,
    pub budget: OpBudget,
    pub metadata: OutputMetadata,
}

impl Default for RasterJob {
    fn default() -> Self {
        RasterJob {
            strip_rows: DEFAULT_STRIP_ROWS,
            budget: OpBudget::unbounded(),
            metadata: OutputMetadata::default(),
        }
    }
}

/// Result of a single-raster operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    Written(PathBuf),
    Skipped { reason: String },
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Start offsets and heights of row strips covering `rows`.
fn strips(rows: usize, strip_rows: usize) -> impl Iterator<Item = (usize, usize)> {
    let step = strip_rows.max(1);
    (0..rows).step_by(step).map(move |y| (y, step.min(rows - y)))
}

/// Upsample a raster 2x in both axes by pixel duplication, writing a
/// GeoTIFF with half the pixel size and the same origin.
///
/// True-colour composites (`TCI` in the file name) are never resampled: the
/// call is a logged no-op returning [`OpOutcome::Skipped`].
pub fn resample_raster(input: &Path, output: &Path, job: &RasterJob) -> Result<OpOutcome> {
    let name = file_name(input);
    if name.contains("TCI") {
        info!("Resampling of {} skipped: true-colour composites are only converted", name);
        info!("Resampling of {} has been successfully finished.", file_name(output));
        return Ok(OpOutcome::Skipped {
            reason: "true-colour composite".to_string(),
        });
    }

    let src = RasterHandle::open(input)?;
    let gt = src.geo_transform()?;
    let data_type = src.band(1)?.band_type();
    let written = dispatch_band_type!(data_type, resample_typed(&src, output, &gt, job))?;
    info!("Resampling of {} has been successfully finished.", file_name(output));
    Ok(OpOutcome::Written(written))
}

fn resample_typed<T: RasterPixel>(
    src: &RasterHandle,
    output: &Path,
    gt: &GeoTransform,
    job: &RasterJob,
) -> Result<PathBuf> {
    let (cols, rows) = src.size();
    let out_cols = cols * 2;
    let out_gt = upsampled_geo_transform(gt, 2);

    let pending = PendingTiff::new(output)?;
    let mut ds = pending.create::<T>(out_cols, rows * 2, 1, &out_gt, &src.projection())?;
    {
        let src_band = src.band(1)?;
        let mut dst_band = ds.rasterband(1)?;
        copy_band_style(&src_band, &mut dst_band)?;
        for (y, h) in strips(rows, job.strip_rows) {
            job.budget.check()?;
            // GDAL nearest-neighbour read into a buffer twice the window size
            let data = src.read_window::<T>(1, (0, y), (cols, h), (out_cols, 2 * h))?;
            write_window(&mut dst_band, (0, 2 * y), (out_cols, 2 * h), data)?;
        }
    }
    embed_tiff_metadata(&mut ds, &job.metadata, src.path(), ProcessingStep::Resample2x)?;
    Ok(pending.commit(ds)?)
}

/// Copy every band of a raster into a GeoTIFF, preserving data type,
/// projection, geotransform, nodata and colour interpretation, and store
/// per-band statistics in the output.
pub fn convert_raster(input: &Path, output: &Path, job: &RasterJob) -> Result<OpOutcome> {
    let src = RasterHandle::open(input)?;
    let gt = src.geo_transform()?;
    let data_type = src.band_type()?;
    let written = dispatch_band_type!(data_type, convert_typed(&src, output, &gt, job))?;
    info!("Conversion of {} has been successfully finished", file_name(output));
    Ok(OpOutcome::Written(written))
}

fn convert_typed<T: RasterPixel>(
    src: &RasterHandle,
    output: &Path,
    gt: &GeoTransform,
    job: &RasterJob,
) -> Result<PathBuf> {
    let (cols, rows) = src.size();
    let window = PixelWindow {
        x_off: 0,
        y_off: 0,
        cols,
        rows,
        geo_transform: *gt,
    };
    copy_window::<T>(src, output, &window, ProcessingStep::Convert, true, job)
}

/// Write the pixels of `window` from every band of `src` into a new GeoTIFF.
fn copy_window<T: RasterPixel>(
    src: &RasterHandle,
    output: &Path,
    window: &PixelWindow,
    step: ProcessingStep,
    with_statistics: bool,
    job: &RasterJob,
) -> Result<PathBuf> {
    let bands = src.band_count();
    let pending = PendingTiff::new(output)?;
    let mut ds = pending.create::<T>(
        window.cols,
        window.rows,
        bands,
        &window.geo_transform,
        &src.projection(),
    )?;

    for index in 1..=bands {
        let src_band = src.band(index)?;
        let nodata = src_band.no_data_value();
        let mut dst_band = ds.rasterband(index)?;
        copy_band_style(&src_band, &mut dst_band)?;

        let mut stats = BandStatistics::default();
        for (y, h) in strips(window.rows, job.strip_rows) {
            job.budget.check()?;
            let size = (window.cols, h);
            let data = src.read_window::<T>(index, (window.x_off, window.y_off + y), size, size)?;
            if with_statistics {
                stats.update(data.iter().map(|v| v.as_f64()), nodata);
            }
            write_window(&mut dst_band, (0, y), size, data)?;
        }
        if with_statistics {
            stats.write_to(&mut dst_band)?;
        }
    }

    embed_tiff_metadata(&mut ds, &job.metadata, src.path(), step)?;
    Ok(pending.commit(ds)?)
}

/// Extract the minimal pixel window covering `bbox` (in the raster's own
/// reference system) from every band, keeping the pixel size.
pub fn clip_raster(
    input: &Path,
    output: &Path,
    bbox: &BoundingBox,
    job: &RasterJob,
) -> Result<OpOutcome> {
    let src = RasterHandle::open(input)?;
    let gt = src.geo_transform()?;
    let (cols, rows) = src.size();
    let window = clip_window(&gt, bbox, cols, rows)?;
    let data_type = src.band_type()?;
    let written = dispatch_band_type!(
        data_type,
        copy_window(&src, output, &window, ProcessingStep::Clip, false, job)
    )?;
    info!("Clipping of {} has been successfully finished", file_name(output));
    Ok(OpOutcome::Written(written))
}

/// Reproject every band of a raster into `target_epsg`. The output grid
/// fully contains the reprojected source; pixels outside the source
/// footprint are nodata (each band's own nodata value, else 0).
pub fn reproject_raster(
    input: &Path,
    output: &Path,
    target_epsg: u32,
    method: WarpResampling,
    job: &RasterJob,
) -> Result<OpOutcome> {
    let src = RasterHandle::open(input)?;
    let gt = src.geo_transform()?;
    let src_srs = src.spatial_ref()?;
    let dst_srs = srs_from_epsg(target_epsg)?;
    let mapping = GdalCoordinateMapping::new(&src_srs, &dst_srs)?;
    let (cols, rows) = src.size();
    let grid = suggest_output_grid(&gt, cols, rows, &mapping)?;
    let projection = dst_srs.to_wkt().map_err(crate::io::RasterError::from)?;

    let data_type = src.band_type()?;
    let written = dispatch_band_type!(
        data_type,
        reproject_typed(&src, output, &gt, &grid, &mapping, &projection, method, job)
    )?;
    info!(
        "Reprojection of {} to EPSG:{} has been successfully finished",
        file_name(input),
        target_epsg
    );
    Ok(OpOutcome::Written(written))
}

#[allow(clippy::too_many_arguments)]
fn reproject_typed<T: RasterPixel>(
    src: &RasterHandle,
    output: &Path,
    gt: &GeoTransform,
    grid: &WarpGrid,
    mapping: &dyn CoordinateMapping,
    projection: &str,
    method: WarpResampling,
    job: &RasterJob,
) -> Result<PathBuf> {
    let bands = src.band_count();
    let nodata = (1..=bands)
        .map(|index| src.nodata(index))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let sources = (1..=bands)
        .map(|index| src.read_band_array::<T>(index))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    job.budget.check()?;

    let warped = warp_bands(&sources, gt, grid, mapping, &nodata, method, &job.budget)?;
    drop(sources);

    let pending = PendingTiff::new(output)?;
    let mut ds = pending.create::<T>(grid.cols, grid.rows, bands, &grid.geo_transform, projection)?;
    for ((index, band_data), band_nodata) in (1..=bands).zip(warped).zip(&nodata) {
        let src_band = src.band(index)?;
        let mut dst_band = ds.rasterband(index)?;
        copy_band_style(&src_band, &mut dst_band)?;
        dst_band.set_no_data_value(Some(band_nodata.unwrap_or(0.0)))?;
        write_window(&mut dst_band, (0, 0), (grid.cols, grid.rows), band_data.into_raw_vec())?;
    }
    embed_tiff_metadata(&mut ds, &job.metadata, src.path(), ProcessingStep::Reproject)?;
    Ok(pending.commit(ds)?)
}

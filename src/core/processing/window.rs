use thiserror::Error;

use crate::core::geotransform::{
    GeoTransform, GeoTransformError, apply_geo_transform, invert_geo_transform, with_origin,
};
use crate::types::BoundingBox;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindowError {
    #[error(transparent)]
    GeoTransform(#[from] GeoTransformError),
    #[error(
        "Clip window {cols}x{rows} at ({x_off}, {y_off}) falls outside the {raster_cols}x{raster_rows} raster"
    )]
    OutOfBounds {
        x_off: i64,
        y_off: i64,
        cols: i64,
        rows: i64,
        raster_cols: usize,
        raster_rows: usize,
    },
}

/// Pixel window to read from a source raster, with the geotransform the
/// extracted raster gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelWindow {
    pub x_off: usize,
    pub y_off: usize,
    pub cols: usize,
    pub rows: usize,
    pub geo_transform: GeoTransform,
}

/// Minimal window covering `bbox`.
///
/// Corners (xmin, ymax) and (xmax, ymin) are inverse-mapped and truncated
/// toward zero; the window spans both corner pixels inclusively, hence the
/// `+ 1` on each dimension. The new origin is the forward-mapped upper-left
/// pixel; pixel size is unchanged.
pub fn clip_window(
    gt: &GeoTransform,
    bbox: &BoundingBox,
    raster_cols: usize,
    raster_rows: usize,
) -> Result<PixelWindow, WindowError> {
    let inv = invert_geo_transform(gt)?;

    let (ulx, uly) = apply_geo_transform(&inv, bbox.xmin, bbox.ymax);
    let (lrx, lry) = apply_geo_transform(&inv, bbox.xmax, bbox.ymin);
    let (off_ulx, off_uly) = (ulx.trunc() as i64, uly.trunc() as i64);
    let (off_lrx, off_lry) = (lrx.trunc() as i64, lry.trunc() as i64);

    let rows = off_lry - off_uly + 1;
    let cols = off_lrx - off_ulx + 1;

    let out_of_bounds = off_ulx < 0
        || off_uly < 0
        || rows <= 0
        || cols <= 0
        || off_ulx + cols > raster_cols as i64
        || off_uly + rows > raster_rows as i64;
    if out_of_bounds {
        return Err(WindowError::OutOfBounds {
            x_off: off_ulx,
            y_off: off_uly,
            cols,
            rows,
            raster_cols,
            raster_rows,
        });
    }

    let (origin_x, origin_y) = apply_geo_transform(gt, off_ulx as f64, off_uly as f64);
    Ok(PixelWindow {
        x_off: off_ulx as usize,
        y_off: off_uly as usize,
        cols: cols as usize,
        rows: rows as usize,
        geo_transform: with_origin(gt, origin_x, origin_y),
    })
}

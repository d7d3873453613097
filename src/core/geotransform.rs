//! Affine geotransform arithmetic.
//!
//! A geotransform is the GDAL 6-coefficient array
//! `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
//! mapping pixel space to projected coordinates:
//!
//! ```text
//! x = gt[0] + col * gt[1] + row * gt[2]
//! y = gt[3] + col * gt[4] + row * gt[5]
//! ```
use thiserror::Error;

/// GDAL-ordered affine coefficients
pub type GeoTransform = [f64; 6];

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GeoTransformError {
    #[error("Degenerate geotransform: determinant {det} cannot be inverted")]
    Degenerate { det: f64 },
}

/// Map a (col, row) pixel position to projected coordinates.
pub fn apply_geo_transform(gt: &GeoTransform, col: f64, row: f64) -> (f64, f64) {
    let x = gt[0] + col * gt[1] + row * gt[2];
    let y = gt[3] + col * gt[4] + row * gt[5];
    (x, y)
}

/// Solve the 2x2 linear part and return the projected-to-pixel transform.
///
/// Fails when the determinant `gt[1]*gt[5] - gt[2]*gt[4]` is zero (or
/// vanishingly small relative to the pixel size).
pub fn invert_geo_transform(gt: &GeoTransform) -> Result<GeoTransform, GeoTransformError> {
    let det = gt[1] * gt[5] - gt[2] * gt[4];
    let scale = gt[1].abs().max(gt[2].abs()).max(gt[4].abs()).max(gt[5].abs());
    if det == 0.0 || !det.is_finite() || det.abs() <= 1e-15 * scale * scale {
        return Err(GeoTransformError::Degenerate { det });
    }

    // north-up: direct reciprocals, same as GDALInvGeoTransform
    if gt[2] == 0.0 && gt[4] == 0.0 {
        return Ok([
            -gt[0] / gt[1],
            1.0 / gt[1],
            0.0,
            -gt[3] / gt[5],
            0.0,
            1.0 / gt[5],
        ]);
    }

    let inv_det = 1.0 / det;
    Ok([
        (gt[2] * gt[3] - gt[0] * gt[5]) * inv_det,
        gt[5] * inv_det,
        -gt[2] * inv_det,
        (-gt[1] * gt[3] + gt[0] * gt[4]) * inv_det,
        -gt[4] * inv_det,
        gt[1] * inv_det,
    ])
}

/// Geotransform of a raster with `factor` times as many rows and columns
/// covering the same footprint. Origin and rotation terms are unchanged.
pub fn upsampled_geo_transform(gt: &GeoTransform, factor: usize) -> GeoTransform {
    let f = factor as f64;
    let mut out = *gt;
    out[1] /= f;
    out[5] /= f;
    out
}

/// Same pixel size and rotation, new origin.
pub fn with_origin(gt: &GeoTransform, origin_x: f64, origin_y: f64) -> GeoTransform {
    let mut out = *gt;
    out[0] = origin_x;
    out[3] = origin_y;
    out
}

/// Projected envelope `(min_x, min_y, max_x, max_y)` of a `cols` x `rows` raster.
pub fn raster_envelope(gt: &GeoTransform, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
    let (c, r) = (cols as f64, rows as f64);
    let corners = [
        apply_geo_transform(gt, 0.0, 0.0),
        apply_geo_transform(gt, c, 0.0),
        apply_geo_transform(gt, 0.0, r),
        apply_geo_transform(gt, c, r),
    ];
    corners.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}

/// True for the GDAL fallback transform `[0, 1, 0, 0, 0, 1]`, which marks a
/// raster without georeferencing.
pub fn is_identity(gt: &GeoTransform) -> bool {
    *gt == [0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
}

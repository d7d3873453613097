//! Reprojection by inverse mapping.
//!
//! The output grid is derived from the forward-mapped source corners; every
//! output pixel center is then mapped back into source pixel space and
//! sampled (bilinear or nearest). Pixels that land outside the source
//! footprint keep the nodata value. Coordinate-system math is supplied by a
//! [`CoordinateMapping`], so the engine itself has no GDAL dependency.
use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use crate::core::cancel::{Interrupted, OpBudget};
use crate::core::geotransform::{
    GeoTransform, GeoTransformError, apply_geo_transform, invert_geo_transform,
};
use crate::core::pixel::Pixel;
use crate::types::WarpResampling;

#[derive(Debug, Error)]
pub enum WarpError {
    #[error(transparent)]
    GeoTransform(#[from] GeoTransformError),
    #[error("Reprojected extent is empty or not finite")]
    EmptyExtent,
    #[error("Source bands differ in shape")]
    ShapeMismatch,
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Point mapping between the source and target reference systems.
/// Both methods transform the coordinate slices in place.
pub trait CoordinateMapping {
    /// source -> target
    fn forward(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), WarpError>;
    /// target -> source
    fn inverse(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), WarpError>;
}

/// Output raster geometry in the target reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpGrid {
    pub cols: usize,
    pub rows: usize,
    pub geo_transform: GeoTransform,
}

/// Choose an output grid that fully contains the reprojected source.
///
/// Bounds come from the four forward-mapped source corners. The square
/// output pixel size keeps the source diagonal's pixel count: the mapped
/// length of the upper-left to lower-right diagonal divided by
/// `hypot(cols, rows)`.
pub fn suggest_output_grid<M: CoordinateMapping + ?Sized>(
    src_gt: &GeoTransform,
    src_cols: usize,
    src_rows: usize,
    mapping: &M,
) -> Result<WarpGrid, WarpError> {
    let (c, r) = (src_cols as f64, src_rows as f64);
    let corners = [(0.0, 0.0), (c, r), (c, 0.0), (0.0, r)];
    let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = corners
        .iter()
        .map(|&(col, row)| apply_geo_transform(src_gt, col, row))
        .unzip();
    mapping.forward(&mut xs, &mut ys)?;

    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(WarpError::EmptyExtent);
    }
    let min_x = xs.iter().copied().fold(f64::MAX, f64::min);
    let max_x = xs.iter().copied().fold(f64::MIN, f64::max);
    let min_y = ys.iter().copied().fold(f64::MAX, f64::min);
    let max_y = ys.iter().copied().fold(f64::MIN, f64::max);

    let diagonal = (xs[1] - xs[0]).hypot(ys[1] - ys[0]);
    let res = diagonal / c.hypot(r);
    if !(res > 0.0) || max_x <= min_x || max_y <= min_y {
        return Err(WarpError::EmptyExtent);
    }

    // tolerate float noise so an exact fit does not gain a column
    let cols = ((max_x - min_x) / res - 1e-6).ceil().max(1.0) as usize;
    let rows = ((max_y - min_y) / res - 1e-6).ceil().max(1.0) as usize;

    debug!(
        "Warp grid: {}x{} at {:.6} per pixel, origin ({:.3}, {:.3})",
        cols, rows, res, min_x, max_y
    );
    Ok(WarpGrid {
        cols,
        rows,
        geo_transform: [min_x, res, 0.0, max_y, 0.0, -res],
    })
}

fn is_nodata(v: f64, nodata: Option<f64>) -> bool {
    match nodata {
        Some(nd) if nd.is_nan() => v.is_nan(),
        Some(nd) => v == nd,
        None => false,
    }
}

/// Bilinear interpolation at fractional source position (`px`, `py`), in
/// pixel-edge coordinates. Neighbors are clamped to the raster edge; nodata
/// neighbors drop out and the remaining weights are renormalized.
fn sample_bilinear<T: Pixel>(src: &Array2<T>, px: f64, py: f64, nodata: Option<f64>) -> Option<f64> {
    let (rows, cols) = src.dim();
    let sx = px - 0.5;
    let sy = py - 0.5;
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;

    let clamp = |v: i64, len: usize| v.clamp(0, len as i64 - 1) as usize;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut acc = 0.0;
    let mut weight = 0.0;
    for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
        for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
            let w = wx * wy;
            if w <= 0.0 {
                continue;
            }
            let v = src[[clamp(y0 + dy, rows), clamp(x0 + dx, cols)]].as_f64();
            if is_nodata(v, nodata) {
                continue;
            }
            acc += w * v;
            weight += w;
        }
    }
    (weight > 0.0).then(|| acc / weight)
}

fn sample_nearest<T: Pixel>(src: &Array2<T>, px: f64, py: f64, nodata: Option<f64>) -> Option<f64> {
    let (rows, cols) = src.dim();
    let col = (px.floor() as usize).min(cols - 1);
    let row = (py.floor() as usize).min(rows - 1);
    let v = src[[row, col]].as_f64();
    (!is_nodata(v, nodata)).then_some(v)
}

/// Resample every band of `sources` onto `grid`.
///
/// `nodata[i]` masks and fills band `i`; bands past the end of `nodata`
/// have none and are filled with 0. All bands share one inverse mapping
/// per output row. The budget is checked once per row.
pub fn warp_bands<T: Pixel, M: CoordinateMapping + ?Sized>(
    sources: &[Array2<T>],
    src_gt: &GeoTransform,
    grid: &WarpGrid,
    mapping: &M,
    nodata: &[Option<f64>],
    method: WarpResampling,
    budget: &OpBudget,
) -> Result<Vec<Array2<T>>, WarpError> {
    let Some(first) = sources.first() else {
        return Ok(Vec::new());
    };
    let (src_rows, src_cols) = first.dim();
    if sources.iter().any(|s| s.dim() != (src_rows, src_cols)) {
        return Err(WarpError::ShapeMismatch);
    }
    if src_rows == 0 || src_cols == 0 {
        return Err(WarpError::EmptyExtent);
    }

    let src_inv = invert_geo_transform(src_gt)?;
    let band_nodata: Vec<Option<f64>> = (0..sources.len())
        .map(|i| nodata.get(i).copied().flatten())
        .collect();
    let mut outputs: Vec<Array2<T>> = band_nodata
        .iter()
        .map(|nd| Array2::from_elem((grid.rows, grid.cols), T::from_f64(nd.unwrap_or(0.0))))
        .collect();

    let mut xs = vec![0.0; grid.cols];
    let mut ys = vec![0.0; grid.cols];
    for row in 0..grid.rows {
        budget.check()?;

        for (col, (x, y)) in xs.iter_mut().zip(ys.iter_mut()).enumerate() {
            (*x, *y) = apply_geo_transform(&grid.geo_transform, col as f64 + 0.5, row as f64 + 0.5);
        }
        mapping.inverse(&mut xs, &mut ys)?;

        for col in 0..grid.cols {
            let (px, py) = apply_geo_transform(&src_inv, xs[col], ys[col]);
            let inside = px.is_finite()
                && py.is_finite()
                && px >= 0.0
                && py >= 0.0
                && px <= src_cols as f64
                && py <= src_rows as f64;
            if !inside {
                continue;
            }
            for ((src, out), &nd) in sources.iter().zip(outputs.iter_mut()).zip(&band_nodata) {
                let value = match method {
                    WarpResampling::Bilinear => sample_bilinear(src, px, py, nd),
                    WarpResampling::Nearest => sample_nearest(src, px, py, nd),
                };
                if let Some(v) = value {
                    out[[row, col]] = T::from_f64(v);
                }
            }
        }
    }

    Ok(outputs)
}

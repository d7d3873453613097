use std::path::{Path, PathBuf};

use gdal::errors::GdalError as GdalCrateError;
use gdal::raster::{Buffer, ColorInterpretation, GdalDataType, GdalType, RasterBand, ResampleAlg};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::Dataset;
use ndarray::Array2;
use thiserror::Error;

use crate::core::geotransform::{GeoTransform, is_identity};
use crate::core::pixel::Pixel;
use crate::core::processing::warp::{CoordinateMapping, WarpError};

/// Errors from the GDAL-backed raster layer
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Cannot open raster {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: GdalCrateError,
    },
    #[error("Raster {0:?} has no bands")]
    NoBands(PathBuf),
    #[error("Raster {0:?} carries no geotransform")]
    Ungeoreferenced(PathBuf),
    #[error("Raster {0:?} carries no spatial reference")]
    NoSpatialRef(PathBuf),
    #[error("Unsupported band data type: {0}")]
    UnsupportedType(String),
    #[error("Band {band} of {path:?} differs in type or size from band 1")]
    MixedBands { path: PathBuf, band: usize },
    #[error("Dimension mismatch: expected {0}x{1}, got {2} samples")]
    DimensionMismatch(usize, usize, usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot move finished raster into place: {0}")]
    Persist(#[from] tempfile::PathPersistError),
}

/// Run the generic function `$func::<T>` for the Rust sample type matching a
/// GDAL band data type. Types without a `Pixel` impl yield
/// `RasterError::UnsupportedType`.
macro_rules! dispatch_band_type {
    ($data_type:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $data_type {
            ::gdal::raster::GdalDataType::UInt8 => $func::<u8>($($arg),*),
            ::gdal::raster::GdalDataType::UInt16 => $func::<u16>($($arg),*),
            ::gdal::raster::GdalDataType::Int16 => $func::<i16>($($arg),*),
            ::gdal::raster::GdalDataType::UInt32 => $func::<u32>($($arg),*),
            ::gdal::raster::GdalDataType::Int32 => $func::<i32>($($arg),*),
            ::gdal::raster::GdalDataType::Float32 => $func::<f32>($($arg),*),
            ::gdal::raster::GdalDataType::Float64 => $func::<f64>($($arg),*),
            other => Err($crate::io::gdal::RasterError::UnsupportedType(format!("{:?}", other)).into()),
        }
    };
}
pub(crate) use dispatch_band_type;

/// Sample type usable both in GDAL I/O and in the pure processing code
pub trait RasterPixel: Pixel + GdalType {}
impl<T: Pixel + GdalType> RasterPixel for T {}

/// An opened raster. The dataset closes when the handle drops, on every
/// exit path.
pub struct RasterHandle {
    path: PathBuf,
    dataset: Dataset,
    cols: usize,
    rows: usize,
    bands: usize,
}

impl std::fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterHandle")
            .field("path", &self.path)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("bands", &self.bands)
            .finish()
    }
}

impl RasterHandle {
    /// Open a GDAL-supported raster (jp2, GeoTIFF, ...) read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref().to_path_buf();
        let dataset = Dataset::open(&path).map_err(|source| RasterError::Open {
            path: path.clone(),
            source,
        })?;
        let (cols, rows) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::NoBands(path));
        }
        Ok(RasterHandle {
            path,
            dataset,
            cols,
            rows,
            bands,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// (cols, rows)
    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn band_count(&self) -> usize {
        self.bands
    }

    pub fn band(&self, index: usize) -> Result<RasterBand<'_>, RasterError> {
        Ok(self.dataset.rasterband(index)?)
    }

    /// Data type shared by every band. Mixed-type or mixed-size rasters are
    /// rejected since outputs are created with a single band type.
    pub fn band_type(&self) -> Result<GdalDataType, RasterError> {
        let first = self.band(1)?;
        let data_type = first.band_type();
        for index in 2..=self.bands {
            let band = self.band(index)?;
            if band.band_type() != data_type || band.size() != first.size() {
                return Err(RasterError::MixedBands {
                    path: self.path.clone(),
                    band: index,
                });
            }
        }
        Ok(data_type)
    }

    /// Geotransform of the raster; GDAL's identity fallback counts as missing.
    pub fn geo_transform(&self) -> Result<GeoTransform, RasterError> {
        match self.dataset.geo_transform() {
            Ok(gt) if !is_identity(&gt) => Ok(gt),
            _ => Err(RasterError::Ungeoreferenced(self.path.clone())),
        }
    }

    /// Projection WKT; may be empty.
    pub fn projection(&self) -> String {
        self.dataset.projection()
    }

    pub fn spatial_ref(&self) -> Result<SpatialRef, RasterError> {
        let wkt = self.projection();
        if wkt.is_empty() {
            return Err(RasterError::NoSpatialRef(self.path.clone()));
        }
        let mut srs = SpatialRef::from_wkt(&wkt)?;
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(srs)
    }

    pub fn nodata(&self, band: usize) -> Result<Option<f64>, RasterError> {
        Ok(self.band(band)?.no_data_value())
    }

    /// Read `size` pixels at `offset` from `band`, resampled by GDAL into a
    /// `buf_size` buffer (nearest neighbour when the sizes differ).
    pub fn read_window<T: RasterPixel>(
        &self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buf_size: (usize, usize),
    ) -> Result<Vec<T>, RasterError> {
        let band = self.band(band)?;
        let mut data = vec![T::default(); buf_size.0 * buf_size.1];
        let alg = (size != buf_size).then_some(ResampleAlg::NearestNeighbour);
        band.read_into_slice(
            (offset.0 as isize, offset.1 as isize),
            size,
            buf_size,
            &mut data,
            alg,
        )?;
        Ok(data)
    }

    /// Whole band as a (rows, cols) array.
    pub fn read_band_array<T: RasterPixel>(&self, band: usize) -> Result<Array2<T>, RasterError> {
        let data = self.read_window::<T>(band, (0, 0), self.size(), self.size())?;
        let len = data.len();
        Array2::from_shape_vec((self.rows, self.cols), data)
            .map_err(|_| RasterError::DimensionMismatch(self.cols, self.rows, len))
    }
}

/// Write `data` (row-major, `size.0` columns) into `band` at `offset`.
pub fn write_window<T: RasterPixel>(
    band: &mut RasterBand,
    offset: (usize, usize),
    size: (usize, usize),
    data: Vec<T>,
) -> Result<(), RasterError> {
    if data.len() != size.0 * size.1 {
        return Err(RasterError::DimensionMismatch(size.0, size.1, data.len()));
    }
    let mut buf = Buffer::new(size, data);
    band.write((offset.0 as isize, offset.1 as isize), size, &mut buf)?;
    Ok(())
}

/// Carry nodata and colour interpretation from one band to another.
pub fn copy_band_style(src: &RasterBand, dst: &mut RasterBand) -> Result<(), RasterError> {
    if let Some(nodata) = src.no_data_value() {
        dst.set_no_data_value(Some(nodata))?;
    }
    let interp = src.color_interpretation();
    if interp != ColorInterpretation::Undefined {
        dst.set_color_interpretation(interp)?;
    }
    Ok(())
}

/// EPSG code to spatial reference, x/y in easting/northing (lon/lat) order.
pub fn srs_from_epsg(code: u32) -> Result<SpatialRef, RasterError> {
    let mut srs = SpatialRef::from_epsg(code)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Coordinate mapping between two spatial references, backed by PROJ
/// through GDAL.
pub struct GdalCoordinateMapping {
    forward: CoordTransform,
    inverse: CoordTransform,
}

impl GdalCoordinateMapping {
    pub fn new(source: &SpatialRef, target: &SpatialRef) -> Result<Self, RasterError> {
        Ok(Self {
            forward: CoordTransform::new(source, target)?,
            inverse: CoordTransform::new(target, source)?,
        })
    }
}

/// Transform in bulk; if PROJ rejects the batch, retry point by point and
/// mark the failing points as NaN so the warp treats them as outside. A
/// batch where no point transforms is not an error here: callers decide
/// whether non-finite results are fatal.
fn transform_tolerant(ct: &CoordTransform, xs: &mut [f64], ys: &mut [f64]) -> Result<(), WarpError> {
    let (orig_x, orig_y) = (xs.to_vec(), ys.to_vec());
    if ct.transform_coords(xs, ys, &mut []).is_ok() {
        return Ok(());
    }
    for i in 0..xs.len() {
        let mut x = [orig_x[i]];
        let mut y = [orig_y[i]];
        if ct.transform_coords(&mut x, &mut y, &mut []).is_ok() {
            xs[i] = x[0];
            ys[i] = y[0];
        } else {
            xs[i] = f64::NAN;
            ys[i] = f64::NAN;
        }
    }
    Ok(())
}

impl CoordinateMapping for GdalCoordinateMapping {
    fn forward(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), WarpError> {
        transform_tolerant(&self.forward, xs, ys)
    }

    fn inverse(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), WarpError> {
        transform_tolerant(&self.inverse, xs, ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_points_become_non_finite_without_error() {
        let wgs84 = srs_from_epsg(4326).unwrap();
        let utm = srs_from_epsg(32632).unwrap();
        let mapping = GdalCoordinateMapping::new(&wgs84, &utm).unwrap();

        // latitude beyond the pole next to a point on the zone's central meridian
        let mut xs = [9.0, 9.0];
        let mut ys = [45.0, 95.0];
        mapping.forward(&mut xs, &mut ys).unwrap();
        assert!((xs[0] - 500000.0).abs() < 1e-3);
        assert!(!xs[1].is_finite() || !ys[1].is_finite());

        let mut xs = [9.0, 10.0];
        let mut ys = [95.0, 96.0];
        mapping.forward(&mut xs, &mut ys).unwrap();
        assert!(xs.iter().chain(ys.iter()).all(|v| !v.is_finite()));
    }

    #[test]
    fn unsupported_sample_types_are_rejected() {
        fn accepts<T: RasterPixel>() -> Result<(), RasterError> {
            Ok(())
        }
        let res: Result<(), RasterError> = dispatch_band_type!(GdalDataType::Unknown, accepts());
        assert!(matches!(res, Err(RasterError::UnsupportedType(_))));
        let res: Result<(), RasterError> = dispatch_band_type!(GdalDataType::UInt16, accepts());
        assert!(res.is_ok());
    }
}

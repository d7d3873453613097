use std::path::{Path, PathBuf};

use gdal::{Dataset, DriverManager};
use tempfile::TempPath;
use tracing::debug;

use crate::core::geotransform::GeoTransform;
use crate::io::gdal::{RasterError, RasterPixel};

/// A GeoTIFF being written at a hidden sibling path. [`commit`] renames it
/// over the final name; dropping it uncommitted deletes the partial file.
///
/// [`commit`]: PendingTiff::commit
#[derive(Debug)]
pub struct PendingTiff {
    temp: TempPath,
    final_path: PathBuf,
}

impl PendingTiff {
    pub fn new(final_path: &Path) -> Result<Self, RasterError> {
        let dir = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".s2prep-")
            .suffix(".tif")
            .tempfile_in(dir)?
            .into_temp_path();
        Ok(PendingTiff {
            temp,
            final_path: final_path.to_path_buf(),
        })
    }

    /// Where GDAL should write.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Create the GTiff dataset at the temporary path with `bands` bands of
    /// sample type `T`, georeferenced by `gt` and `projection`.
    pub fn create<T: RasterPixel>(
        &self,
        cols: usize,
        rows: usize,
        bands: usize,
        gt: &GeoTransform,
        projection: &str,
    ) -> Result<Dataset, RasterError> {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut ds = driver.create_with_band_type::<T, _>(self.temp_path(), cols, rows, bands)?;
        ds.set_geo_transform(gt)?;
        if !projection.is_empty() {
            ds.set_projection(projection)?;
        }
        Ok(ds)
    }

    /// Close the dataset and move the file into place.
    pub fn commit(self, ds: Dataset) -> Result<PathBuf, RasterError> {
        drop(ds);
        self.temp.persist(&self.final_path)?;
        debug!("Wrote {:?}", self.final_path);
        Ok(self.final_path)
    }
}

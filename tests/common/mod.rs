//! GDAL fixture helpers shared by the integration tests.
#![allow(dead_code)]

use std::path::Path;

use gdal::raster::{Buffer, GdalType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DatasetOptions, DriverManager, GdalOpenFlags, Metadata};
use s2prep::io::gdal::RasterPixel;
use s2prep::RasterHandle;

/// UTM 32N, the zone of the T32 tiles used throughout
pub const UTM_32N: u32 = 32632;

pub struct Fixture<T> {
    pub cols: usize,
    pub rows: usize,
    pub bands: Vec<Vec<T>>,
    pub geo_transform: Option<[f64; 6]>,
    pub epsg: Option<u32>,
    pub nodata: Option<f64>,
}

impl<T: GdalType + Copy> Fixture<T> {
    pub fn single(cols: usize, rows: usize, data: Vec<T>, gt: [f64; 6]) -> Self {
        Fixture {
            cols,
            rows,
            bands: vec![data],
            geo_transform: Some(gt),
            epsg: Some(UTM_32N),
            nodata: None,
        }
    }

    /// Write as GeoTIFF. GDAL identifies the driver by content, so `path` may
    /// carry a `.jp2` name.
    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut ds = driver
            .create_with_band_type::<T, _>(path, self.cols, self.rows, self.bands.len())
            .unwrap();
        if let Some(gt) = self.geo_transform {
            ds.set_geo_transform(&gt).unwrap();
        }
        if let Some(code) = self.epsg {
            let wkt = SpatialRef::from_epsg(code).unwrap().to_wkt().unwrap();
            ds.set_projection(&wkt).unwrap();
        }
        for (i, data) in self.bands.iter().enumerate() {
            let mut band = ds.rasterband(i + 1).unwrap();
            if let Some(nd) = self.nodata {
                band.set_no_data_value(Some(nd)).unwrap();
            }
            let mut buf = Buffer::new((self.cols, self.rows), data.clone());
            band.write((0, 0), (self.cols, self.rows), &mut buf).unwrap();
        }
    }
}

/// Override the nodata value of one band of an existing file.
pub fn set_band_nodata(path: &Path, band: usize, nodata: f64) {
    let ds = Dataset::open_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_UPDATE,
            ..Default::default()
        },
    )
    .unwrap();
    ds.rasterband(band)
        .unwrap()
        .set_no_data_value(Some(nodata))
        .unwrap();
}

/// Row-major pixel values of band `index`.
pub fn read_band<T: RasterPixel>(raster: &RasterHandle, index: usize) -> Vec<T> {
    let size = raster.size();
    raster.read_window::<T>(index, (0, 0), size, size).unwrap()
}

pub fn metadata_item(ds: &Dataset, key: &str) -> Option<String> {
    ds.metadata_item(key, "")
}

/// Files left behind by interrupted atomic writes
pub fn temp_leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".s2prep-"))
        .collect()
}

use std::path::Path;

use gdal::Metadata;
use gdal::raster::RasterBand;
use gdal::Dataset;
use serde::Serialize;

use crate::io::gdal::RasterError;
use crate::io::sentinel2::ProductMetadata;
use crate::types::{BandName, ProcessingStep};

pub const CONVERSION_TOOL: &str = "s2prep";

/// Provenance shared by every output of one band
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputMetadata {
    pub product: Option<ProductMetadata>,
    pub band: Option<BandName>,
}

impl OutputMetadata {
    pub fn for_band(product: &ProductMetadata, band: BandName) -> Self {
        OutputMetadata {
            product: Some(product.clone()),
            band: Some(band),
        }
    }
}

/// Dataset-level metadata items for an output written from `source` by
/// `operation`.
pub fn extract_metadata_fields(
    meta: &OutputMetadata,
    source: &Path,
    operation: ProcessingStep,
) -> Vec<(String, String)> {
    let mut items: Vec<(String, String)> = meta
        .product
        .iter()
        .flat_map(|p| p.fields())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if let Some(band) = meta.band {
        items.push(("BAND_NAME".to_string(), band.to_string()));
    }
    if let Some(name) = source.file_name() {
        items.push(("SOURCE_FILE".to_string(), name.to_string_lossy().to_string()));
    }
    items.push(("OPERATION".to_string(), operation.to_string()));

    // Conversion provenance
    items.push(("CONVERSION_TOOL".to_string(), CONVERSION_TOOL.to_string()));
    items.push((
        "CONVERSION_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    items.push((
        "CONVERSION_TIMESTAMP".to_string(),
        chrono::Utc::now().to_rfc3339(),
    ));
    items
}

pub fn embed_tiff_metadata(
    ds: &mut Dataset,
    meta: &OutputMetadata,
    source: &Path,
    operation: ProcessingStep,
) -> Result<(), RasterError> {
    for (key, value) in extract_metadata_fields(meta, source, operation) {
        ds.set_metadata_item(&key, &value, "")?;
    }
    Ok(())
}

/// Running min/max/mean/stddev over valid samples of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    count: u64,
    seen: u64,
    sum: f64,
    sum_sq: f64,
}

impl Default for BandStatistics {
    fn default() -> Self {
        BandStatistics {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
            seen: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }
}

impl BandStatistics {
    /// Fold in `values`, skipping NaN and `nodata`.
    pub fn update<I: IntoIterator<Item = f64>>(&mut self, values: I, nodata: Option<f64>) {
        for v in values {
            self.seen += 1;
            if v.is_nan() || nodata == Some(v) {
                continue;
            }
            self.min = self.min.min(v);
            self.max = self.max.max(v);
            self.count += 1;
            self.sum += v;
            self.sum_sq += v * v;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Share of valid samples, in percent.
    pub fn valid_percent(&self) -> f64 {
        if self.seen == 0 {
            return 0.0;
        }
        100.0 * self.count as f64 / self.seen as f64
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Population standard deviation, as GDAL reports it.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let var = (self.sum_sq / self.count as f64 - mean * mean).max(0.0);
        Some(var.sqrt())
    }

    /// Store as the `STATISTICS_*` items GDAL itself reads back.
    pub fn write_to(&self, band: &mut RasterBand) -> Result<(), RasterError> {
        let (Some(mean), Some(std_dev)) = (self.mean(), self.std_dev()) else {
            return Ok(());
        };
        let items = [
            ("STATISTICS_MINIMUM", self.min),
            ("STATISTICS_MAXIMUM", self.max),
            ("STATISTICS_MEAN", mean),
            ("STATISTICS_STDDEV", std_dev),
            ("STATISTICS_VALID_PERCENT", self.valid_percent()),
        ];
        for (key, value) in items {
            band.set_metadata_item(key, &value.to_string(), "")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn statistics_skip_nodata() {
        let mut stats = BandStatistics::default();
        stats.update([0.0, 2.0, 4.0], Some(0.0));
        stats.update([6.0, f64::NAN], Some(0.0));
        assert_eq!(stats.count(), 3);
        assert_eq!((stats.min, stats.max), (2.0, 6.0));
        assert_relative_eq!(stats.mean().unwrap(), 4.0);
        assert_relative_eq!(stats.std_dev().unwrap(), (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.valid_percent(), 60.0);
    }

    #[test]
    fn empty_statistics_have_no_mean() {
        let stats = BandStatistics::default();
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.std_dev(), None);
        assert_eq!(stats.valid_percent(), 0.0);
    }

    #[test]
    fn metadata_fields_carry_provenance() {
        let product = ProductMetadata {
            spacecraft: Some("Sentinel-2A".to_string()),
            ..Default::default()
        };
        let meta = OutputMetadata::for_band(&product, BandName::Nir2);
        let items = extract_metadata_fields(&meta, Path::new("/x/T_B8A_20m.jp2"), ProcessingStep::Resample2x);
        let get = |key: &str| {
            items
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("SPACECRAFT_NAME"), Some("Sentinel-2A"));
        assert_eq!(get("PRODUCT_URI"), None);
        assert_eq!(get("BAND_NAME"), Some("nir2"));
        assert_eq!(get("SOURCE_FILE"), Some("T_B8A_20m.jp2"));
        assert_eq!(get("OPERATION"), Some("resample_2x"));
        assert_eq!(get("CONVERSION_TOOL"), Some(CONVERSION_TOOL));
        assert!(get("CONVERSION_TIMESTAMP").is_some());
    }
}

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{BoundingBox, WarpResampling};

/// Default number of source rows read per strip
pub const DEFAULT_STRIP_ROWS: usize = 512;

/// Processing parameters suitable for config files and CLI overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    /// Worker threads for per-band work; None lets rayon decide
    pub threads: Option<usize>,
    /// Wall-clock limit for each raster operation
    pub timeout_secs: Option<u64>,
    /// Reproject every 10m output into `*_prj.tif` when set
    pub target_epsg: Option<u32>,
    pub warp_resampling: WarpResampling,
    /// Clip every 10m output into `*_clip.tif` when set
    pub clip: Option<BoundingBox>,
    /// Remove the source jp2 once its GeoTIFF exists
    pub delete_sources: bool,
    pub strip_rows: usize,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            threads: None,
            timeout_secs: None,
            target_epsg: None,
            warp_resampling: WarpResampling::Bilinear,
            clip: None,
            delete_sources: false,
            strip_rows: DEFAULT_STRIP_ROWS,
        }
    }
}

impl ProcessingParams {
    /// Load parameters from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: ProcessingParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.strip_rows == 0 {
            return Err(Error::InvalidArgument {
                arg: "strip_rows",
                value: "0".to_string(),
            });
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidArgument {
                arg: "threads",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

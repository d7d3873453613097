//! Shared types and enums used across s2prep.
//! Includes the canonical `BandName` set, the per-band `BandOperation`
//! dispatch, `WarpResampling` and the geographic `BoundingBox`.
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Canonical Sentinel-2 L2A band identifiers handled by the pipeline.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandName {
    Blue,
    Green,
    Red,
    Vre1,
    Vre2,
    Vre3,
    Nir1,
    Nir2,
    Swir1,
    Swir2,
    Cloud,
    Tci,
}

impl BandName {
    /// Manifest filename substring -> canonical band. Order matters only for
    /// reporting; the substrings are mutually exclusive.
    pub const FILE_TAGS: [(&'static str, BandName); 12] = [
        ("B02_10m", BandName::Blue),
        ("B03_10m", BandName::Green),
        ("B04_10m", BandName::Red),
        ("B05_20m", BandName::Vre1),
        ("B06_20m", BandName::Vre2),
        ("B07_20m", BandName::Vre3),
        ("B08_10m", BandName::Nir1),
        ("B8A_20m", BandName::Nir2),
        ("B11_20m", BandName::Swir1),
        ("B12_20m", BandName::Swir2),
        ("SCL_20m", BandName::Cloud),
        ("TCI_10m", BandName::Tci),
    ];

    /// Band whose file tag occurs in `path`, if any.
    pub fn from_file_name(path: &str) -> Option<BandName> {
        Self::FILE_TAGS
            .iter()
            .find(|(tag, _)| path.contains(tag))
            .map(|(_, band)| *band)
    }

    pub fn file_tag(&self) -> &'static str {
        Self::FILE_TAGS
            .iter()
            .find(|(_, band)| band == self)
            .map(|(tag, _)| *tag)
            .unwrap_or_default()
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, BandName::Tci)
    }
}

impl std::fmt::Display for BandName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BandName::Blue => "blue",
            BandName::Green => "green",
            BandName::Red => "red",
            BandName::Vre1 => "vre1",
            BandName::Vre2 => "vre2",
            BandName::Vre3 => "vre3",
            BandName::Nir1 => "nir1",
            BandName::Nir2 => "nir2",
            BandName::Swir1 => "swir1",
            BandName::Swir2 => "swir2",
            BandName::Cloud => "cloud",
            BandName::Tci => "tci",
        };
        write!(f, "{}", s)
    }
}

/// What the batch driver does with a band, decided from its input filename.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BandOperation {
    /// 20m input, upsampled 2x to 10m
    Resample,
    /// 10m input, copied into GeoTIFF
    Convert,
    /// Neither resolution tag present
    Unhandled,
}

impl BandOperation {
    /// "20m" wins over "10m" when a name carries both.
    pub fn for_file(input_name: &str) -> Self {
        if input_name.contains("20m") {
            BandOperation::Resample
        } else if input_name.contains("10m") {
            BandOperation::Convert
        } else {
            BandOperation::Unhandled
        }
    }
}

impl std::fmt::Display for BandOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandOperation::Resample => write!(f, "resample_2x"),
            BandOperation::Convert => write!(f, "convert"),
            BandOperation::Unhandled => write!(f, "unhandled"),
        }
    }
}

/// Raster operation that produced an output file; recorded in its metadata.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStep {
    #[serde(rename = "resample_2x")]
    Resample2x,
    Convert,
    Reproject,
    Clip,
}

impl std::fmt::Display for ProcessingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStep::Resample2x => write!(f, "resample_2x"),
            ProcessingStep::Convert => write!(f, "convert"),
            ProcessingStep::Reproject => write!(f, "reproject"),
            ProcessingStep::Clip => write!(f, "clip"),
        }
    }
}

/// Interpolation used when reprojecting
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WarpResampling {
    Nearest,
    #[default]
    Bilinear,
}

impl std::fmt::Display for WarpResampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarpResampling::Nearest => write!(f, "nearest"),
            WarpResampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// Axis-aligned box in the raster's own reference system.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    /// Parses `xmin,ymin,xmax,ymax`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid bounding box `{}`: {}", s, e))?;
        match values[..] {
            [xmin, ymin, xmax, ymax] if xmin < xmax && ymin < ymax => {
                Ok(BoundingBox::new(xmin, ymin, xmax, ymax))
            }
            [_, _, _, _] => Err(format!(
                "invalid bounding box `{}`: min must be below max",
                s
            )),
            _ => Err(format!(
                "invalid bounding box `{}`: expected xmin,ymin,xmax,ymax",
                s
            )),
        }
    }
}

use clap::Parser;
use std::path::PathBuf;

use s2prep::types::{BoundingBox, WarpResampling};

#[derive(Parser)]
#[command(name = "s2prep", version, about = "Sentinel-2 L2A band harmonizer")]
pub struct CliArgs {
    /// Product directory containing MTD_MSIL2A.xml
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// JSON file with processing parameters; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads for per-band processing (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Abort any single raster operation running longer than this
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Reproject every 10m output into *_prj.tif (e.g. 3857 for Web Mercator)
    #[arg(long)]
    pub target_epsg: Option<u32>,

    /// Interpolation used when reprojecting
    #[arg(long, value_enum)]
    pub warp_resampling: Option<WarpResampling>,

    /// Clip every 10m output into *_clip.tif, in the raster's own CRS
    #[arg(long, value_name = "XMIN,YMIN,XMAX,YMAX", allow_hyphen_values = true)]
    pub clip: Option<BoundingBox>,

    /// Source rows read per strip
    #[arg(long)]
    pub strip_rows: Option<usize>,

    /// Remove each source jp2 once its GeoTIFF has been written
    #[arg(long, default_value_t = false)]
    pub delete_sources: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}

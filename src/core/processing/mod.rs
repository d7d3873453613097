//! Pure raster geometry: clip windows and inverse-mapping reprojection.
pub mod warp;
pub mod window;

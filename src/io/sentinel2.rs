//! Sentinel-2 L2A product manifest (`MTD_MSIL2A.xml`) reader.
//!
//! Builds the band catalog: for each recognised image entry, the directory
//! holding the jp2 plus the file names every stage of the pipeline reads or
//! writes. Product-level fields are collected on the way for provenance.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{BandName, BandOperation};

pub const MANIFEST_NAME: &str = "MTD_MSIL2A.xml";

/// Errors that make a product's catalog unusable
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Manifest not found: {0}")]
    MissingManifest(PathBuf),
    #[error("Manifest {0} lists no recognised band files")]
    Empty(PathBuf),
}

/// Product-level fields from the manifest's General_Info block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductMetadata {
    pub product_uri: Option<String>,
    pub spacecraft: Option<String>,
    pub start_time: Option<String>,
    pub processing_level: Option<String>,
    pub product_type: Option<String>,
    pub processing_baseline: Option<String>,
}

impl ProductMetadata {
    /// Present fields as (GDAL metadata key, value) pairs.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("PRODUCT_URI", &self.product_uri),
            ("SPACECRAFT_NAME", &self.spacecraft),
            ("PRODUCT_START_TIME", &self.start_time),
            ("PROCESSING_LEVEL", &self.processing_level),
            ("PRODUCT_TYPE", &self.product_type),
            ("PROCESSING_BASELINE", &self.processing_baseline),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// Files involved in processing one band of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandDescriptor {
    pub band: BandName,
    /// Directory holding the source jp2; all outputs land next to it
    pub dir: PathBuf,
    pub input_name: String,
    pub output_name: String,
    pub projected_name: String,
    pub clipped_name: String,
}

impl BandDescriptor {
    /// Descriptor for a manifest image entry (a product-relative path, with or
    /// without the `.jp2` suffix), or None when no band tag matches.
    pub fn from_manifest_entry(product_dir: &Path, entry: &str) -> Option<Self> {
        let band = BandName::from_file_name(entry)?;
        let dir = product_dir
            .join(entry)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| product_dir.to_path_buf());

        let file = entry.rsplit('/').next().unwrap_or(entry);
        let stem = file.strip_suffix(".jp2").unwrap_or(file);
        // 20m inputs are named for the 10m raster they become
        let out_stem = if stem.contains("20m") {
            let head = stem.split("_20m").next().unwrap_or(stem);
            format!("{}_10m", head)
        } else {
            stem.to_string()
        };

        Some(BandDescriptor {
            band,
            dir,
            input_name: format!("{}.jp2", stem),
            output_name: format!("{}.tif", out_stem),
            projected_name: format!("{}_prj.tif", out_stem),
            clipped_name: format!("{}_clip.tif", out_stem),
        })
    }

    pub fn operation(&self) -> BandOperation {
        BandOperation::for_file(&self.input_name)
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(&self.input_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.output_name)
    }

    pub fn projected_path(&self) -> PathBuf {
        self.dir.join(&self.projected_name)
    }

    pub fn clipped_path(&self) -> PathBuf {
        self.dir.join(&self.clipped_name)
    }
}

/// Band catalog of one product directory
#[derive(Debug, Clone)]
pub struct BandCatalog {
    pub product_dir: PathBuf,
    pub metadata: ProductMetadata,
    pub bands: BTreeMap<BandName, BandDescriptor>,
    /// Image entries that matched no band tag
    pub unmatched: Vec<String>,
}

impl BandCatalog {
    /// Parse `<product_dir>/MTD_MSIL2A.xml`. A missing manifest or one without
    /// any recognised band is an error.
    pub fn open(product_dir: &Path) -> Result<Self, CatalogError> {
        let manifest = product_dir.join(MANIFEST_NAME);
        if !manifest.is_file() {
            return Err(CatalogError::MissingManifest(manifest));
        }
        let reader = Reader::from_file(&manifest)?;
        let catalog = Self::from_reader(product_dir, reader)?;
        if catalog.bands.is_empty() {
            return Err(CatalogError::Empty(manifest));
        }
        info!(
            "Directory pathnames for {} bands of {:?} initialized",
            catalog.bands.len(),
            product_dir
        );
        Ok(catalog)
    }

    /// Parse manifest XML held in memory.
    pub fn from_xml(product_dir: &Path, xml: &str) -> Result<Self, CatalogError> {
        let catalog = Self::from_reader(product_dir, Reader::from_reader(xml.as_bytes()))?;
        if catalog.bands.is_empty() {
            return Err(CatalogError::Empty(product_dir.join(MANIFEST_NAME)));
        }
        Ok(catalog)
    }

    fn from_reader<R: BufRead>(
        product_dir: &Path,
        mut reader: Reader<R>,
    ) -> Result<Self, CatalogError> {
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut curr = String::new();
        let mut metadata = ProductMetadata::default();
        let mut bands = BTreeMap::new();
        let mut unmatched = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    curr = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                }
                Event::End(_) => curr.clear(),
                Event::Text(e) => {
                    let txt = e.unescape()?;
                    let txt = txt.trim();
                    match curr.as_str() {
                        "IMAGE_FILE_2A" | "IMAGE_FILE" => {
                            match BandDescriptor::from_manifest_entry(product_dir, txt) {
                                Some(desc) => {
                                    if let Some(prev) = bands.insert(desc.band, desc) {
                                        warn!(
                                            "Band {} listed twice; replacing {}",
                                            prev.band, prev.input_name
                                        );
                                    }
                                }
                                None => {
                                    debug!("No band tag in manifest entry {}", txt);
                                    unmatched.push(txt.to_string());
                                }
                            }
                        }
                        "PRODUCT_URI" => metadata.product_uri = Some(txt.to_string()),
                        "SPACECRAFT_NAME" => metadata.spacecraft = Some(txt.to_string()),
                        "PRODUCT_START_TIME" => metadata.start_time = Some(txt.to_string()),
                        "PROCESSING_LEVEL" => metadata.processing_level = Some(txt.to_string()),
                        "PRODUCT_TYPE" => metadata.product_type = Some(txt.to_string()),
                        "PROCESSING_BASELINE" => {
                            metadata.processing_baseline = Some(txt.to_string())
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(BandCatalog {
            product_dir: product_dir.to_path_buf(),
            metadata,
            bands,
            unmatched,
        })
    }

    pub fn get(&self, band: BandName) -> Option<&BandDescriptor> {
        self.bands.get(&band)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandDescriptor> {
        self.bands.values()
    }
}

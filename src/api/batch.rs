//! Product-level batch driver.
//!
//! Every band of the catalog is dispatched by the resolution tag in its
//! input file name (20m to the 2x resampler, 10m to the converter) on a
//! bounded rayon pool, followed by the optional reproject / clip / source
//! removal steps. A failing band never stops the others; outcomes are
//! collected into a [`BatchReport`].
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{OpOutcome, RasterJob, clip_raster, convert_raster, reproject_raster, resample_raster};
use crate::core::cancel::{CancelToken, OpBudget};
use crate::core::params::ProcessingParams;
use crate::error::{Error, Result};
use crate::io::sentinel2::{BandCatalog, BandDescriptor, ProductMetadata};
use crate::io::writers::metadata::OutputMetadata;
use crate::types::{BandName, BandOperation, ProcessingStep};

/// One output file written for a band
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedStep {
    pub band: BandName,
    pub step: ProcessingStep,
    pub output: PathBuf,
}

/// A band step that did not produce its output
#[derive(Debug, Clone, Serialize)]
pub struct BandFailure {
    pub band: BandName,
    /// Step name (`resample_2x`, `convert`, `reproject`, `clip`), `dispatch`
    /// or `remove_source`
    pub stage: String,
    pub input: PathBuf,
    pub error: String,
    /// Cancelled or timed out rather than failed on the data
    pub interrupted: bool,
}

impl BandFailure {
    fn new(band: BandName, stage: impl ToString, input: &Path, err: &Error) -> Self {
        BandFailure {
            band,
            stage: stage.to_string(),
            input: input.to_path_buf(),
            error: err.to_string(),
            interrupted: err.is_interrupted(),
        }
    }
}

/// Outcome of processing one product directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub product: PathBuf,
    pub completed: Vec<CompletedStep>,
    /// Bands whose main step was a deliberate no-op, with the reason
    pub skipped: Vec<(BandName, String)>,
    /// Bands whose input name carries neither resolution tag
    pub unhandled: Vec<BandFailure>,
    pub failures: Vec<BandFailure>,
    pub removed_sources: Vec<PathBuf>,
    /// Manifest image entries that matched no known band
    pub unmatched_entries: Vec<String>,
}

impl BatchReport {
    /// No failed and no unhandled bands.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.unhandled.is_empty()
    }

    pub fn log_summary(&self) {
        info!("Product: {:?}", self.product);
        info!("Outputs written: {}", self.completed.len());
        info!("Skipped: {}", self.skipped.len());
        info!("Unhandled: {}", self.unhandled.len());
        info!("Failures: {}", self.failures.len());
        info!("Sources removed: {}", self.removed_sources.len());
        for failure in self.unhandled.iter().chain(self.failures.iter()) {
            warn!("{} [{}]: {}", failure.band, failure.stage, failure.error);
        }
    }

    fn absorb(&mut self, band: BandOutcome) {
        self.completed.extend(band.completed);
        self.skipped.extend(band.skipped);
        self.unhandled.extend(band.unhandled);
        self.failures.extend(band.failures);
        self.removed_sources.extend(band.removed_source);
    }
}

#[derive(Debug, Default)]
struct BandOutcome {
    completed: Vec<CompletedStep>,
    skipped: Option<(BandName, String)>,
    unhandled: Option<BandFailure>,
    failures: Vec<BandFailure>,
    removed_source: Option<PathBuf>,
}

/// Parse `<product_dir>/MTD_MSIL2A.xml` and process every catalogued band.
///
/// Only an unusable catalog (missing manifest, no recognised band) or an
/// invalid parameter set aborts; per-band failures land in the report.
pub fn process_product(
    product_dir: &Path,
    params: &ProcessingParams,
    token: &CancelToken,
) -> Result<BatchReport> {
    let catalog = BandCatalog::open(product_dir)?;
    process_catalog(&catalog, params, token)
}

/// Process every band of an already-built catalog.
pub fn process_catalog(
    catalog: &BandCatalog,
    params: &ProcessingParams,
    token: &CancelToken,
) -> Result<BatchReport> {
    params.validate()?;
    for entry in &catalog.unmatched {
        debug!("Ignoring manifest entry without a known band: {}", entry);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.threads.unwrap_or(0))
        .build()
        .map_err(Error::external)?;
    let descriptors: Vec<&BandDescriptor> = catalog.iter().collect();
    info!(
        "Start to convert {} bands of {:?} on {} threads",
        descriptors.len(),
        catalog.product_dir,
        pool.current_num_threads()
    );

    let outcomes: Vec<BandOutcome> = pool.install(|| {
        descriptors
            .par_iter()
            .map(|desc| process_band(desc, &catalog.metadata, params, token))
            .collect()
    });

    let mut report = BatchReport {
        product: catalog.product_dir.clone(),
        unmatched_entries: catalog.unmatched.clone(),
        ..Default::default()
    };
    for outcome in outcomes {
        report.absorb(outcome);
    }
    info!(
        "Resampling and conversion of the 20m and 10m bands of {:?} finished",
        catalog.product_dir
    );
    Ok(report)
}

fn process_band(
    desc: &BandDescriptor,
    product: &ProductMetadata,
    params: &ProcessingParams,
    token: &CancelToken,
) -> BandOutcome {
    let mut outcome = BandOutcome::default();
    let input = desc.input_path();
    let output = desc.output_path();
    // each operation gets its own deadline
    let job = || RasterJob {
        strip_rows: params.strip_rows,
        budget: OpBudget::new(token.clone(), params.timeout()),
        metadata: OutputMetadata::for_band(product, desc.band),
    };
    debug!("{}: {:?}", desc.band, input);

    let (step, result) = match desc.operation() {
        BandOperation::Resample => (
            ProcessingStep::Resample2x,
            resample_raster(&input, &output, &job()),
        ),
        BandOperation::Convert => (
            ProcessingStep::Convert,
            convert_raster(&input, &output, &job()),
        ),
        BandOperation::Unhandled => {
            let err = Error::UnhandledResolution {
                input: desc.input_name.clone(),
            };
            warn!("{}: {}", desc.band, err);
            outcome.unhandled = Some(BandFailure::new(desc.band, "dispatch", &input, &err));
            return outcome;
        }
    };

    match result {
        Ok(OpOutcome::Written(path)) => outcome.completed.push(CompletedStep {
            band: desc.band,
            step,
            output: path,
        }),
        Ok(OpOutcome::Skipped { reason }) => {
            outcome.skipped = Some((desc.band, reason));
            return outcome;
        }
        Err(e) => {
            error!("{} failed for {:?}: {}", step, input, e);
            outcome.failures.push(BandFailure::new(desc.band, step, &input, &e));
            return outcome;
        }
    }

    if let Some(epsg) = params.target_epsg {
        let projected = desc.projected_path();
        match reproject_raster(&output, &projected, epsg, params.warp_resampling, &job()) {
            Ok(OpOutcome::Written(path)) => outcome.completed.push(CompletedStep {
                band: desc.band,
                step: ProcessingStep::Reproject,
                output: path,
            }),
            Ok(OpOutcome::Skipped { reason }) => debug!("Reprojection skipped: {}", reason),
            Err(e) => {
                error!("Reprojection of {:?} failed: {}", output, e);
                outcome
                    .failures
                    .push(BandFailure::new(desc.band, ProcessingStep::Reproject, &output, &e));
            }
        }
    }

    if let Some(bbox) = params.clip {
        let clipped = desc.clipped_path();
        match clip_raster(&output, &clipped, &bbox, &job()) {
            Ok(OpOutcome::Written(path)) => outcome.completed.push(CompletedStep {
                band: desc.band,
                step: ProcessingStep::Clip,
                output: path,
            }),
            Ok(OpOutcome::Skipped { reason }) => debug!("Clipping skipped: {}", reason),
            Err(e) => {
                error!("Clipping of {:?} failed: {}", output, e);
                outcome
                    .failures
                    .push(BandFailure::new(desc.band, ProcessingStep::Clip, &output, &e));
            }
        }
    }

    if params.delete_sources && outcome.failures.is_empty() && output.is_file() {
        match std::fs::remove_file(&input) {
            Ok(()) => {
                info!("Removing of {} done.", desc.input_name);
                outcome.removed_source = Some(input);
            }
            Err(e) => {
                let err = Error::from(e);
                warn!("Cannot remove {:?}: {}", input, err);
                outcome
                    .failures
                    .push(BandFailure::new(desc.band, "remove_source", &input, &err));
            }
        }
    }

    outcome
}

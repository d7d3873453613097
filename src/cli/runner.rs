use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use s2prep::ProcessingParams;
use s2prep::api::process_product;
use s2prep::core::cancel::CancelToken;

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file values (or defaults), overridden by explicit flags.
fn build_params(args: &CliArgs) -> Result<ProcessingParams, AppError> {
    let mut params = match &args.config {
        Some(path) => ProcessingParams::from_json_file(path)?,
        None => ProcessingParams::default(),
    };
    if args.threads.is_some() {
        params.threads = args.threads;
    }
    if args.timeout_secs.is_some() {
        params.timeout_secs = args.timeout_secs;
    }
    if args.target_epsg.is_some() {
        params.target_epsg = args.target_epsg;
    }
    if let Some(method) = args.warp_resampling {
        params.warp_resampling = method;
    }
    if args.clip.is_some() {
        params.clip = args.clip;
    }
    if let Some(rows) = args.strip_rows {
        params.strip_rows = rows;
    }
    if args.delete_sources {
        params.delete_sources = true;
    }
    params.validate()?;
    Ok(params)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let input = args.input.clone().ok_or(AppError::MissingArgument {
        arg: "--input".to_string(),
    })?;
    if !input.is_dir() {
        return Err(AppError::NotADirectory {
            path: input.display().to_string(),
        }
        .into());
    }
    let params = build_params(&args)?;

    let token = CancelToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, cancelling running operations");
            token.cancel();
        })
        .map_err(AppError::from)?;
    }

    info!("Processing product: {:?}", input);
    let report = process_product(&input, &params, &token).map_err(AppError::from)?;
    report.log_summary();

    if !report.is_success() {
        return Err(AppError::IncompleteProduct {
            product: input.display().to_string(),
            failed: report.failures.len(),
            unhandled: report.unhandled.len(),
        }
        .into());
    }
    info!("Successfully processed: {:?}\n", input);
    Ok(())
}

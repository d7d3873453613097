//! s2prep CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, process the
//! product directory, and exit with a non-zero status when any band failed.
//! For programmatic use, prefer the library API (`s2prep::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}

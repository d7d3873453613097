//! Command Line Interface (CLI) layer for s2prep.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for processing one product
//! directory. It wires user-provided options to the underlying library
//! functionality exposed via `s2prep::api`.
//!
//! If you are embedding s2prep into another application, prefer using
//! the high-level `s2prep::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;

use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Input is not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Processing of {product} incomplete: {failed} failed, {unhandled} unhandled band(s)")]
    IncompleteProduct {
        product: String,
        failed: usize,
        unhandled: usize,
    },

    #[error("Cannot install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Library(#[from] s2prep::Error),
}

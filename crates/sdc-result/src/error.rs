use std::path::PathBuf;

use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    #[error("column '{column}' not found in table result")]
    MissingColumn { column: String },

    #[error("table has no output file; set up and run the job first")]
    NoOutputPath,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("data frame error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, ResultError>;

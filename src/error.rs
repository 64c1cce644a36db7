use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while converting a single file. All
/// variants are fatal to the file being processed; none are retried.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read dataset {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        source: netcdf::Error,
    },

    #[error("variable '{0}' is not present in the dataset")]
    MissingColumn(String),

    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

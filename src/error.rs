//! Errors of the file-based entry points.

use crate::config::ParameterError;
use crate::export::FormatError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type of the file-based entry points.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Every error stops the evaluation: no report is produced.
#[derive(Error, Debug)]
pub enum EvalError {
    /// An input file cannot be read.
    #[error("cannot read {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

impl EvalError {
    pub(crate) fn resource<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        EvalError::Resource {
            path: path.into(),
            source,
        }
    }
}

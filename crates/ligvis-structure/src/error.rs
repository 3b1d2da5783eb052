//! Error types for structure loading and writing.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StructureError>;

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("No atoms found in {0}")]
    Empty(String),
}

//! Error taxonomy for a visualization run.

use std::path::PathBuf;

use ligvis_cnn::CnnError;
use ligvis_structure::StructureError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisError>;

#[derive(Error, Debug)]
pub enum VisError {
    /// Invalid or incomplete configuration, detected before any scoring
    #[error("{0}")]
    Configuration(String),

    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] CnnError),

    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VisError::Io {
            path: path.into(),
            source,
        }
    }

    /// Structure write failures are I/O failures of the run.
    pub fn from_write(err: StructureError) -> Self {
        match err {
            StructureError::Write { path, source } => VisError::Io { path, source },
            other => VisError::Structure(other),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, VisError::Configuration(_))
    }

    /// Process exit code: 1 for configuration errors, 2 for runtime failures.
    pub fn exit_code(&self) -> u8 {
        if self.is_configuration() {
            1
        } else {
            2
        }
    }
}

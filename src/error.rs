use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::partition::ByteRange;

/// Result type for histogram runs
pub type Result<T> = std::result::Result<T, HistogramError>;

/// Fatal errors. Per-record failures never reach this type.
#[derive(Error, Debug)]
pub enum HistogramError {
    /// Grid file could not be opened or decoded
    #[error("failed to load grid configuration from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Grid file decoded but describes an unusable grid
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Run settings that cannot be honoured
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input file could not be opened or mapped
    #[error("failed to open input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A worker hit an I/O error while scanning its range
    #[error("worker {worker} failed reading bytes {range}: {source}")]
    Worker {
        worker: usize,
        range: ByteRange,
        #[source]
        source: io::Error,
    },

    /// Worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Not every worker delivered its partial aggregate
    #[error("gather incomplete: expected {expected} partial aggregates, received {received}")]
    Transport { expected: usize, received: usize },
}

impl HistogramError {
    pub(crate) fn config_load<E>(path: impl Into<PathBuf>, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::ConfigLoad {
            path: path.into(),
            source: err.into(),
        }
    }
}

//! Error types for reading per-process counters from procfs.

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use super::ProcessId;

/// Errors raised while parsing a `key: value` stat file.
#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`CounterReader`](super::CounterReader).
#[derive(Debug, Error)]
pub enum Error {
    /// The process exited (or is exiting) since it was last seen.
    #[error("process {pid} not found")]
    NotFound { pid: ProcessId },
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: StatParseError,
    },
    #[error("failed to list processes in `{path}`: {source}")]
    ListProcesses {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` if the error means the process is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

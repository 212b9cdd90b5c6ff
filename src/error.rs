use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegionError>;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("malformed interval '{identifier}': expected `chrom:start-end`")]
    MalformedInterval { identifier: String },
    #[error("invalid coordinate in '{record}': {reason}")]
    InvalidCoordinate { record: String, reason: String },
    #[error("{path}:{line}: expected at least 3 tab-separated fields, found {found}")]
    Format {
        path: String,
        line: usize,
        found: usize,
    },
    #[error("required command not found in PATH: {command}")]
    CommandNotFound { command: String },
    #[error("command failed: {command} (exit: {code:?}) stderr: {stderr}")]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<RegionError> for io::Error {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::Io(e) => e,
            RegionError::CommandNotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            RegionError::ExternalTool { .. } => io::Error::new(io::ErrorKind::Other, err),
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

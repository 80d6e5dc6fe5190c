//! Error types for fanout_dsp

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::UnitId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parameter `{param}` has no values to broadcast")]
    EmptyBroadcastInput { param: String },
    #[error("index {index} out of range for {len} handles")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("no receiver for address {address} on port {port}")]
    AddressNotFound { port: u16, address: String },
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("unknown parameter `{0}`")]
    UnknownParam(String),
    #[error("parameter `{param}` expects {expected}")]
    TypeMismatch {
        param: String,
        expected: &'static str,
    },
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error("parse error in {path}:{line}")]
    Parse { path: PathBuf, line: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map an IO error on `path` to `FileNotFound` when the file is missing.
    pub(crate) fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(err)
        }
    }
}

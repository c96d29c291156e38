//! Error types for dump decoding.
//!
//! Only structural problems are errors. Out-of-range or missing sensor data is
//! reported as analysis issues instead.

use thiserror::Error;

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// The dump cannot be interpreted at all.
#[derive(Error, Debug)]
pub enum FormatError {
    /// File is shorter than the fixed header region.
    #[error("dump is {size} bytes, smaller than the {minimum}-byte header")]
    FileTooSmall { size: u64, minimum: usize },

    /// Device tag is neither MP nor MDG.
    #[error("unrecognized device type: {0:?} (expected MP or MDG)")]
    UnknownDeviceType(String),
}

/// Fatal decoder failure; aborts the whole dump.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

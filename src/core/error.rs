// megadrive-core/src/core/error.rs

//! Error types for the fallible surfaces of the core.
//!
//! Bus accesses never fail: unmapped reads return fill values and invalid
//! writes are discarded. Only loading (ROM, boot ROM, configuration) and
//! savestate restoration report errors.

use crate::core::cartridge::loader::RomFormat;
use thiserror::Error;

/// Errors raised while loading a cartridge image
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM image is empty")]
    Empty,

    #[error("ROM image is {size} bytes, maximum is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("ROM format {0} must be converted before loading")]
    UnsupportedFormat(RomFormat),

    #[error("loader delivered {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Stable negative status code for frontends that expect an integer.
    pub fn code(&self) -> i32 {
        match self {
            LoadError::Empty => -1,
            LoadError::RomTooLarge { .. } => -2,
            LoadError::UnsupportedFormat(_) => -3,
            LoadError::SizeMismatch { .. } => -4,
            LoadError::Io(_) => -5,
        }
    }
}

/// Reasons a boot ROM could not be mapped (TMSS stays disabled)
#[derive(Debug, Error)]
pub enum BootRomError {
    #[error("TMSS is disabled in the configuration")]
    NotEnabled,

    #[error("no boot ROM path configured")]
    NoPath,

    #[error("boot ROM is {0} bytes, larger than 512 KB")]
    TooLarge(usize),

    #[error("boot ROM is {0} bytes, smaller than the minimum")]
    TooSmall(usize),

    #[error("boot ROM I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while restoring a savestate
#[derive(Debug, Error)]
pub enum SavestateError {
    #[error("savestate is missing the \"{0}\" block")]
    MissingBlob(&'static str),

    #[error("savestate block \"{name}\" is truncated")]
    Truncated { name: &'static str },

    #[error("savestate block \"{name}\" was rejected")]
    Rejected { name: &'static str },

    #[error("no cartridge is loaded")]
    NoCartridge,
}

/// Syntax error in a fixup table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fixup table line {line}: {message}")]
pub struct FixupError {
    pub line: usize,
    pub message: String,
}

impl FixupError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Configuration persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

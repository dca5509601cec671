//! Error type for the runtime facade.

use nnrt_bridge::{BridgeError, ResultCode};
use nnrt_core::CoreError;
use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the runtime facade.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure reported by the bridge.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Malformed boundary data.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The model could not be loaded.
    #[error("Failed to load model: {0}")]
    Load(String),

    /// The configuration could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The async adapter lost its completion.
    #[error("Async runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// Boundary result code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            Error::Bridge(e) => e.code(),
            Error::Core(_) | Error::Load(_) | Error::Config(_) => ResultCode::InvalidArgument,
            Error::Runtime(_) => ResultCode::Unknown,
        }
    }
}

//! Engine status model.
//!
//! Engine errors carry a signed status code. Zero is success and never appears
//! in an [`EngineError`]; every failure maps to a negative code.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine-side failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A parameter was malformed or referred to an unknown object.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// A backend exists but could not be brought up.
    #[error("Backend failed to load: {0}")]
    BackendLoad(String),

    /// No backend with the requested id is registered.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// The backend has no device with the requested index.
    #[error("Device {device_id} not available on backend '{backend_id}'")]
    DeviceNotFound {
        /// Backend id.
        backend_id: String,
        /// Requested device index.
        device_id: u32,
    },

    /// A resource limit was hit.
    #[error("Out of resources: {0}")]
    OutOfResource(String),

    /// The object still has work in flight.
    #[error("Busy: {0}")]
    Busy(String),

    /// Graph compilation failed.
    #[error("Compilation failed: {0}")]
    CompileError(String),

    /// Graph execution failed.
    #[error("Execution failed: {0}")]
    ExecuteError(String),

    /// The device driver reported an error.
    #[error("Driver error: {0}")]
    DriverError(String),

    /// Releasing a context failed.
    #[error("Close failed: {0}")]
    CloseError(String),

    /// Backend enumeration failed.
    #[error("Discovery failed: {0}")]
    DiscoveryError(String),
}

impl EngineError {
    /// Signed status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::InvalidParam(_) => -1,
            EngineError::BackendLoad(_) => -2,
            EngineError::BackendNotFound(_) => -3,
            EngineError::DeviceNotFound { .. } => -4,
            EngineError::OutOfResource(_) => -5,
            EngineError::Busy(_) => -6,
            EngineError::CompileError(_) => -101,
            EngineError::ExecuteError(_) => -102,
            EngineError::DriverError(_) => -201,
            EngineError::CloseError(_) => -202,
            EngineError::DiscoveryError(_) => -203,
        }
    }

    /// Rebuild an error from a status code reported by a foreign engine.
    ///
    /// Returns `None` for zero. Unrecognized negative codes become
    /// [`EngineError::DriverError`] carrying the raw value.
    pub fn from_code(code: i32, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        let error = match code {
            0 => return None,
            -1 => EngineError::InvalidParam(message),
            -2 => EngineError::BackendLoad(message),
            -3 => EngineError::BackendNotFound(message),
            -4 => EngineError::DeviceNotFound {
                backend_id: message,
                device_id: 0,
            },
            -5 => EngineError::OutOfResource(message),
            -6 => EngineError::Busy(message),
            -101 => EngineError::CompileError(message),
            -102 => EngineError::ExecuteError(message),
            -202 => EngineError::CloseError(message),
            -203 => EngineError::DiscoveryError(message),
            other => EngineError::DriverError(format!("status {}: {}", other, message)),
        };
        Some(error)
    }
}

//! Bridge error taxonomy and the boundary result-code table.
//!
//! Engine failures are translated according to the operation that observed
//! them, then narrowed to a [`ResultCode`] whenever they have to cross a
//! boundary that only understands integers.

use std::fmt;

use nnrt_core::CoreError;
use nnrt_providers::EngineError;
use thiserror::Error;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Version of the [`ResultCode`] table. Bumped whenever a code changes meaning.
pub const RESULT_CODE_TABLE_VERSION: u32 = 1;

/// Errors surfaced by the bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// No backend with this id exists or it could not be brought up.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// The backend has no usable device with this index.
    #[error("Device {device_id} unavailable on backend '{backend_id}'")]
    DeviceUnavailable {
        /// Backend id.
        backend_id: String,
        /// Requested device.
        device_id: u32,
    },

    /// The engine ran out of contexts, memory or workers.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The engine or the bridge refused to accept a submission.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// Compilation failed after it was accepted.
    #[error("Compilation failed: {0}")]
    CompileFailed(String),

    /// Execution failed after it was accepted.
    #[error("Execution failed: {0}")]
    ExecuteFailed(String),

    /// Releasing a context failed. Not retried.
    #[error("Teardown failed: {0}")]
    TeardownFailed(String),

    /// Backend enumeration failed.
    #[error("Backend discovery failed: {0}")]
    DiscoveryFailed(String),

    /// An attribute record carried a tag with no engine counterpart.
    #[error("Unsupported attribute type code {code} on '{name}'")]
    UnsupportedAttributeType {
        /// Attribute name.
        name: String,
        /// The tag.
        code: u32,
    },

    /// A tensor's shape and data disagree, or the shape is malformed.
    #[error("Invalid tensor shape for '{name}': {reason}")]
    InvalidTensorShape {
        /// Tensor name.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// An operator used the same tag twice on one side.
    #[error("Duplicate {slot} tag '{tag}' on operator '{operator}'")]
    DuplicateTag {
        /// Operator name.
        operator: String,
        /// `"input"` or `"output"`.
        slot: &'static str,
        /// The repeated tag.
        tag: String,
    },

    /// Malformed argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine released a completion without ever firing it.
    #[error("Engine abandoned the {0} completion")]
    Abandoned(&'static str),
}

/// The operation during which an engine error was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `enumerate_backends`
    Discovery,
    /// `create_context`
    CreateContext,
    /// `destroy_context`
    DestroyContext,
    /// Synchronous part of `compile_graph`
    CompileSubmit,
    /// Synchronous part of `execute`
    ExecuteSubmit,
    /// Asynchronous outcome of `compile_graph`
    CompileCompletion,
    /// Asynchronous outcome of `execute`
    ExecuteCompletion,
}

/// Translate an engine error observed during `stage`.
pub fn translate(error: EngineError, stage: Stage) -> BridgeError {
    match stage {
        Stage::Discovery => return BridgeError::DiscoveryFailed(error.to_string()),
        Stage::DestroyContext => return BridgeError::TeardownFailed(error.to_string()),
        Stage::CompileCompletion => return BridgeError::CompileFailed(error.to_string()),
        Stage::ExecuteCompletion => return BridgeError::ExecuteFailed(error.to_string()),
        Stage::CreateContext | Stage::CompileSubmit | Stage::ExecuteSubmit => {}
    }

    match error {
        EngineError::BackendNotFound(id) | EngineError::BackendLoad(id) => {
            BridgeError::UnknownBackend(id)
        }
        EngineError::DeviceNotFound {
            backend_id,
            device_id,
        } => BridgeError::DeviceUnavailable {
            backend_id,
            device_id,
        },
        EngineError::OutOfResource(msg) => BridgeError::ResourceExhausted(msg),
        other if stage == Stage::CreateContext => BridgeError::InvalidArgument(other.to_string()),
        other => BridgeError::SubmissionRejected(other.to_string()),
    }
}

impl From<CoreError> for BridgeError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidTensorShape { name, reason } => {
                BridgeError::InvalidTensorShape { name, reason }
            }
            CoreError::UnsupportedAttributeType { name, code } => {
                BridgeError::UnsupportedAttributeType { name, code }
            }
            other => BridgeError::InvalidArgument(other.to_string()),
        }
    }
}

impl BridgeError {
    /// Boundary code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            BridgeError::UnknownBackend(_) => ResultCode::BackendNotFound,
            BridgeError::DeviceUnavailable { .. } => ResultCode::DeviceUnavailable,
            BridgeError::ResourceExhausted(_) => ResultCode::ResourceExhausted,
            BridgeError::SubmissionRejected(_) => ResultCode::SubmissionRejected,
            BridgeError::CompileFailed(_) => ResultCode::CompileFailed,
            BridgeError::ExecuteFailed(_) => ResultCode::ExecuteFailed,
            BridgeError::TeardownFailed(_) => ResultCode::TeardownFailed,
            BridgeError::DiscoveryFailed(_) => ResultCode::DiscoveryFailed,
            BridgeError::UnsupportedAttributeType { .. }
            | BridgeError::InvalidTensorShape { .. }
            | BridgeError::DuplicateTag { .. }
            | BridgeError::InvalidArgument(_) => ResultCode::InvalidArgument,
            BridgeError::Abandoned(_) => ResultCode::Unknown,
        }
    }
}

/// Integer result codes exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    /// Success.
    Ok = 0,
    /// Backend not found.
    BackendNotFound = 1,
    /// Device unavailable.
    DeviceUnavailable = 2,
    /// Compilation failed.
    CompileFailed = 3,
    /// Execution failed.
    ExecuteFailed = 4,
    /// Invalid argument.
    InvalidArgument = 5,
    /// Teardown failed.
    TeardownFailed = 6,
    /// Discovery failed.
    DiscoveryFailed = 7,
    /// Resource exhausted.
    ResourceExhausted = 8,
    /// Submission rejected.
    SubmissionRejected = 9,
    /// Anything else.
    Unknown = -1,
}

impl ResultCode {
    /// Every code in the table.
    pub const ALL: [ResultCode; 11] = [
        ResultCode::Ok,
        ResultCode::BackendNotFound,
        ResultCode::DeviceUnavailable,
        ResultCode::CompileFailed,
        ResultCode::ExecuteFailed,
        ResultCode::InvalidArgument,
        ResultCode::TeardownFailed,
        ResultCode::DiscoveryFailed,
        ResultCode::ResourceExhausted,
        ResultCode::SubmissionRejected,
        ResultCode::Unknown,
    ];

    /// The integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Code for an integer; values outside the table map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_i32() == code)
            .unwrap_or(ResultCode::Unknown)
    }

    /// Code of a bridge result.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => e.code(),
        }
    }

    /// Short fixed description.
    pub fn description(self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::BackendNotFound => "backend not found",
            ResultCode::DeviceUnavailable => "device unavailable",
            ResultCode::CompileFailed => "compilation failed",
            ResultCode::ExecuteFailed => "execution failed",
            ResultCode::InvalidArgument => "invalid argument",
            ResultCode::TeardownFailed => "teardown failed",
            ResultCode::DiscoveryFailed => "backend discovery failed",
            ResultCode::ResourceExhausted => "resource exhausted",
            ResultCode::SubmissionRejected => "submission rejected",
            ResultCode::Unknown => "unknown error",
        }
    }
}

impl From<&BridgeError> for ResultCode {
    fn from(error: &BridgeError) -> Self {
        error.code()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_depends_on_stage() {
        let busy = || EngineError::Busy("in flight".into());
        assert!(matches!(translate(busy(), Stage::DestroyContext), BridgeError::TeardownFailed(_)));
        assert!(matches!(translate(busy(), Stage::CompileSubmit), BridgeError::SubmissionRejected(_)));
        assert!(matches!(translate(busy(), Stage::CompileCompletion), BridgeError::CompileFailed(_)));
        assert!(matches!(translate(busy(), Stage::ExecuteCompletion), BridgeError::ExecuteFailed(_)));
        assert!(matches!(translate(busy(), Stage::Discovery), BridgeError::DiscoveryFailed(_)));
        assert!(matches!(translate(busy(), Stage::CreateContext), BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_create_context_failures() {
        assert_eq!(
            translate(EngineError::BackendNotFound("npu".into()), Stage::CreateContext),
            BridgeError::UnknownBackend("npu".into())
        );
        assert_eq!(
            translate(
                EngineError::DeviceNotFound {
                    backend_id: "sample".into(),
                    device_id: 3
                },
                Stage::CreateContext
            ),
            BridgeError::DeviceUnavailable {
                backend_id: "sample".into(),
                device_id: 3
            }
        );
        assert!(matches!(
            translate(EngineError::OutOfResource("full".into()), Stage::CreateContext),
            BridgeError::ResourceExhausted(_)
        ));
    }

    #[test]
    fn test_result_code_table() {
        assert_eq!(RESULT_CODE_TABLE_VERSION, 1);
        let expected = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, -1];
        for (code, value) in ResultCode::ALL.iter().zip(expected) {
            assert_eq!(code.as_i32(), value);
            assert_eq!(ResultCode::from_code(value), *code);
        }
        assert_eq!(ResultCode::from_code(42), ResultCode::Unknown);
    }

    #[test]
    fn test_every_error_narrows_to_one_code() {
        let cases = [
            (BridgeError::UnknownBackend("x".into()), 1),
            (BridgeError::CompileFailed("x".into()), 3),
            (BridgeError::ExecuteFailed("x".into()), 4),
            (
                BridgeError::DuplicateTag {
                    operator: "op".into(),
                    slot: "input",
                    tag: "X".into(),
                },
                5,
            ),
            (
                BridgeError::UnsupportedAttributeType {
                    name: "a".into(),
                    code: 5,
                },
                5,
            ),
            (BridgeError::TeardownFailed("x".into()), 6),
            (BridgeError::DiscoveryFailed("x".into()), 7),
            (BridgeError::SubmissionRejected("x".into()), 9),
            (BridgeError::Abandoned("execute"), -1),
        ];
        for (error, code) in cases {
            assert_eq!(error.code().as_i32(), code, "{error}");
        }
    }

    #[test]
    fn test_core_errors_convert() {
        let shape: BridgeError = CoreError::invalid_shape("t", "bad").into();
        assert_eq!(shape.code(), ResultCode::InvalidArgument);
        assert!(matches!(shape, BridgeError::InvalidTensorShape { .. }));
        let dtype: BridgeError = CoreError::UnknownDType(77).into();
        assert!(matches!(dtype, BridgeError::InvalidArgument(_)));
    }
}

//! nnrt C API
//!
//! Opaque-handle ABI over `nnrt-api`. Every handle a function returns is
//! paired with exactly one `*_destroy`; null handles are rejected with
//! result code 5 (invalid argument) or a null return, never dereferenced.
//! After a failed call, `nnrt_last_error` describes the failure on the
//! calling thread.
//!
//! The C declarations live in `include/nnrt.h`.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod config;
pub mod context;
pub mod error;
pub mod string;
pub mod tensor;

use std::os::raw::c_int;

use nnrt_core::{init_logging, LogLevel, LoggingConfig};

pub(crate) use context::runtime;

pub use collections::{NnrtBackends, NnrtTensorVec};
pub use config::NnrtConfig;
pub use context::{NnrtContext, NnrtLoadCallback, NnrtRunCallback};
pub use error::last_error_message;
pub use string::NnrtString;
pub use tensor::NnrtTensor;

/// Install the global log subscriber at `level` (0 trace to 4 error).
///
/// `RUST_LOG` overrides the level when set. Returns 1 when the subscriber was
/// installed, 0 when one already was or the level is out of range.
#[no_mangle]
pub extern "C" fn nnrt_init_logging(level: c_int) -> c_int {
    let Some(level) = LogLevel::from_code(level) else {
        return 0;
    };
    c_int::from(init_logging(LoggingConfig::new().with_level(level)))
}

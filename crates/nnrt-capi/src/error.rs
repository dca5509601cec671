//! Result codes and the per-thread last error.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;

use nnrt_api::Error;
use nnrt_bridge::{BridgeError, RESULT_CODE_TABLE_VERSION};
use tracing::warn;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| {
        slot.borrow_mut().take();
    });
}

pub(crate) fn set_last_error(message: &str) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(message);
    });
}

/// Record `error` as this thread's last error and return its code.
pub(crate) fn fail(call: &str, error: &Error) -> c_int {
    warn!("{} failed: {}", call, error);
    set_last_error(&error.to_string());
    error.code().as_i32()
}

/// Record `error` and return null, for entry points that produce handles.
pub(crate) fn fail_null<T>(call: &str, error: &Error) -> *mut T {
    fail(call, error);
    ptr::null_mut()
}

pub(crate) fn invalid(message: impl Into<String>) -> Error {
    Error::Bridge(BridgeError::InvalidArgument(message.into()))
}

/// Borrow a NUL-terminated UTF-8 argument.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(invalid(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| invalid(format!("{} is not valid UTF-8", what)))
}

/// Message of the last failed call on this thread, or null.
///
/// The pointer stays valid until the next nnrt call on the same thread.
#[no_mangle]
pub extern "C" fn nnrt_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => ptr::null(),
    })
}

/// Version of the result code table returned by every entry point.
#[no_mangle]
pub extern "C" fn nnrt_result_code_table_version() -> c_uint {
    RESULT_CODE_TABLE_VERSION
}

/// Last error of the calling thread as an owned string.
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|s| s.to_string_lossy().into_owned())
    })
}

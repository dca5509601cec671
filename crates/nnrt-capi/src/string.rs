//! Owned strings handed to the caller.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Opaque owned string.
#[derive(Debug)]
pub struct NnrtString(CString);

impl NnrtString {
    /// Box a copy of `value` for the caller. Interior NULs become spaces.
    pub(crate) fn new_raw(value: &str) -> *mut NnrtString {
        let value = CString::new(value.replace('\0', " ")).unwrap_or_default();
        Box::into_raw(Box::new(NnrtString(value)))
    }
}

/// NUL-terminated contents, valid until the string is destroyed.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_string_get(s: *const NnrtString) -> *const c_char {
    match s.as_ref() {
        Some(s) => s.0.as_ptr(),
        None => ptr::null(),
    }
}

/// Release a string. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a string handle that has not been destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_string_destroy(s: *mut NnrtString) {
    if !s.is_null() {
        drop(Box::from_raw(s));
    }
}

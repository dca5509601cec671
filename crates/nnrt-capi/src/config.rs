//! Configuration handles.

use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;

use nnrt_api::Config;
use nnrt_bridge::ResultCode;

use crate::error::{clear_last_error, fail, fail_null, invalid, str_arg};
use crate::string::NnrtString;

/// Opaque configuration handle.
pub type NnrtConfig = Config;

/// Create a configuration for `backend_id`, device `dev_id`.
///
/// Returns null when `backend_id` is null or not UTF-8. Release with
/// [`nnrt_config_destroy`].
///
/// # Safety
///
/// `backend_id` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_new(backend_id: *const c_char, dev_id: c_uint) -> *mut NnrtConfig {
    clear_last_error();
    match str_arg(backend_id, "backend_id") {
        Ok(backend_id) => Box::into_raw(Box::new(Config::new(backend_id, dev_id))),
        Err(e) => fail_null("nnrt_config_new", &e),
    }
}

/// Add or replace an option.
///
/// # Safety
///
/// `config` must be null or a live handle; `key` and `value` must be null or
/// NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_add_option(
    config: *mut NnrtConfig,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(config) = config.as_mut() else {
        return fail("nnrt_config_add_option", &invalid("config is null"));
    };
    let added = str_arg(key, "key").and_then(|key| Ok((key, str_arg(value, "value")?)));
    match added {
        Ok((key, value)) => {
            config.add_option(key, value);
            ResultCode::Ok.as_i32()
        }
        Err(e) => fail("nnrt_config_add_option", &e),
    }
}

/// Value of option `key` as an owned string, or null when it is unset.
///
/// A non-null result must be released with `nnrt_string_destroy`.
///
/// # Safety
///
/// `config` must be null or a live handle; `key` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_get_option(config: *const NnrtConfig, key: *const c_char) -> *mut NnrtString {
    clear_last_error();
    let Some(config) = config.as_ref() else {
        return fail_null("nnrt_config_get_option", &invalid("config is null"));
    };
    match str_arg(key, "key") {
        Ok(key) => config.option(key).map_or(ptr::null_mut(), NnrtString::new_raw),
        Err(e) => fail_null("nnrt_config_get_option", &e),
    }
}

/// Backend id as an owned string. Release with `nnrt_string_destroy`.
///
/// # Safety
///
/// `config` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_get_backend_id(config: *const NnrtConfig) -> *mut NnrtString {
    clear_last_error();
    match config.as_ref() {
        Some(config) => NnrtString::new_raw(&config.backend_id),
        None => fail_null("nnrt_config_get_backend_id", &invalid("config is null")),
    }
}

/// Device index, 0 for a null handle.
///
/// # Safety
///
/// `config` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_get_dev_id(config: *const NnrtConfig) -> c_uint {
    clear_last_error();
    match config.as_ref() {
        Some(config) => config.device_id,
        None => {
            fail("nnrt_config_get_dev_id", &invalid("config is null"));
            0
        }
    }
}

/// Print the configuration to stdout.
///
/// # Safety
///
/// `config` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_print(config: *const NnrtConfig) {
    if let Some(config) = config.as_ref() {
        println!("{}", config);
    }
}

/// Release a configuration. Null is ignored.
///
/// # Safety
///
/// `config` must be null or a handle from [`nnrt_config_new`] that has not
/// been destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_config_destroy(config: *mut NnrtConfig) {
    if !config.is_null() {
        drop(Box::from_raw(config));
    }
}

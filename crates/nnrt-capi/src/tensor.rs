//! Tensor handles.
//!
//! Tensors cross the boundary as opaque pointers. Format and dtype travel as
//! their integer codes so an out-of-range value from the caller is an
//! `InvalidArgument` rather than an invalid enum.

use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use std::slice;

use nnrt_api::Error;
use nnrt_bridge::ResultCode;
use nnrt_core::{DType, Format, Tensor};

use crate::error::{clear_last_error, fail, fail_null, invalid, str_arg};
use crate::string::NnrtString;

/// Opaque tensor handle.
pub type NnrtTensor = Tensor;

unsafe fn new_tensor(
    name: *const c_char,
    dim_count: c_uint,
    shape: *const c_uint,
    format: c_uint,
    dtype: c_uint,
) -> Result<Tensor, Error> {
    let name = str_arg(name, "name")?;
    if shape.is_null() {
        return Err(invalid("shape is null"));
    }
    let dims = slice::from_raw_parts(shape, dim_count as usize);
    let format = Format::from_code(format)?;
    let dtype = DType::from_code(dtype)?;
    Ok(Tensor::new_with_shape(name, dims, format, dtype)?)
}

/// Create a tensor without data.
///
/// Returns null on a null name or shape, a dimension count outside 1 to 8,
/// an element count that overflows, or an unknown format or dtype code. Release with [`nnrt_tensor_destroy`].
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string; `shape` must be null or
/// point to `dim_count` readable values.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_new(
    name: *const c_char,
    dim_count: c_uint,
    shape: *const c_uint,
    format: c_uint,
    dtype: c_uint,
) -> *mut NnrtTensor {
    clear_last_error();
    match new_tensor(name, dim_count, shape, format, dtype) {
        Ok(tensor) => Box::into_raw(Box::new(tensor)),
        Err(e) => fail_null("nnrt_tensor_new", &e),
    }
}

/// Attach caller-owned data without copying.
///
/// `len` must match the shape and dtype exactly for fixed-width dtypes.
///
/// # Safety
///
/// `tensor` must be null or a live handle. `data` must stay valid and
/// unmodified for `len` bytes until the tensor is destroyed or given new data,
/// and until every run it was passed to has called back.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_set_data(tensor: *mut NnrtTensor, data: *const u8, len: usize) -> c_int {
    clear_last_error();
    let Some(tensor) = tensor.as_mut() else {
        return fail("nnrt_tensor_set_data", &invalid("tensor is null"));
    };
    match tensor.set_external_data(data, len) {
        Ok(()) => ResultCode::Ok.as_i32(),
        Err(e) => fail("nnrt_tensor_set_data", &e.into()),
    }
}

/// Tensor name as an owned string. Release with `nnrt_string_destroy`.
///
/// # Safety
///
/// `tensor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_name(tensor: *const NnrtTensor) -> *mut NnrtString {
    clear_last_error();
    match tensor.as_ref() {
        Some(tensor) => NnrtString::new_raw(tensor.name()),
        None => fail_null("nnrt_tensor_get_name", &invalid("tensor is null")),
    }
}

/// Format code, 0 for a null handle.
///
/// # Safety
///
/// `tensor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_format(tensor: *const NnrtTensor) -> c_uint {
    tensor.as_ref().map_or(0, |t| t.format().code())
}

/// Dtype code, 0 (undefined) for a null handle.
///
/// # Safety
///
/// `tensor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_dtype(tensor: *const NnrtTensor) -> c_uint {
    tensor.as_ref().map_or(0, |t| t.dtype().code())
}

/// Write a pointer to the dimensions into `shape` and return their count.
///
/// The dimensions stay valid while the tensor is alive.
///
/// # Safety
///
/// `tensor` must be null or a live handle; `shape` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_shape(tensor: *const NnrtTensor, shape: *mut *const c_uint) -> c_uint {
    clear_last_error();
    let (Some(tensor), false) = (tensor.as_ref(), shape.is_null()) else {
        fail("nnrt_tensor_get_shape", &invalid("tensor or shape is null"));
        return 0;
    };
    let dims = tensor.shape().dims();
    *shape = dims.as_ptr();
    dims.len() as c_uint
}

/// Number of elements, the product of the dimensions.
///
/// # Safety
///
/// `tensor` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_element_count(tensor: *const NnrtTensor) -> usize {
    tensor.as_ref().map_or(0, Tensor::element_count)
}

/// Write a pointer to the data into `data` and return its byte length.
///
/// A tensor without data yields null and 0.
///
/// # Safety
///
/// `tensor` must be null or a live handle; `data` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_get_data(tensor: *const NnrtTensor, data: *mut *const u8) -> usize {
    clear_last_error();
    let (Some(tensor), false) = (tensor.as_ref(), data.is_null()) else {
        fail("nnrt_tensor_get_data", &invalid("tensor or data is null"));
        return 0;
    };
    match tensor.buffer() {
        Some(buffer) => {
            *data = buffer.as_ptr();
            buffer.len()
        }
        None => {
            *data = ptr::null();
            0
        }
    }
}

/// Release a tensor. Null is ignored. Attached caller data is not freed.
///
/// # Safety
///
/// `tensor` must be null or a handle from [`nnrt_tensor_new`] that has not
/// been destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensor_destroy(tensor: *mut NnrtTensor) {
    if !tensor.is_null() {
        drop(Box::from_raw(tensor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::{nnrt_string_destroy, nnrt_string_get};
    use std::ffi::{CStr, CString};

    #[test]
    fn test_tensor_scenario() {
        let name = CString::new("data1").unwrap();
        let shape: [c_uint; 4] = [1, 1, 2, 2];
        let values: [f32; 4] = [1.1, 2.2, 3.3, 4.4];

        unsafe {
            let tensor = nnrt_tensor_new(name.as_ptr(), 4, shape.as_ptr(), 1, 1);
            assert!(!tensor.is_null());
            assert_eq!(nnrt_tensor_set_data(tensor, values.as_ptr().cast(), 16), 0);

            let s = nnrt_tensor_get_name(tensor);
            assert_eq!(CStr::from_ptr(nnrt_string_get(s)).to_str().unwrap(), "data1");
            nnrt_string_destroy(s);

            assert_eq!(nnrt_tensor_get_format(tensor), 1);
            assert_eq!(nnrt_tensor_get_dtype(tensor), 1);
            assert_eq!(nnrt_tensor_get_element_count(tensor), 4);

            let mut dims: *const c_uint = ptr::null();
            assert_eq!(nnrt_tensor_get_shape(tensor, &mut dims), 4);
            assert_eq!(slice::from_raw_parts(dims, 4), &shape);

            let mut data: *const u8 = ptr::null();
            assert_eq!(nnrt_tensor_get_data(tensor, &mut data), 16);
            assert_eq!(data, values.as_ptr().cast::<u8>());

            nnrt_tensor_destroy(tensor);
        }
    }

    #[test]
    fn test_invalid_tensors() {
        let name = CString::new("t").unwrap();
        let shape: [c_uint; 9] = [1; 9];
        unsafe {
            assert!(nnrt_tensor_new(name.as_ptr(), 9, shape.as_ptr(), 1, 1).is_null());
            assert!(nnrt_tensor_new(name.as_ptr(), 2, shape.as_ptr(), 99, 1).is_null());
            assert!(nnrt_tensor_new(name.as_ptr(), 2, shape.as_ptr(), 1, 99).is_null());
            assert!(nnrt_tensor_new(name.as_ptr(), 2, ptr::null(), 1, 1).is_null());
            assert!(nnrt_tensor_new(name.as_ptr(), 0, shape.as_ptr(), 1, 1).is_null());
            assert!(nnrt_tensor_new(name.as_ptr(), 0, ptr::null(), 1, 1).is_null());

            let tensor = nnrt_tensor_new(name.as_ptr(), 2, shape.as_ptr(), 1, 1);
            let bytes = [0u8; 4];
            assert_eq!(nnrt_tensor_set_data(tensor, bytes.as_ptr(), 4), 5);
            assert_eq!(nnrt_tensor_set_data(tensor, ptr::null(), 8), 5);

            let mut data: *const u8 = bytes.as_ptr();
            assert_eq!(nnrt_tensor_get_data(tensor, &mut data), 0);
            assert!(data.is_null());
            nnrt_tensor_destroy(tensor);
        }
    }

    #[test]
    fn test_oversized_shapes_fail_cleanly() {
        let name = CString::new("big").unwrap();
        let huge: [c_uint; 3] = [c_uint::MAX; 3];
        unsafe {
            assert!(nnrt_tensor_new(name.as_ptr(), 3, huge.as_ptr(), 1, 1).is_null());
            assert!(!crate::error::nnrt_last_error().is_null());

            #[cfg(target_pointer_width = "64")]
            {
                // float64 (dtype 11): elements fit, bytes do not.
                let wide: [c_uint; 2] = [c_uint::MAX; 2];
                let tensor = nnrt_tensor_new(name.as_ptr(), 2, wide.as_ptr(), 1, 11);
                assert!(!tensor.is_null());
                let bytes = [0u8; 4];
                assert_eq!(nnrt_tensor_set_data(tensor, bytes.as_ptr(), 4), 5);
                nnrt_tensor_destroy(tensor);
            }
        }
    }
}

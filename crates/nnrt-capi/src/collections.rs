//! Result tensor vectors and backend lists.

use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;

use nnrt_bridge::ResultCode;
use nnrt_core::Tensor;

use crate::error::{clear_last_error, fail, invalid};
use crate::runtime;
use crate::tensor::NnrtTensor;

/// Opaque vector of result tensors delivered to a run callback.
#[derive(Debug, Default)]
pub struct NnrtTensorVec {
    tensors: Vec<Tensor>,
}

impl NnrtTensorVec {
    pub(crate) fn new(tensors: Vec<Tensor>) -> Self {
        Self { tensors }
    }
}

/// Number of tensors, 0 for a null handle.
///
/// # Safety
///
/// `vec` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensorvec_get_len(vec: *const NnrtTensorVec) -> c_uint {
    vec.as_ref().map_or(0, |v| v.tensors.len() as c_uint)
}

/// Borrow tensor `index`, or null when out of range.
///
/// The tensor belongs to the vector: read it with the `nnrt_tensor_get_*`
/// functions while the vector is alive and never destroy it on its own.
///
/// # Safety
///
/// `vec` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensorvec_get(vec: *const NnrtTensorVec, index: c_uint) -> *const NnrtTensor {
    vec.as_ref()
        .and_then(|v| v.tensors.get(index as usize))
        .map_or(ptr::null(), |t| t as *const Tensor)
}

/// Release a vector and every tensor in it. Null is ignored.
///
/// # Safety
///
/// `vec` must be null or a handle received by a run callback that has not
/// been destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_tensorvec_destroy(vec: *mut NnrtTensorVec) {
    if !vec.is_null() {
        drop(Box::from_raw(vec));
    }
}

/// Opaque list of backend ids.
#[derive(Debug, Default)]
pub struct NnrtBackends {
    ids: Vec<CString>,
}

/// Discover the backends available to `nnrt_load`, in preference order.
///
/// The list may be empty. Release it with [`nnrt_backends_destroy`].
///
/// # Safety
///
/// `out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn nnrt_get_candidate_backends(out: *mut *mut NnrtBackends) -> c_int {
    clear_last_error();
    if out.is_null() {
        return fail("nnrt_get_candidate_backends", &invalid("out is null"));
    }
    let ids = match runtime().and_then(|rt| rt.candidate_backends()) {
        Ok(ids) => ids,
        Err(e) => return fail("nnrt_get_candidate_backends", &e),
    };
    let ids = ids
        .into_iter()
        .filter_map(|id| CString::new(id).ok())
        .collect();
    *out = Box::into_raw(Box::new(NnrtBackends { ids }));
    ResultCode::Ok.as_i32()
}

/// Number of backends, 0 for a null handle.
///
/// # Safety
///
/// `backends` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_backends_get_len(backends: *const NnrtBackends) -> c_uint {
    backends.as_ref().map_or(0, |b| b.ids.len() as c_uint)
}

/// Backend id `index`, or null when out of range. Valid while the list is alive.
///
/// # Safety
///
/// `backends` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnrt_backends_get(backends: *const NnrtBackends, index: c_uint) -> *const c_char {
    backends
        .as_ref()
        .and_then(|b| b.ids.get(index as usize))
        .map_or(ptr::null(), |id| id.as_ptr())
}

/// Release a backend list. Null is ignored.
///
/// # Safety
///
/// `backends` must be null or a handle from [`nnrt_get_candidate_backends`]
/// that has not been destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_backends_destroy(backends: *mut NnrtBackends) {
    if !backends.is_null() {
        drop(Box::from_raw(backends));
    }
}

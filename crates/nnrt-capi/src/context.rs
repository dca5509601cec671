//! Contexts: model loading, inference and teardown.
//!
//! Every call goes through one process-wide [`Runtime`] over the in-process
//! engine, created on first use. Callbacks run on engine worker threads and
//! fire exactly once for every call that returned 0; a non-zero return means
//! the callback will never run.

use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::slice;
use std::sync::OnceLock;

use nnrt_api::{Error, Runtime, Session, TensorVec};
use nnrt_bridge::ResultCode;
use nnrt_core::Tensor;
use tracing::{debug, error, warn};

use crate::collections::NnrtTensorVec;
use crate::config::NnrtConfig;
use crate::error::{clear_last_error, fail, invalid, str_arg};
use crate::tensor::NnrtTensor;

/// Opaque context handle: a loaded model bound to one backend device.
#[derive(Debug)]
pub struct NnrtContext {
    session: Session,
}

/// Load completion: `(code, userdata)`.
pub type NnrtLoadCallback = Option<unsafe extern "C" fn(code: c_int, userdata: *mut c_void)>;

/// Run completion: `(outputs, count, code, userdata)`.
///
/// On success the callback owns `outputs` and releases it with
/// `nnrt_tensorvec_destroy`. On failure `outputs` is null and `count` 0.
pub type NnrtRunCallback = Option<
    unsafe extern "C" fn(outputs: *mut NnrtTensorVec, count: c_uint, code: c_int, userdata: *mut c_void),
>;

/// Caller userdata carried to an engine thread.
struct UserData(*mut c_void);

// SAFETY: the pointer is never dereferenced here, only handed back to the
// caller's callback, which owns its thread-safety.
unsafe impl Send for UserData {}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

pub(crate) fn runtime() -> Result<&'static Runtime, Error> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Runtime::with_local_engine()?;
    let _ = RUNTIME.set(runtime);
    RUNTIME
        .get()
        .ok_or_else(|| Error::Runtime("runtime initialization raced and lost".to_string()))
}

type RunFn = unsafe extern "C" fn(*mut NnrtTensorVec, c_uint, c_int, *mut c_void);

fn deliver_run(callback: RunFn, userdata: UserData, outcome: nnrt_api::Result<TensorVec>) {
    let tensors = outcome.and_then(|outputs| Ok(outputs.to_tensors()?));
    match tensors {
        Ok(tensors) => {
            let count = tensors.len() as c_uint;
            let outputs = Box::into_raw(Box::new(NnrtTensorVec::new(tensors)));
            // SAFETY: the caller supplied this callback for this run.
            unsafe { callback(outputs, count, ResultCode::Ok.as_i32(), userdata.0) };
        }
        Err(e) => {
            error!("Run completed with error: {}", e);
            // SAFETY: as above.
            unsafe { callback(ptr::null_mut(), 0, e.code().as_i32(), userdata.0) };
        }
    }
}

/// Load the model at `model_path` with `config` and start compiling it.
///
/// On 0, `*ctx` holds a new context and `on_load` will be called exactly once
/// with the compile outcome. `*ctx` is written before compilation starts, so
/// it is already set when `on_load` runs. The context accepts `nnrt_run` once
/// `on_load` reported 0. On failure `*ctx` is set to null. `config` is only read
/// and stays owned by the caller.
///
/// # Safety
///
/// `ctx` must be null or writable; `model_path` null or a NUL-terminated
/// string; `config` null or a live handle. `userdata` is passed through
/// untouched and must be usable from another thread.
#[no_mangle]
pub unsafe extern "C" fn nnrt_load(
    ctx: *mut *mut NnrtContext,
    model_path: *const c_char,
    config: *const NnrtConfig,
    on_load: NnrtLoadCallback,
    userdata: *mut c_void,
) -> c_int {
    clear_last_error();
    if ctx.is_null() {
        return fail("nnrt_load", &invalid("ctx is null"));
    }
    *ctx = ptr::null_mut();
    let Some(config) = config.as_ref() else {
        return fail("nnrt_load", &invalid("config is null"));
    };
    let Some(on_load) = on_load else {
        return fail("nnrt_load", &invalid("on_load is null"));
    };
    let model_path = match str_arg(model_path, "model_path") {
        Ok(path) => path,
        Err(e) => return fail("nnrt_load", &e),
    };

    let config = config.clone().with_model_path(model_path);
    let (session, graph) = match runtime().and_then(|rt| rt.open(&config)) {
        Ok(opened) => opened,
        Err(e) => return fail("nnrt_load", &e),
    };
    debug!("nnrt_load: context for '{}' created", session.graph_name());
    // Published before the compile is submitted, so `on_load` always sees it.
    let handle = Box::into_raw(Box::new(NnrtContext { session }));
    *ctx = handle;

    let userdata = UserData(userdata);
    let submitted = (*handle).session.compile(&graph, move |outcome| {
        // Move the whole wrapper; a field capture would not be Send.
        let userdata = userdata;
        let code = match outcome {
            Ok(()) => ResultCode::Ok.as_i32(),
            Err(e) => {
                error!("Load completed with error: {}", e);
                e.code().as_i32()
            }
        };
        // SAFETY: the caller supplied this callback for this load.
        unsafe { on_load(code, userdata.0) };
    });

    match submitted {
        Ok(()) => ResultCode::Ok.as_i32(),
        Err(e) => {
            *ctx = ptr::null_mut();
            let context = Box::from_raw(handle);
            if let Err(close) = context.session.destroy() {
                warn!("Releasing context after rejected compile failed: {}", close);
            }
            fail("nnrt_load", &e)
        }
    }
}

/// Run inference on `ctx` with `count` input tensors.
///
/// On 0, `on_run` will be called exactly once.
///
/// # Safety
///
/// `ctx` must be null or a live context; `inputs` must point to `count` live
/// tensor handles (or may be null when `count` is 0). Input tensors and any
/// caller data attached to them must stay alive until `on_run` is called.
#[no_mangle]
pub unsafe extern "C" fn nnrt_run(
    ctx: *const NnrtContext,
    inputs: *const *const NnrtTensor,
    count: c_uint,
    on_run: NnrtRunCallback,
    userdata: *mut c_void,
) -> c_int {
    clear_last_error();
    let Some(ctx) = ctx.as_ref() else {
        return fail("nnrt_run", &invalid("ctx is null"));
    };
    let Some(on_run) = on_run else {
        return fail("nnrt_run", &invalid("on_run is null"));
    };
    let handles: &[*const NnrtTensor] = match (count, inputs.is_null()) {
        (0, _) => &[],
        (_, true) => return fail("nnrt_run", &invalid("inputs is null")),
        (count, false) => slice::from_raw_parts(inputs, count as usize),
    };
    let mut tensors: Vec<&Tensor> = Vec::with_capacity(handles.len());
    for (index, handle) in handles.iter().enumerate() {
        match handle.as_ref() {
            Some(tensor) => tensors.push(tensor),
            None => return fail("nnrt_run", &invalid(format!("input {} is null", index))),
        }
    }

    let userdata = UserData(userdata);
    let submitted = ctx
        .session
        .run(&tensors, move |outcome| deliver_run(on_run, userdata, outcome));
    match submitted {
        Ok(()) => ResultCode::Ok.as_i32(),
        Err(e) => fail("nnrt_run", &e),
    }
}

/// Destroy a context. The handle is released whatever the result.
///
/// A non-zero result reports a teardown problem, such as runs still in
/// flight.
///
/// # Safety
///
/// `ctx` must be null or a context from [`nnrt_load`] that has not been
/// destroyed.
#[no_mangle]
pub unsafe extern "C" fn nnrt_context_destroy(ctx: *mut NnrtContext) -> c_int {
    clear_last_error();
    if ctx.is_null() {
        return fail("nnrt_context_destroy", &invalid("ctx is null"));
    }
    let context = Box::from_raw(ctx);
    match context.session.destroy() {
        Ok(()) => ResultCode::Ok.as_i32(),
        Err(e) => fail("nnrt_context_destroy", &e),
    }
}

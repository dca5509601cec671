//! The engine service interface.
//!
//! An engine owns backends and execution contexts. Structural calls return
//! synchronously; compile and execute are submitted and complete later on an
//! engine-owned thread by invoking the supplied callback once.
//!
//! If a submission returns `Err`, the engine must not invoke the callback.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::graph::Graph;
use crate::tensor::Tensor;

/// Opaque backend options, passed through untouched.
pub type ContextOptions = BTreeMap<String, String>;

/// Completion of a compile submission.
pub type CompileCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Completion of an execute submission.
pub type ExecuteCallback = Box<dyn FnOnce(Result<Vec<Tensor>>) + Send + 'static>;

/// Engine-issued handle to an execution context.
///
/// Handles are not clonable: whoever holds one is responsible for passing it
/// to [`Engine::destroy_context`] exactly once.
pub struct ContextHandle {
    id: u64,
    backend_id: String,
    device_id: u32,
}

impl ContextHandle {
    /// Issue a handle. Only engines should call this.
    pub fn new(id: u64, backend_id: impl Into<String>, device_id: u32) -> Self {
        Self {
            id,
            backend_id: backend_id.into(),
            device_id,
        }
    }

    /// Engine-wide id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Backend the context runs on.
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Device index on that backend.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextHandle(#{} on {}:{})", self.id, self.backend_id, self.device_id)
    }
}

/// Inference engine service.
pub trait Engine: Send + Sync {
    /// Ids of the usable backends, in preference order.
    fn enumerate_backends(&self) -> Result<Vec<String>>;

    /// Open an execution context on a backend device.
    fn create_context(
        &self,
        backend_id: &str,
        device_id: u32,
        options: &ContextOptions,
    ) -> Result<ContextHandle>;

    /// Release a context.
    fn destroy_context(&self, handle: ContextHandle) -> Result<()>;

    /// Submit a graph for compilation on the context.
    fn compile_graph(
        &self,
        handle: &ContextHandle,
        graph: Graph,
        on_complete: CompileCallback,
    ) -> Result<()>;

    /// Submit the compiled graph for execution with `inputs`.
    fn execute(
        &self,
        handle: &ContextHandle,
        inputs: Vec<Tensor>,
        on_complete: ExecuteCallback,
    ) -> Result<()>;
}

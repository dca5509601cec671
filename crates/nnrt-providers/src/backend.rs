//! Backends: the device-specific half of an engine.

use std::collections::HashSet;

use crate::error::Result;
use crate::graph::Graph;
use crate::tensor::Tensor;

/// What a backend can do.
#[derive(Debug, Clone)]
pub struct BackendCapability {
    /// Operator types it accepts.
    pub supported_ops: HashSet<String>,
    /// Number of devices it exposes.
    pub device_count: u32,
}

/// A graph after backend compilation.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    /// Source graph name.
    pub name: String,
    /// Number of operators compiled.
    pub operator_count: usize,
    /// Names of variable tensors read by the graph, in first-use order.
    pub variable_inputs: Vec<String>,
}

/// Device backend.
pub trait Backend: Send + Sync {
    /// Stable id, e.g. `"sample"`.
    fn backend_id(&self) -> &str;

    /// Capability summary.
    fn capability(&self) -> BackendCapability;

    /// Compile a graph for `device_id`.
    fn compile(&self, device_id: u32, graph: &Graph) -> Result<CompiledGraph>;

    /// Run a compiled graph.
    fn execute(&self, device_id: u32, compiled: &CompiledGraph, inputs: Vec<Tensor>) -> Result<Vec<Tensor>>;

    /// Release backend resources.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

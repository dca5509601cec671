//! Loopback backend.
//!
//! `sample` accepts a fixed set of operator types, validates graphs against
//! it, and on execution returns a copy of every input in engine-owned memory.
//! It computes nothing; it exists so the bridge can be driven end to end
//! without a device.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backend::{Backend, BackendCapability, CompiledGraph};
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::tensor::{Buffer, Tensor, TensorData};

/// Id under which the loopback backend registers.
pub const SAMPLE_BACKEND_ID: &str = "sample";

/// Loopback backend configuration.
#[derive(Debug, Clone)]
pub struct SampleBackendConfig {
    /// Number of devices exposed.
    pub device_count: u32,
    /// Accepted operator types.
    pub supported_ops: HashSet<String>,
    /// Delay added to every execution, for exercising in-flight states.
    pub execution_delay: Duration,
}

impl Default for SampleBackendConfig {
    fn default() -> Self {
        let supported_ops = [
            "Identity", "Add", "Sub", "Mul", "Div", "MatMul", "Gemm", "Conv", "Relu", "Sigmoid",
            "Tanh", "Softmax", "Reshape", "Transpose", "Flatten", "Concat", "MaxPool",
            "AveragePool", "BatchNormalization",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            device_count: 2,
            supported_ops,
            execution_delay: Duration::ZERO,
        }
    }
}

impl SampleBackendConfig {
    /// Set the device count.
    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    /// Accept an additional operator type.
    pub fn with_supported_op(mut self, op_type: impl Into<String>) -> Self {
        self.supported_ops.insert(op_type.into());
        self
    }

    /// Delay every execution.
    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = delay;
        self
    }
}

/// Loopback backend.
pub struct SampleBackend {
    config: SampleBackendConfig,
}

impl SampleBackend {
    /// Backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(SampleBackendConfig::default())
    }

    /// Backend with custom configuration.
    pub fn with_config(config: SampleBackendConfig) -> Self {
        info!(
            "Created sample backend with {} devices and {} operator types",
            config.device_count,
            config.supported_ops.len()
        );
        Self { config }
    }

    fn check_device(&self, device_id: u32) -> Result<()> {
        if device_id >= self.config.device_count {
            return Err(EngineError::DeviceNotFound {
                backend_id: SAMPLE_BACKEND_ID.to_string(),
                device_id,
            });
        }
        Ok(())
    }
}

impl Default for SampleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SampleBackend {
    fn backend_id(&self) -> &str {
        SAMPLE_BACKEND_ID
    }

    fn capability(&self) -> BackendCapability {
        BackendCapability {
            supported_ops: self.config.supported_ops.clone(),
            device_count: self.config.device_count,
        }
    }

    fn compile(&self, device_id: u32, graph: &Graph) -> Result<CompiledGraph> {
        self.check_device(device_id)?;

        let mut produced: HashSet<&str> = HashSet::new();
        let mut variable_inputs: Vec<String> = Vec::new();
        for op in &graph.operators {
            if !self.config.supported_ops.contains(op.op_type()) {
                return Err(EngineError::CompileError(format!(
                    "operator '{}' has unsupported type '{}'",
                    op.name(),
                    op.op_type()
                )));
            }
            for (_, tensor) in op.inputs() {
                let is_new = !produced.contains(tensor.name.as_str())
                    && !variable_inputs.contains(&tensor.name);
                if matches!(tensor.data, TensorData::Variable) && is_new {
                    variable_inputs.push(tensor.name.clone());
                }
            }
            produced.extend(op.outputs().iter().map(|(_, t)| t.name.as_str()));
        }

        debug!(
            "Compiled graph '{}' ({} operators, {} variable inputs) on device {}",
            graph.name,
            graph.operators.len(),
            variable_inputs.len(),
            device_id
        );
        Ok(CompiledGraph {
            name: graph.name.clone(),
            operator_count: graph.operators.len(),
            variable_inputs,
        })
    }

    fn execute(&self, device_id: u32, compiled: &CompiledGraph, inputs: Vec<Tensor>) -> Result<Vec<Tensor>> {
        self.check_device(device_id)?;
        if !self.config.execution_delay.is_zero() {
            std::thread::sleep(self.config.execution_delay);
        }

        if let Some(missing) = compiled
            .variable_inputs
            .iter()
            .find(|name| !inputs.iter().any(|t| &t.name == *name))
        {
            return Err(EngineError::ExecuteError(format!(
                "graph '{}' input '{}' was not provided",
                compiled.name, missing
            )));
        }

        inputs
            .into_iter()
            .map(|tensor| {
                if !tensor.is_constant() {
                    return Err(EngineError::ExecuteError(format!(
                        "input '{}' carries no data",
                        tensor.name
                    )));
                }
                let owned: Arc<[u8]> = Arc::from(tensor.bytes());
                Ok(Tensor {
                    data: TensorData::Constant(Buffer::Shared(owned)),
                    ..tensor
                })
            })
            .collect()
    }
}

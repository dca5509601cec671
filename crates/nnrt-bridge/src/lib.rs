//! nnrt bridge
//!
//! This crate connects the boundary model of `nnrt-core` to any engine
//! implementing `nnrt_providers::Engine`:
//! - **marshal**: graph, operator, tensor and attribute conversion, zero-copy for tensor data
//! - **callback**: exactly-once delivery of consumer callbacks and their tokens
//! - **context**: the context lifecycle and asynchronous submission
//! - **error**: engine error translation and the boundary result-code table
//!
//! ## Example
//!
//! ```rust
//! use std::sync::{mpsc, Arc};
//! use nnrt_bridge::Bridge;
//! use nnrt_core::{DType, Format, Graph, Operator, Tensor};
//! use nnrt_providers::{ContextOptions, LocalEngine};
//!
//! let bridge = Bridge::new(Arc::new(LocalEngine::with_sample_backend()?));
//! let context = bridge.create_context("sample", 0, &ContextOptions::new())?;
//!
//! let x = Tensor::new_with_shape("x", &[4], Format::NCHW, DType::Float32)?;
//! let graph = Graph::new("g").with_operator(Operator::new("id", "Identity").with_input("X", x));
//!
//! let (tx, rx) = mpsc::channel();
//! bridge
//!     .compile_graph(&context, &graph, move |_token: (), outcome| tx.send(outcome).unwrap(), ())
//!     .map_err(|rejected| rejected.into_error())?;
//! rx.recv().unwrap()?;
//! assert!(context.is_compiled());
//!
//! bridge.destroy_context(context)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod callback;
pub mod context;
pub mod error;
pub mod marshal;

pub use callback::{Completion, CompletionSlot, ExclusiveGuard, InFlightGuard};
pub use context::{Bridge, Context, Rejected};
pub use error::{translate, BridgeError, Result, ResultCode, Stage, RESULT_CODE_TABLE_VERSION};
pub use marshal::{
    attribute_to_boundary, convert_attribute, convert_graph, convert_inputs, convert_operator,
    convert_result_tensor, convert_tensor, TensorView, TensorVec,
};

//! nnrt engine framework
//!
//! This crate is the engine side of the nnrt inference bridge:
//! - Engine-native tensor, attribute, operator and graph types
//! - The [`Engine`] service trait with its status-coded [`EngineError`]
//! - A backend registry and the loopback `sample` backend
//! - [`LocalEngine`], an in-process engine completing work on a rayon pool
//!
//! ## Example
//!
//! ```rust
//! use nnrt_providers::{ContextOptions, Engine, LocalEngine};
//!
//! let engine = LocalEngine::with_sample_backend()?;
//! assert_eq!(engine.enumerate_backends()?, ["sample"]);
//!
//! let handle = engine.create_context("sample", 0, &ContextOptions::new())?;
//! engine.destroy_context(handle)?;
//! # Ok::<(), nnrt_providers::EngineError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod graph;
pub mod local;
pub mod registry;
pub mod sample;
pub mod tensor;
pub mod types;

pub use backend::{Backend, BackendCapability, CompiledGraph};
pub use engine::{CompileCallback, ContextHandle, ContextOptions, Engine, ExecuteCallback};
pub use error::{EngineError, Result};
pub use graph::{AttrValue, Attribute, Graph, Operator};
pub use local::{LocalEngine, LocalEngineConfig};
pub use registry::BackendRegistry;
pub use sample::{SampleBackend, SampleBackendConfig, SAMPLE_BACKEND_ID};
pub use tensor::{Buffer, BufferView, Tensor, TensorData};
pub use types::{ElementType, Layout};

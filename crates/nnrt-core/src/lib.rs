//! nnrt boundary model
//!
//! This crate holds the consumer-facing side of the nnrt inference bridge:
//! the tensors, attributes, operators and graphs a caller builds before
//! handing them to an engine through `nnrt-bridge`.
//!
//! ## Example
//!
//! ```rust
//! use nnrt_core::{Attribute, Format, Graph, Operator, Tensor, DType};
//!
//! let x = Tensor::new_with_shape("x", &[1, 4], Format::NCHW, DType::Float32)?;
//! let w = Tensor::from_f32("w", &[4], Format::NCHW, &[0.5; 4])?;
//! let graph = Graph::new("tiny").with_operator(
//!     Operator::new("mul_0", "Mul")
//!         .with_input("A", x)
//!         .with_input("B", w)
//!         .with_attribute(Attribute::int("broadcast", 1)),
//! );
//! assert_eq!(graph.len(), 1);
//! # Ok::<(), nnrt_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod buffer;
/// Error types for the boundary model
pub mod error;
pub mod graph;
pub mod logging;
pub mod operator;
pub mod tensor;
pub mod types;

pub use attribute::{AttType, Attribute, AttributeRecord};
pub use buffer::{ExternalBuffer, HostBuffer};
pub use error::{CoreError, Result};
pub use graph::Graph;
pub use logging::{init_logging, LogLevel, LoggingConfig};
pub use operator::Operator;
pub use tensor::Tensor;
pub use types::{DType, Format, Shape, MAX_DIMS};

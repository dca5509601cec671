//! nnrt runtime facade
//!
//! High-level entry point over `nnrt-bridge`: read a [`Config`], load a model
//! through a [`ModelLoader`], and run inference on the resulting [`Session`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use nnrt_api::{Config, Runtime};
//! use nnrt_core::{Format, Tensor};
//!
//! # async fn demo() -> nnrt_api::Result<()> {
//! let runtime = Runtime::with_local_engine()?;
//! let config = Config::new("sample", 0).with_model_path("model.json");
//! let session = runtime.load_async(&config).await?;
//!
//! let x = Tensor::from_f32("x", &[1, 4], Format::NCHW, &[1.0, 2.0, 3.0, 4.0])?;
//! let outputs = session.run_async(&[&x]).await?;
//! println!("{} outputs", outputs.len());
//!
//! session.destroy()?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod loader;
pub mod runtime;

pub use config::Config;
pub use error::{Error, Result};
pub use loader::{JsonModelLoader, ModelLoader};
pub use runtime::{Runtime, Session};

pub use nnrt_bridge::{ResultCode, TensorVec, TensorView};

//! Runtime and sessions.
//!
//! A [`Runtime`] loads a model with a [`ModelLoader`], opens a context on the
//! configured backend and submits the graph for compilation. The resulting
//! [`Session`] runs inference until it is destroyed.

use std::fmt;
use std::sync::Arc;

use nnrt_bridge::{Bridge, Context, Rejected, TensorVec};
use nnrt_core::{Graph, Tensor};
use nnrt_providers::{ContextOptions, Engine, LocalEngine};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::{JsonModelLoader, ModelLoader};

/// Entry point for loading models.
#[derive(Clone)]
pub struct Runtime {
    bridge: Bridge,
    loader: Arc<dyn ModelLoader>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").field("bridge", &self.bridge).finish_non_exhaustive()
    }
}

impl Runtime {
    /// Runtime over `engine` using the JSON manifest loader.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            bridge: Bridge::new(engine),
            loader: Arc::new(JsonModelLoader::new()),
        }
    }

    /// Runtime over an in-process engine with the `sample` backend.
    pub fn with_local_engine() -> Result<Self> {
        let engine = LocalEngine::with_sample_backend()
            .map_err(|e| Error::Runtime(format!("engine startup failed: {}", e)))?;
        Ok(Self::new(Arc::new(engine)))
    }

    /// Replace the model loader.
    pub fn with_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// The bridge this runtime submits through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Backends available for [`Config::backend_id`], in preference order.
    pub fn candidate_backends(&self) -> Result<Vec<String>> {
        Ok(self.bridge.enumerate_backends()?)
    }

    /// Load the model named by `config` and open a context for it, without
    /// compiling.
    ///
    /// The graph is handed back for [`Session::compile`]. Callers that must
    /// publish the session before any completion can fire use this instead of
    /// [`Runtime::load`].
    pub fn open(&self, config: &Config) -> Result<(Session, Graph)> {
        let graph = self.loader.load(&config.model_path)?;
        let options: ContextOptions = config.options.clone();
        let context = self
            .bridge
            .create_context(&config.backend_id, config.device_id, &options)?;

        info!("Opened '{}' on {}:{}", graph.name(), config.backend_id, config.device_id);
        let session = Session {
            bridge: self.bridge.clone(),
            context,
            graph_name: graph.name().to_string(),
        };
        Ok((session, graph))
    }

    /// Load the model named by `config` and start compiling it.
    ///
    /// On `Ok`, `on_loaded` runs exactly once when compilation finishes and
    /// the returned session accepts [`Session::run`] after a successful
    /// outcome. On `Err`, `on_loaded` never runs and no context stays open.
    pub fn load<F>(&self, config: &Config, on_loaded: F) -> Result<Session>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let (session, graph) = self.open(config)?;
        if let Err(error) = session.compile(&graph, on_loaded) {
            if let Err(e) = session.destroy() {
                warn!("Releasing context after rejected compile failed: {}", e);
            }
            return Err(error);
        }
        Ok(session)
    }

    /// Load and wait for compilation to finish.
    ///
    /// A failed compilation closes the context before the error is returned.
    pub async fn load_async(&self, config: &Config) -> Result<Session> {
        let (tx, rx) = oneshot::channel();
        let session = self.load(config, move |outcome| {
            let _ = tx.send(outcome);
        })?;

        let outcome = rx
            .await
            .map_err(|_| Error::Runtime("compile completion was dropped".to_string()))
            .and_then(|outcome| outcome);
        match outcome {
            Ok(()) => Ok(session),
            Err(e) => {
                if let Err(close) = session.destroy() {
                    warn!("Releasing context after failed compile failed: {}", close);
                }
                Err(e)
            }
        }
    }

    /// Run inference on `session`.
    pub fn run<F>(&self, session: &Session, inputs: &[&Tensor], on_done: F) -> Result<()>
    where
        F: FnOnce(Result<TensorVec>) + Send + 'static,
    {
        session.run(inputs, on_done)
    }

    /// Close `session`.
    pub fn destroy(&self, session: Session) -> Result<()> {
        session.destroy()
    }
}

/// A loaded model bound to one context.
pub struct Session {
    bridge: Bridge,
    context: Context,
    graph_name: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("graph", &self.graph_name)
            .field("context", &self.context)
            .finish()
    }
}

impl Session {
    /// Name of the loaded graph.
    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    /// The underlying context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Whether the graph compiled successfully.
    pub fn is_ready(&self) -> bool {
        self.context.is_compiled()
    }

    /// Submit `graph` for compilation. `on_loaded` runs exactly once on `Ok`,
    /// never on `Err`.
    pub fn compile<F>(&self, graph: &Graph, on_loaded: F) -> Result<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.bridge
            .compile_graph(
                &self.context,
                graph,
                |on_loaded: F, outcome| on_loaded(outcome.map_err(Error::from)),
                on_loaded,
            )
            .map_err(|rejected: Rejected<F>| Error::from(rejected.into_error()))
    }

    /// Submit an inference. `on_done` runs exactly once on `Ok`, never on `Err`.
    pub fn run<F>(&self, inputs: &[&Tensor], on_done: F) -> Result<()>
    where
        F: FnOnce(Result<TensorVec>) + Send + 'static,
    {
        self.bridge
            .execute(
                &self.context,
                inputs,
                |on_done: F, outcome| on_done(outcome.map_err(Error::from)),
                on_done,
            )
            .map_err(|rejected: Rejected<F>| Error::from(rejected.into_error()))
    }

    /// Run and wait for the outputs.
    pub async fn run_async(&self, inputs: &[&Tensor]) -> Result<TensorVec> {
        let (tx, rx) = oneshot::channel();
        self.run(inputs, move |outcome| {
            let _ = tx.send(outcome);
        })?;
        rx.await
            .map_err(|_| Error::Runtime("execute completion was dropped".to_string()))?
    }

    /// Close the context.
    pub fn destroy(self) -> Result<()> {
        info!("Closing session for '{}'", self.graph_name);
        Ok(self.bridge.destroy_context(self.context)?)
    }
}

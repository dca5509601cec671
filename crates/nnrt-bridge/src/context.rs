//! Context lifecycle manager.
//!
//! [`Bridge`] drives an engine on behalf of boundary callers: it discovers
//! backends, opens and closes contexts, and submits compile and execute work
//! with a consumer callback that fires exactly once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use nnrt_core::{Graph, Tensor};
use nnrt_providers::{CompileCallback, ContextHandle, ContextOptions, Engine, ExecuteCallback};
use tracing::{debug, error, info, warn};

use crate::callback::{Completion, CompletionSlot, ExclusiveGuard, InFlightGuard};
use crate::error::{translate, BridgeError, Result, Stage};
use crate::marshal::{convert_graph, convert_inputs, TensorVec};

/// A submission refused synchronously. The callback was not and will not be
/// invoked; the token comes back here.
pub struct Rejected<T> {
    /// Why the submission was refused.
    pub error: BridgeError,
    /// The caller's token, returned untouched.
    pub token: T,
}

impl<T> Rejected<T> {
    /// Split into error and token.
    pub fn into_parts(self) -> (BridgeError, T) {
        (self.error, self.token)
    }

    /// Drop the token and keep the error.
    pub fn into_error(self) -> BridgeError {
        self.error
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

#[derive(Default)]
struct ContextState {
    compiled: Arc<AtomicBool>,
    compile_in_flight: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
}

/// An open execution context.
///
/// Close it with [`Bridge::destroy_context`]. A context that is simply dropped
/// is released on drop, with a warning.
pub struct Context {
    handle: Option<ContextHandle>,
    engine: Arc<dyn Engine>,
    backend_id: String,
    device_id: u32,
    options: ContextOptions,
    state: ContextState,
}

impl Context {
    /// Backend the context runs on.
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Device index.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Options the context was created with.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Whether a compilation has completed successfully.
    pub fn is_compiled(&self) -> bool {
        self.state.compiled.load(Ordering::SeqCst)
    }

    /// Submitted operations whose callback has not fired yet.
    pub fn pending_operations(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    fn handle(&self) -> Result<&ContextHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| BridgeError::InvalidArgument("context already destroyed".to_string()))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .field("compiled", &self.is_compiled())
            .field("pending", &self.pending_operations())
            .finish()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!(
                "Context {:?} dropped without destroy_context; releasing it",
                handle
            );
            if let Err(e) = self.engine.destroy_context(handle) {
                error!("Implicit context release failed: {}", e);
            }
        }
    }
}

/// Bridge between boundary callers and an engine.
#[derive(Clone)]
pub struct Bridge {
    engine: Arc<dyn Engine>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge").finish_non_exhaustive()
    }
}

impl Bridge {
    /// Bridge over `engine`.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Backends the engine can use, in its preference order. May be empty.
    pub fn enumerate_backends(&self) -> Result<Vec<String>> {
        let backends = self
            .engine
            .enumerate_backends()
            .map_err(|e| translate(e, Stage::Discovery))?;
        info!("Discovered {} backends: {:?}", backends.len(), backends);
        Ok(backends)
    }

    /// Open a context on `backend_id`, device `device_id`.
    pub fn create_context(
        &self,
        backend_id: &str,
        device_id: u32,
        options: &ContextOptions,
    ) -> Result<Context> {
        let handle = self
            .engine
            .create_context(backend_id, device_id, options)
            .map_err(|e| {
                let error = translate(e, Stage::CreateContext);
                warn!("Context creation on {}:{} failed: {}", backend_id, device_id, error);
                error
            })?;

        info!("Opened context {:?}", handle);
        Ok(Context {
            handle: Some(handle),
            engine: Arc::clone(&self.engine),
            backend_id: backend_id.to_string(),
            device_id,
            options: options.clone(),
            state: ContextState::default(),
        })
    }

    /// Close a context.
    ///
    /// The handle is released exactly once whatever the outcome. Closing a
    /// context with operations in flight reports `TeardownFailed`.
    pub fn destroy_context(&self, mut context: Context) -> Result<()> {
        let handle = context.handle.take().ok_or_else(|| {
            BridgeError::InvalidArgument("context already destroyed".to_string())
        })?;
        let pending = context.pending_operations();
        let description = format!("{:?}", handle);

        let released = context
            .engine
            .destroy_context(handle)
            .map_err(|e| translate(e, Stage::DestroyContext));

        let result = match released {
            Err(e) => Err(e),
            Ok(()) if pending > 0 => Err(BridgeError::TeardownFailed(format!(
                "{} operations still in flight",
                pending
            ))),
            Ok(()) => Ok(()),
        };
        match &result {
            Ok(()) => info!("Closed context {}", description),
            Err(e) => error!("Closing context {} failed: {}", description, e),
        }
        result
    }

    /// Submit `graph` for compilation on `context`.
    ///
    /// On `Ok`, `on_complete(token, outcome)` runs exactly once, usually on an
    /// engine thread. On `Err`, it never runs and the token is returned.
    pub fn compile_graph<T, F>(
        &self,
        context: &Context,
        graph: &Graph,
        on_complete: F,
        token: T,
    ) -> std::result::Result<(), Rejected<T>>
    where
        T: Send + 'static,
        F: FnOnce(T, Result<()>) + Send + 'static,
    {
        let handle = match context.handle() {
            Ok(handle) => handle,
            Err(error) => return Err(Rejected { error, token }),
        };
        let Some(exclusive) = ExclusiveGuard::try_acquire(&context.state.compile_in_flight) else {
            let error = BridgeError::SubmissionRejected(
                "a compilation is already in flight on this context".to_string(),
            );
            warn!("Rejected compile of '{}': {}", graph.name(), error);
            return Err(Rejected { error, token });
        };
        let converted = match convert_graph(graph) {
            Ok(converted) => converted,
            Err(error) => {
                warn!("Rejected compile of '{}': {}", graph.name(), error);
                return Err(Rejected { error, token });
            }
        };

        let slot = CompletionSlot::new(Completion::new("compile", on_complete, token));
        let engine_slot = slot.clone();
        let pending = InFlightGuard::acquire(&context.state.pending);
        let compiled = Arc::clone(&context.state.compiled);

        let callback: CompileCallback = Box::new(move |result| {
            let outcome = result.map_err(|e| translate(e, Stage::CompileCompletion));
            if outcome.is_ok() {
                compiled.store(true, Ordering::SeqCst);
            }
            drop(exclusive);
            drop(pending);
            if !engine_slot.complete(outcome) {
                warn!("Ignoring compile completion for a submission that was already settled");
            }
        });

        match self.engine.compile_graph(handle, converted, callback) {
            Ok(()) => {
                debug!("Compile of '{}' submitted on {:?}", graph.name(), handle);
                Ok(())
            }
            Err(e) => Self::settle_rejection(&slot, translate(e, Stage::CompileSubmit)),
        }
    }

    /// Execute the compiled graph of `context` with `inputs`.
    ///
    /// Same delivery contract as [`Bridge::compile_graph`]. The context must
    /// have a successfully compiled graph.
    pub fn execute<T, F>(
        &self,
        context: &Context,
        inputs: &[&Tensor],
        on_complete: F,
        token: T,
    ) -> std::result::Result<(), Rejected<T>>
    where
        T: Send + 'static,
        F: FnOnce(T, Result<TensorVec>) + Send + 'static,
    {
        let handle = match context.handle() {
            Ok(handle) => handle,
            Err(error) => return Err(Rejected { error, token }),
        };
        if !context.is_compiled() {
            let error =
                BridgeError::SubmissionRejected("context has no compiled graph".to_string());
            warn!("Rejected execution on {:?}: {}", handle, error);
            return Err(Rejected { error, token });
        }
        let converted = match convert_inputs(inputs) {
            Ok(converted) => converted,
            Err(error) => {
                warn!("Rejected execution on {:?}: {}", handle, error);
                return Err(Rejected { error, token });
            }
        };

        let slot = CompletionSlot::new(Completion::new("execute", on_complete, token));
        let engine_slot = slot.clone();
        let pending = InFlightGuard::acquire(&context.state.pending);

        let callback: ExecuteCallback = Box::new(move |result| {
            let outcome = result
                .map(TensorVec::new)
                .map_err(|e| translate(e, Stage::ExecuteCompletion));
            drop(pending);
            if !engine_slot.complete(outcome) {
                warn!("Ignoring execute completion for a submission that was already settled");
            }
        });

        match self.engine.execute(handle, converted, callback) {
            Ok(()) => {
                debug!("Execution with {} inputs submitted on {:?}", inputs.len(), handle);
                Ok(())
            }
            Err(e) => Self::settle_rejection(&slot, translate(e, Stage::ExecuteSubmit)),
        }
    }

    fn settle_rejection<T, R>(
        slot: &CompletionSlot<T, R>,
        error: BridgeError,
    ) -> std::result::Result<(), Rejected<T>> {
        match slot.reclaim() {
            Some(token) => {
                warn!("Engine rejected submission: {}", error);
                Err(Rejected { error, token })
            }
            None => {
                // The engine fired the callback before reporting failure; the
                // outcome has already been delivered.
                warn!(
                    "Engine reported '{}' after completing the submission; keeping the delivered outcome",
                    error
                );
                Ok(())
            }
        }
    }
}

//! In-process engine.
//!
//! `LocalEngine` keeps its contexts in a concurrent table and runs compile and
//! execute work on a rayon pool. Completions fire on pool threads.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::backend::{Backend, CompiledGraph};
use crate::engine::{CompileCallback, ContextHandle, ContextOptions, Engine, ExecuteCallback};
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::registry::BackendRegistry;
use crate::sample::SampleBackend;
use crate::tensor::Tensor;

/// Local engine configuration.
#[derive(Debug, Clone)]
pub struct LocalEngineConfig {
    /// Worker threads (None = number of cores minus one, at least one).
    pub thread_count: Option<usize>,
    /// Worker thread name prefix.
    pub thread_pool_name: String,
    /// Maximum simultaneously open contexts.
    pub max_contexts: usize,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            thread_count: None,
            thread_pool_name: "nnrt-engine".to_string(),
            max_contexts: 64,
        }
    }
}

impl LocalEngineConfig {
    /// Set the worker thread count.
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = Some(threads);
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_pool_name(mut self, name: impl Into<String>) -> Self {
        self.thread_pool_name = name.into();
        self
    }

    /// Set the context limit.
    pub fn with_max_contexts(mut self, max_contexts: usize) -> Self {
        self.max_contexts = max_contexts;
        self
    }
}

struct ContextState {
    backend: Arc<dyn Backend>,
    device_id: u32,
    options: ContextOptions,
    compiled: RwLock<Option<Arc<CompiledGraph>>>,
    pending: AtomicUsize,
}

impl ContextState {
    fn compiled(&self) -> Option<Arc<CompiledGraph>> {
        self.compiled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Decrements a context's pending count when dropped.
struct PendingGuard(Arc<ContextState>);

impl PendingGuard {
    fn new(state: Arc<ContextState>) -> Self {
        state.pending.fetch_add(1, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Engine running backends in-process.
pub struct LocalEngine {
    config: LocalEngineConfig,
    registry: Arc<BackendRegistry>,
    contexts: DashMap<u64, Arc<ContextState>>,
    next_context_id: AtomicU64,
    thread_pool: ThreadPool,
}

impl LocalEngine {
    /// Engine with default configuration and an empty registry.
    pub fn new() -> Result<Self> {
        Self::with_config(LocalEngineConfig::default(), Arc::new(BackendRegistry::new()))
    }

    /// Engine with the `sample` backend registered.
    pub fn with_sample_backend() -> Result<Self> {
        let engine = Self::new()?;
        engine.registry.register_backend(Arc::new(SampleBackend::new()))?;
        Ok(engine)
    }

    /// Engine over an existing registry.
    pub fn with_config(config: LocalEngineConfig, registry: Arc<BackendRegistry>) -> Result<Self> {
        let thread_count = config
            .thread_count
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1));

        let thread_pool_name = config.thread_pool_name.clone();
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(move |i| format!("{}-worker-{}", thread_pool_name, i))
            .build()
            .map_err(|e| EngineError::OutOfResource(format!("failed to create thread pool: {}", e)))?;

        info!("Created local engine with {} worker threads", thread_count);

        Ok(Self {
            config,
            registry,
            contexts: DashMap::new(),
            next_context_id: AtomicU64::new(1),
            thread_pool,
        })
    }

    /// The backend registry.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Number of open contexts.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Options a context was opened with.
    pub fn context_options(&self, handle: &ContextHandle) -> Option<ContextOptions> {
        self.contexts.get(&handle.id()).map(|s| s.options.clone())
    }

    fn state(&self, handle: &ContextHandle) -> Result<Arc<ContextState>> {
        self.contexts
            .get(&handle.id())
            .map(|s| Arc::clone(&s))
            .ok_or_else(|| EngineError::InvalidParam(format!("unknown context {:?}", handle)))
    }
}

impl Engine for LocalEngine {
    fn enumerate_backends(&self) -> Result<Vec<String>> {
        let ids = self.registry.backend_ids();
        debug!("Enumerated {} backends", ids.len());
        Ok(ids)
    }

    fn create_context(
        &self,
        backend_id: &str,
        device_id: u32,
        options: &ContextOptions,
    ) -> Result<ContextHandle> {
        let backend = self
            .registry
            .get_backend(backend_id)
            .ok_or_else(|| EngineError::BackendNotFound(backend_id.to_string()))?;

        if device_id >= backend.capability().device_count {
            return Err(EngineError::DeviceNotFound {
                backend_id: backend_id.to_string(),
                device_id,
            });
        }
        if self.contexts.len() >= self.config.max_contexts {
            return Err(EngineError::OutOfResource(format!(
                "context limit of {} reached",
                self.config.max_contexts
            )));
        }

        let id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        self.contexts.insert(
            id,
            Arc::new(ContextState {
                backend,
                device_id,
                options: options.clone(),
                compiled: RwLock::new(None),
                pending: AtomicUsize::new(0),
            }),
        );

        info!(
            "Created context #{} on {}:{} with {} options",
            id,
            backend_id,
            device_id,
            options.len()
        );
        Ok(ContextHandle::new(id, backend_id, device_id))
    }

    fn destroy_context(&self, handle: ContextHandle) -> Result<()> {
        let (_, state) = self
            .contexts
            .remove(&handle.id())
            .ok_or_else(|| EngineError::InvalidParam(format!("unknown context {:?}", handle)))?;

        let pending = state.pending.load(Ordering::SeqCst);
        if pending > 0 {
            warn!(
                "Context #{} destroyed with {} operations in flight",
                handle.id(),
                pending
            );
            return Err(EngineError::Busy(format!(
                "context #{} has {} operations in flight",
                handle.id(),
                pending
            )));
        }

        info!("Destroyed context #{}", handle.id());
        Ok(())
    }

    fn compile_graph(
        &self,
        handle: &ContextHandle,
        graph: Graph,
        on_complete: CompileCallback,
    ) -> Result<()> {
        let guard = PendingGuard::new(self.state(handle)?);
        let context_id = handle.id();

        debug!(
            "Context #{}: compile of '{}' ({} operators) submitted",
            context_id,
            graph.name,
            graph.operators.len()
        );
        self.thread_pool.spawn(move || {
            let state = Arc::clone(&guard.0);
            let result = state.backend.compile(state.device_id, &graph).map(|compiled| {
                *state.compiled.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(compiled));
            });
            debug!("Context #{}: compile finished, ok={}", context_id, result.is_ok());
            drop(guard);
            on_complete(result);
        });
        Ok(())
    }

    fn execute(
        &self,
        handle: &ContextHandle,
        inputs: Vec<Tensor>,
        on_complete: ExecuteCallback,
    ) -> Result<()> {
        let state = self.state(handle)?;
        let compiled = state.compiled().ok_or_else(|| {
            EngineError::InvalidParam(format!("context #{} has no compiled graph", handle.id()))
        })?;
        let guard = PendingGuard::new(state);
        let context_id = handle.id();

        debug!(
            "Context #{}: execution of '{}' with {} inputs submitted",
            context_id,
            compiled.name,
            inputs.len()
        );
        self.thread_pool.spawn(move || {
            let state = Arc::clone(&guard.0);
            let result = state.backend.execute(state.device_id, &compiled, inputs);
            debug!("Context #{}: execution finished, ok={}", context_id, result.is_ok());
            drop(guard);
            on_complete(result);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Operator;
    use crate::sample::SampleBackendConfig;
    use crate::tensor::Buffer;
    use crate::types::{ElementType, Layout};
    use std::sync::mpsc;
    use std::time::Duration;

    fn engine() -> LocalEngine {
        LocalEngine::with_sample_backend().unwrap()
    }

    fn identity_graph() -> Graph {
        let mut op = Operator::create("id", "Identity");
        op.add_input("X", Tensor::variable("x", vec![4], Layout::NCHW, ElementType::U8))
            .unwrap();
        let mut graph = Graph::new("identity");
        graph.add_operator(op);
        graph
    }

    fn compile(engine: &LocalEngine, handle: &ContextHandle) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        engine.compile_graph(handle, identity_graph(), Box::new(move |r| tx.send(r).unwrap()))?;
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_context_lifecycle() -> Result<()> {
        let engine = engine();
        assert_eq!(engine.enumerate_backends()?, ["sample"]);

        let mut options = ContextOptions::new();
        options.insert("key1".into(), "value1".into());
        let handle = engine.create_context("sample", 1, &options)?;
        assert_eq!(engine.context_count(), 1);
        assert_eq!(engine.context_options(&handle), Some(options));

        engine.destroy_context(handle)?;
        assert_eq!(engine.context_count(), 0);
        Ok(())
    }

    #[test]
    fn test_create_context_failures() {
        let engine = engine();
        let options = ContextOptions::new();
        assert!(matches!(
            engine.create_context("gpu", 0, &options),
            Err(EngineError::BackendNotFound(_))
        ));
        assert!(matches!(
            engine.create_context("sample", 2, &options),
            Err(EngineError::DeviceNotFound { device_id: 2, .. })
        ));
    }

    #[test]
    fn test_context_limit() -> Result<()> {
        let registry = Arc::new(BackendRegistry::new());
        registry.register_backend(Arc::new(SampleBackend::new()))?;
        let engine = LocalEngine::with_config(
            LocalEngineConfig::default().with_thread_count(1).with_max_contexts(1),
            registry,
        )?;
        let options = ContextOptions::new();
        let first = engine.create_context("sample", 0, &options)?;
        assert!(matches!(
            engine.create_context("sample", 0, &options),
            Err(EngineError::OutOfResource(_))
        ));
        engine.destroy_context(first)?;
        Ok(())
    }

    #[test]
    fn test_compile_then_execute() -> Result<()> {
        let engine = engine();
        let handle = engine.create_context("sample", 0, &ContextOptions::new())?;

        let (tx, rx) = mpsc::channel();
        let early = engine.execute(&handle, vec![], Box::new(move |r| tx.send(r.is_ok()).unwrap()));
        assert!(matches!(early, Err(EngineError::InvalidParam(_))));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        compile(&engine, &handle)?;

        let input = Tensor::constant(
            "x",
            vec![4],
            Layout::NCHW,
            ElementType::U8,
            Buffer::Shared(Arc::from(vec![1_u8, 2, 3, 4])),
        );
        let (tx, rx) = mpsc::channel();
        engine.execute(&handle, vec![input], Box::new(move |r| tx.send(r).unwrap()))?;
        let outputs = rx.recv_timeout(Duration::from_secs(5)).unwrap()?;
        assert_eq!(outputs[0].bytes(), &[1, 2, 3, 4]);

        engine.destroy_context(handle)?;
        Ok(())
    }

    #[test]
    fn test_destroy_with_work_in_flight_is_busy() -> Result<()> {
        let registry = Arc::new(BackendRegistry::new());
        registry.register_backend(Arc::new(SampleBackend::with_config(
            SampleBackendConfig::default().with_execution_delay(Duration::from_millis(300)),
        )))?;
        let engine = LocalEngine::with_config(LocalEngineConfig::default(), registry)?;
        let handle = engine.create_context("sample", 0, &ContextOptions::new())?;
        compile(&engine, &handle)?;

        let input = Tensor::constant(
            "x",
            vec![4],
            Layout::NCHW,
            ElementType::U8,
            Buffer::Shared(Arc::from(vec![0_u8; 4])),
        );
        let (tx, rx) = mpsc::channel();
        engine.execute(&handle, vec![input], Box::new(move |r| tx.send(r.is_ok()).unwrap()))?;

        assert!(matches!(engine.destroy_context(handle), Err(EngineError::Busy(_))));
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        Ok(())
    }
}

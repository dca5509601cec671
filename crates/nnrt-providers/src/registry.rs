//! Backend registry.
//!
//! Keeps the registered backends in registration order, which is the order
//! candidates are enumerated in.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::info;

use crate::backend::Backend;
use crate::error::{EngineError, Result};

/// Registry of the backends known to an engine.
pub struct BackendRegistry {
    backends: DashMap<String, Arc<dyn Backend>>,
    order: RwLock<Vec<String>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register a backend. New backends are enumerated last.
    pub fn register_backend(&self, backend: Arc<dyn Backend>) -> Result<()> {
        let backend_id = backend.backend_id().to_string();
        let capability = backend.capability();

        if self.backends.contains_key(&backend_id) {
            return Err(EngineError::InvalidParam(format!(
                "backend '{}' is already registered",
                backend_id
            )));
        }

        self.backends.insert(backend_id.clone(), backend);
        self.order
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(backend_id.clone());

        info!(
            "Registered backend '{}' with {} devices and {} supported operations",
            backend_id,
            capability.device_count,
            capability.supported_ops.len()
        );
        Ok(())
    }

    /// Remove a backend and shut it down.
    pub fn unregister_backend(&self, backend_id: &str) -> Result<()> {
        let (_, backend) = self
            .backends
            .remove(backend_id)
            .ok_or_else(|| EngineError::BackendNotFound(backend_id.to_string()))?;
        self.order
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|id| id != backend_id);

        backend.shutdown()?;
        info!("Unregistered backend '{}'", backend_id);
        Ok(())
    }

    /// Look a backend up by id.
    pub fn get_backend(&self, backend_id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(backend_id).map(|b| b.clone())
    }

    /// Registered ids in registration order.
    pub fn backend_ids(&self) -> Vec<String> {
        self.order
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

//! Runtime configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where and how to load a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Model file to load.
    #[serde(default)]
    pub model_path: PathBuf,
    /// Backend to run on.
    pub backend_id: String,
    /// Device index on that backend.
    #[serde(default)]
    pub device_id: u32,
    /// Opaque options forwarded to the backend.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Config {
    /// Configuration for `backend_id`, device `device_id`.
    pub fn new(backend_id: impl Into<String>, device_id: u32) -> Self {
        Self {
            backend_id: backend_id.into(),
            device_id,
            ..Self::default()
        }
    }

    /// Set the model path.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Add a backend option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_option(key, value);
        self
    }

    /// Add or replace a backend option.
    pub fn add_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// Value of an option, `None` when unset.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Write the configuration as pretty JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ model: {}, backend: {}, device: {}, options: {:?} }}",
            self.model_path.display(),
            self.backend_id,
            self.device_id,
            self.options
        )
    }
}

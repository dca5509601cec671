//! Model loading.
//!
//! A [`ModelLoader`] turns a model file into a boundary [`Graph`]. The shipped
//! [`JsonModelLoader`] reads a JSON manifest:
//!
//! ```json
//! {
//!   "name": "tiny",
//!   "operators": [{
//!     "name": "relu_0",
//!     "op_type": "Relu",
//!     "inputs":  [{ "tag": "X", "tensor": { "name": "x", "shape": [1, 4], "dtype": "Float32" } }],
//!     "outputs": [{ "tag": "Y", "tensor": { "name": "y", "shape": [1, 4], "dtype": "Float32" } }],
//!     "attributes": [{ "name": "alpha", "type_code": 1, "float": 0.1 }]
//!   }]
//! }
//! ```
//!
//! Constant tensors carry their bytes inline (`data`), as float values
//! (`values`), or in a raw file next to the manifest (`data_file`).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _};
use nnrt_core::{Attribute, AttributeRecord, DType, Format, Graph, Operator, Tensor};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Source of boundary graphs.
pub trait ModelLoader: Send + Sync {
    /// Load the graph stored at `path`.
    fn load(&self, path: &Path) -> Result<Graph>;
}

#[derive(Debug, Deserialize)]
struct GraphManifest {
    name: String,
    #[serde(default)]
    operators: Vec<OperatorManifest>,
}

#[derive(Debug, Deserialize)]
struct OperatorManifest {
    name: String,
    op_type: String,
    #[serde(default)]
    inputs: Vec<SlotManifest>,
    #[serde(default)]
    outputs: Vec<SlotManifest>,
    #[serde(default)]
    attributes: Vec<AttributeRecord>,
}

#[derive(Debug, Deserialize)]
struct SlotManifest {
    tag: String,
    tensor: TensorManifest,
}

#[derive(Debug, Deserialize)]
struct TensorManifest {
    name: String,
    shape: Vec<u32>,
    dtype: DType,
    #[serde(default)]
    format: Format,
    #[serde(default)]
    data: Option<Vec<u8>>,
    #[serde(default)]
    values: Option<Vec<f32>>,
    #[serde(default)]
    data_file: Option<PathBuf>,
}

impl TensorManifest {
    fn into_tensor(self, base_dir: &Path) -> anyhow::Result<Tensor> {
        let name = self.name;
        let bytes = match (self.data, self.values, self.data_file) {
            (None, None, None) => None,
            (Some(bytes), None, None) => Some(bytes),
            (None, Some(values), None) => {
                if self.dtype != DType::Float32 {
                    bail!("tensor '{}' has float values but dtype {}", name, self.dtype);
                }
                Some(values.iter().flat_map(|v| v.to_ne_bytes()).collect())
            }
            (None, None, Some(file)) => {
                let path = base_dir.join(file);
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("reading data of tensor '{}' from {}", name, path.display()))?;
                Some(bytes)
            }
            _ => bail!("tensor '{}' sets more than one of data, values and data_file", name),
        };

        let tensor = match bytes {
            Some(bytes) => Tensor::from_bytes(name.as_str(), &self.shape, self.format, self.dtype, bytes),
            None => Tensor::new_with_shape(name.as_str(), &self.shape, self.format, self.dtype),
        };
        tensor.map_err(|e| anyhow!(e))
    }
}

/// Loader for JSON graph manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl JsonModelLoader {
    /// New loader.
    pub fn new() -> Self {
        Self
    }

    /// Parse a manifest from text. `base_dir` resolves `data_file` entries.
    pub fn parse(&self, json: &str, base_dir: &Path) -> Result<Graph> {
        Self::build(json, base_dir).map_err(|e| Error::Load(format!("{:#}", e)))
    }

    fn build(json: &str, base_dir: &Path) -> anyhow::Result<Graph> {
        let manifest: GraphManifest = serde_json::from_str(json).context("parsing graph manifest")?;
        let mut graph = Graph::new(manifest.name);

        for op in manifest.operators {
            let mut operator = Operator::new(op.name.as_str(), op.op_type);
            for slot in op.inputs {
                let tensor = slot
                    .tensor
                    .into_tensor(base_dir)
                    .with_context(|| format!("input '{}' of operator '{}'", slot.tag, op.name))?;
                operator.push_input(slot.tag, tensor);
            }
            for slot in op.outputs {
                let tensor = slot
                    .tensor
                    .into_tensor(base_dir)
                    .with_context(|| format!("output '{}' of operator '{}'", slot.tag, op.name))?;
                operator.push_output(slot.tag, tensor);
            }
            for record in op.attributes {
                operator.push_attribute(Attribute::from_raw(record));
            }
            graph.add_operator(operator);
        }

        debug!("Parsed manifest for graph '{}' with {} operators", graph.name(), graph.len());
        Ok(graph)
    }
}

impl ModelLoader for JsonModelLoader {
    fn load(&self, path: &Path) -> Result<Graph> {
        if !path.is_file() {
            return Err(Error::Load(format!("model file {} does not exist", path.display())));
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let graph = self.parse(&json, base_dir)?;
        info!("Loaded model {} ({} operators)", path.display(), graph.len());
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "name": "tiny",
        "operators": [{
            "name": "scale",
            "op_type": "Mul",
            "inputs": [
                { "tag": "A", "tensor": { "name": "x", "shape": [1, 1, 2, 2], "dtype": "Float32" } },
                { "tag": "B", "tensor": { "name": "w", "shape": [4], "dtype": "Float32", "format": "NHWC",
                                          "values": [1.0, 2.0, 3.0, 4.0] } }
            ],
            "outputs": [{ "tag": "C", "tensor": { "name": "y", "shape": [1, 1, 2, 2], "dtype": "Float32" } }],
            "attributes": [
                { "name": "broadcast", "type_code": 2, "int": 1 },
                { "name": "subgraph", "type_code": 5 }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_manifest() -> Result<()> {
        let graph = JsonModelLoader::new().parse(MANIFEST, Path::new("."))?;
        assert_eq!(graph.name(), "tiny");
        let op = &graph.operators()[0];
        assert_eq!(op.op_type(), "Mul");
        assert_eq!(op.inputs().len(), 2);
        assert!(!op.inputs()[0].1.has_data());
        assert_eq!(op.inputs()[1].1.data().len(), 16);
        assert_eq!(op.inputs()[1].1.format(), Format::NHWC);
        assert_eq!(op.attribute("broadcast").map(|a| a.as_int().ok()), Some(Some(1)));
        assert_eq!(op.attribute("subgraph").map(|a| a.type_code()), Some(5));
        Ok(())
    }

    #[test]
    fn test_bad_manifests() {
        let loader = JsonModelLoader::new();
        assert!(matches!(loader.parse("not json", Path::new(".")), Err(Error::Load(_))));

        let wrong_len = r#"{"name":"g","operators":[{"name":"n","op_type":"Identity","inputs":[
            {"tag":"X","tensor":{"name":"x","shape":[2],"dtype":"Float32","data":[1,2,3]}}]}]}"#;
        let err = loader.parse(wrong_len, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("input 'X' of operator 'n'"));

        let both = r#"{"name":"g","operators":[{"name":"n","op_type":"Identity","inputs":[
            {"tag":"X","tensor":{"name":"x","shape":[1],"dtype":"Float32","data":[0,0,0,0],"values":[1.0]}}]}]}"#;
        assert!(loader.parse(both, Path::new(".")).is_err());

        let huge = r#"{"name":"g","operators":[{"name":"n","op_type":"Identity","inputs":[
            {"tag":"X","tensor":{"name":"x","shape":[4294967295,4294967295,4294967295],"dtype":"Float32","data":[0,0,0,0]}}]}]}"#;
        assert!(matches!(loader.parse(huge, Path::new(".")), Err(Error::Load(_))));

        let scalar = r#"{"name":"g","operators":[{"name":"n","op_type":"Identity","inputs":[
            {"tag":"X","tensor":{"name":"x","shape":[],"dtype":"Float32"}}]}]}"#;
        assert!(matches!(loader.parse(scalar, Path::new(".")), Err(Error::Load(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = JsonModelLoader::new()
            .load(Path::new("/nonexistent/model.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }
}

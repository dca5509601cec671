//! Integration tests for the runtime facade.
//!
//! This module tests:
//! - Loading manifests from disk and running them end to end
//! - The async adapters
//! - Load failures (missing files, unknown backends, failed compiles)
//! - Configuration files

use anyhow::Result;
use nnrt_api::{Config, Error, ResultCode, Runtime};
use nnrt_core::{DType, Format, Tensor};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

const RELU_MODEL: &str = r#"{
    "name": "relu_model",
    "operators": [{
        "name": "relu_0",
        "op_type": "Relu",
        "inputs":  [{ "tag": "X", "tensor": { "name": "data1", "shape": [1, 1, 2, 2], "dtype": "Float32" } }],
        "outputs": [{ "tag": "Y", "tensor": { "name": "out", "shape": [1, 1, 2, 2], "dtype": "Float32" } }],
        "attributes": [{ "name": "alpha", "type_code": 1, "float": 0.0 }]
    }]
}"#;

const UNSUPPORTED_MODEL: &str = r#"{
    "name": "bogus_model",
    "operators": [{ "name": "b", "op_type": "Bogus" }]
}"#;

fn write_model(dir: &TempDir, name: &str, json: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, json)?;
    Ok(path)
}

fn input() -> Result<Tensor> {
    Ok(Tensor::from_f32(
        "data1",
        &[1, 1, 2, 2],
        Format::NCHW,
        &[1.1, 2.2, 3.3, 4.4],
    )?)
}

// ============================================================================
// Callback API
// ============================================================================

#[test]
fn test_load_and_run() -> Result<()> {
    let dir = TempDir::new()?;
    let model = write_model(&dir, "relu.json", RELU_MODEL)?;
    let runtime = Runtime::with_local_engine()?;
    assert_eq!(runtime.candidate_backends()?, vec!["sample".to_string()]);

    let config = Config::new("sample", 0).with_model_path(&model);
    let (tx, rx) = mpsc::channel();
    let session = runtime.load(&config, move |outcome| tx.send(outcome).unwrap())?;
    rx.recv_timeout(WAIT)??;
    assert!(session.is_ready());
    assert_eq!(session.graph_name(), "relu_model");

    let x = input()?;
    let (tx, rx) = mpsc::channel();
    runtime.run(&session, &[&x], move |outcome| tx.send(outcome).unwrap())?;
    let outputs = rx.recv_timeout(WAIT)??;

    assert_eq!(outputs.len(), 1);
    let view = outputs.get(0).unwrap();
    assert_eq!(view.name(), "data1");
    assert_eq!(view.shape(), &[1, 1, 2, 2]);
    assert_eq!(view.data(), x.data());
    let back = view.to_tensor()?;
    assert_eq!(back.dtype(), DType::Float32);

    runtime.destroy(session)?;
    Ok(())
}

#[test]
fn test_run_before_compile_finishes_or_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let model = write_model(&dir, "bogus.json", UNSUPPORTED_MODEL)?;
    let runtime = Runtime::with_local_engine()?;
    let config = Config::new("sample", 0).with_model_path(&model);

    let (tx, rx) = mpsc::channel();
    let session = runtime.load(&config, move |outcome| tx.send(outcome).unwrap())?;
    let err = rx.recv_timeout(WAIT)?.unwrap_err();
    assert_eq!(err.code(), ResultCode::CompileFailed);
    assert!(!session.is_ready());

    let x = input()?;
    let err = session.run(&[&x], |_| panic!("rejected run must not call back")).unwrap_err();
    assert_eq!(err.code(), ResultCode::SubmissionRejected);

    session.destroy()?;
    Ok(())
}

// ============================================================================
// Async API
// ============================================================================

#[tokio::test]
async fn test_async_load_and_run() -> Result<()> {
    let dir = TempDir::new()?;
    let model = write_model(&dir, "relu.json", RELU_MODEL)?;
    let runtime = Runtime::with_local_engine()?;

    let session = runtime
        .load_async(&Config::new("sample", 1).with_model_path(&model))
        .await?;
    assert_eq!(session.context().device_id(), 1);

    let x = input()?;
    let outputs = session.run_async(&[&x]).await?;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs.get(0).unwrap().data(), x.data());

    session.destroy()?;
    Ok(())
}

#[tokio::test]
async fn test_async_failures() -> Result<()> {
    let dir = TempDir::new()?;
    let model = write_model(&dir, "bogus.json", UNSUPPORTED_MODEL)?;
    let runtime = Runtime::with_local_engine()?;

    let err = runtime
        .load_async(&Config::new("sample", 0).with_model_path(&model))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::CompileFailed);

    let relu = write_model(&dir, "relu.json", RELU_MODEL)?;
    let session = runtime
        .load_async(&Config::new("sample", 0).with_model_path(&relu))
        .await?;
    let err = session.run_async(&[]).await.unwrap_err();
    assert_eq!(err.code(), ResultCode::ExecuteFailed);
    session.destroy()?;
    Ok(())
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
fn test_missing_model_file() -> Result<()> {
    let runtime = Runtime::with_local_engine()?;
    let config = Config::new("sample", 0).with_model_path(Path::new("/does/not/exist.json"));
    let err = runtime
        .load(&config, |_| panic!("failed load must not call back"))
        .unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    Ok(())
}

#[test]
fn test_unknown_backend_and_device() -> Result<()> {
    let dir = TempDir::new()?;
    let model = write_model(&dir, "relu.json", RELU_MODEL)?;
    let runtime = Runtime::with_local_engine()?;

    let config = Config::new("gpu", 0).with_model_path(&model);
    let err = runtime.load(&config, |_| panic!("no callback")).unwrap_err();
    assert_eq!(err.code(), ResultCode::BackendNotFound);

    let config = Config::new("sample", 7).with_model_path(&model);
    let err = runtime.load(&config, |_| panic!("no callback")).unwrap_err();
    assert_eq!(err.code(), ResultCode::DeviceUnavailable);
    Ok(())
}

// ============================================================================
// Configuration files
// ============================================================================

#[test]
fn test_config_file_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    let config = Config::new("sample", 1)
        .with_model_path("model.json")
        .with_option("key1", "value1")
        .with_option("key2", "value2");

    config.to_json_file(&path)?;
    let loaded = Config::from_json_file(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.option("key2"), Some("value2"));

    let err = Config::from_json_file(dir.path().join("missing.json")).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    Ok(())
}

#[test]
fn test_external_data_file() -> Result<()> {
    let dir = TempDir::new()?;
    let weights: Vec<u8> = [0.5_f32, 1.5].iter().flat_map(|v| v.to_ne_bytes()).collect();
    std::fs::write(dir.path().join("w.bin"), &weights)?;
    let model = write_model(
        &dir,
        "add.json",
        r#"{"name": "add", "operators": [{
            "name": "add_0", "op_type": "Add",
            "inputs": [
                { "tag": "A", "tensor": { "name": "a", "shape": [2], "dtype": "Float32" } },
                { "tag": "B", "tensor": { "name": "w", "shape": [2], "dtype": "Float32", "data_file": "w.bin" } }
            ]
        }]}"#,
    )?;

    let graph = nnrt_api::JsonModelLoader::new().parse(&std::fs::read_to_string(&model)?, dir.path())?;
    assert_eq!(graph.operators()[0].inputs()[1].1.data(), weights.as_slice());
    Ok(())
}

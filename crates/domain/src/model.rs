//! Model packaging metadata: `info.json` and `config.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Execution provider requested by the model package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionProvider {
    /// Host CPU.
    Cpu,
    /// Hardware accelerator (CUDA).
    Accelerator,
}

impl ExecutionProvider {
    /// Returns true for the accelerator.
    #[must_use]
    pub const fn is_accelerator(self) -> bool {
        matches!(self, Self::Accelerator)
    }

    /// Returns the canonical string identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Accelerator => "accelerator",
        }
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Descriptive model metadata parsed from `info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Publishing group.
    pub group: String,
    /// Model name.
    pub name: String,
    /// Model version.
    pub version: String,
    /// License identifier.
    #[serde(default)]
    pub license: Option<String>,
    /// Package size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Free-form labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Quantization applied at export time.
    #[serde(default)]
    pub quantization: Option<String>,
    /// Target optimization; `cuda` selects the accelerator.
    #[serde(default)]
    pub optimization: Option<String>,
    /// ONNX opset.
    #[serde(default)]
    pub opset_version: Option<i64>,
    /// Exporter version.
    #[serde(default)]
    pub exporter_version: Option<String>,
    /// Upstream model description.
    #[serde(default)]
    pub base_model: BTreeMap<String, Value>,
    /// Library versions used at export time.
    #[serde(default)]
    pub libraries: BTreeMap<String, Value>,
    /// Python version used at export time.
    #[serde(default)]
    pub python: Option<String>,
}

impl ModelInfo {
    /// Execution provider implied by `optimization`.
    #[must_use]
    pub fn execution_provider(&self) -> ExecutionProvider {
        match self.optimization.as_deref() {
            Some("cuda") => ExecutionProvider::Accelerator,
            _ => ExecutionProvider::Cpu,
        }
    }
}

/// Architecture parameters parsed from `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory the configuration was loaded from.
    #[serde(default)]
    pub config_path: PathBuf,
    /// Output dimension, used when the network declares it symbolically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<i64>,
    /// Positional embedding capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position_embeddings: Option<usize>,
    /// Hidden size of the encoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<i64>,
    /// Every other key.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ModelConfig {
    /// Read an untyped key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

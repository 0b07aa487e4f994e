//! Model-directory file loading.
//!
//! A model directory holds `info.json`, `config.json`, `tokenizer.json`, an
//! optional `tokenizer_init.json` and one or more `<stem>.onnx` graphs. Read
//! failures surface as `config:*` errors carrying the offending path.

use onnx_transformers_domain::{ModelConfig, ModelInfo, TokenizerDescriptor};
use onnx_transformers_shared::{ErrorCode, ErrorEnvelope, Result, ResultExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Model metadata file name.
pub const INFO_FILE: &str = "info.json";
/// Architecture config file name.
pub const CONFIG_FILE: &str = "config.json";
/// Optional tokenizer init file name.
pub const TOKENIZER_INIT_FILE: &str = "tokenizer_init.json";
/// Tokenizer descriptor file name.
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Default graph stem.
pub const DEFAULT_MODEL_STEM: &str = "model";

/// Paths of a packaged model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDirectory {
    root: PathBuf,
}

impl ModelDirectory {
    /// Open a model directory. Fails when the path is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ErrorEnvelope::configuration(
                "invalid_model_dir",
                "model directory does not exist or is not a directory",
            )
            .with_metadata("path", root.to_string_lossy().to_string()));
        }
        Ok(Self { root })
    }

    /// Directory root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `info.json` path.
    #[must_use]
    pub fn info_path(&self) -> PathBuf {
        self.root.join(INFO_FILE)
    }

    /// `config.json` path.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// `tokenizer_init.json` path.
    #[must_use]
    pub fn tokenizer_init_path(&self) -> PathBuf {
        self.root.join(TOKENIZER_INIT_FILE)
    }

    /// `tokenizer.json` path.
    #[must_use]
    pub fn tokenizer_path(&self) -> PathBuf {
        self.root.join(TOKENIZER_FILE)
    }

    /// `<stem>.onnx` path.
    #[must_use]
    pub fn model_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.onnx"))
    }

    /// Load `info.json`.
    pub fn load_info(&self) -> Result<ModelInfo> {
        load_model_info(&self.info_path())
    }

    /// Load `config.json`, recording the directory it came from.
    pub fn load_config(&self) -> Result<ModelConfig> {
        let mut config: ModelConfig = read_json_file(&self.config_path())?;
        config.config_path.clone_from(&self.root);
        Ok(config)
    }

    /// Load `tokenizer.json` as a special-token descriptor.
    pub fn load_tokenizer_descriptor(&self) -> Result<TokenizerDescriptor> {
        read_json_file(&self.tokenizer_path())
    }

    /// Load `tokenizer_init.json` when present.
    pub fn load_tokenizer_init(&self) -> Result<Option<Value>> {
        let path = self.tokenizer_init_path();
        if !path.is_file() {
            return Ok(None);
        }
        read_json_file(&path).map(Some)
    }
}

/// Load `info.json` from an explicit path.
pub fn load_model_info(path: &Path) -> Result<ModelInfo> {
    read_json_file(path)
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_model_file(path)?;
    serde_json::from_str(&text).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::configuration("invalid_json"),
            format!("invalid JSON in model file: {error}"),
        )
        .with_metadata("path", path.to_string_lossy().to_string())
    })
}

pub(crate) fn read_model_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(ErrorEnvelope::from)
        .with_error_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> std::io::Result<()> {
        fs::write(dir.join(name), contents)
    }

    #[test]
    fn open_rejects_missing_directory() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let error = ModelDirectory::open(dir.path().join("absent")).err();

        assert!(error.is_some_and(|error| {
            error.is_configuration_error() && error.code.code() == "invalid_model_dir"
        }));
        Ok(())
    }

    #[test]
    fn missing_info_is_a_configuration_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let model_dir = ModelDirectory::open(dir.path())?;
        let error = model_dir.load_info().err();

        assert!(error.is_some_and(|error| {
            error.code == ErrorCode::configuration("missing_file")
                && error.metadata.contains_key("path")
        }));
        Ok(())
    }

    #[test]
    fn malformed_config_is_a_configuration_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), CONFIG_FILE, "{ not json")?;
        let model_dir = ModelDirectory::open(dir.path())?;

        let error = model_dir.load_config().err();
        assert!(error.is_some_and(|error| error.code == ErrorCode::configuration("invalid_json")));
        Ok(())
    }

    #[test]
    fn config_records_its_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), CONFIG_FILE, r#"{"dim": 384, "model_type": "bert"}"#)?;
        let model_dir = ModelDirectory::open(dir.path())?;

        let config = model_dir.load_config()?;
        assert_eq!(config.config_path, dir.path());
        assert_eq!(config.dim, Some(384));
        Ok(())
    }

    #[test]
    fn tokenizer_init_is_optional() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let model_dir = ModelDirectory::open(dir.path())?;
        assert_eq!(model_dir.load_tokenizer_init()?, None);
        assert_eq!(model_dir.model_path("model"), dir.path().join("model.onnx"));
        Ok(())
    }
}

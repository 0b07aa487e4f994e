//! # onnx-transformers-facade
//!
//! Load a packaged model directory and call it with text.
//! This crate depends on `adapters`, `app` and `config`.
//!
//! ```no_run
//! use onnx_transformers_facade::{ModelForEncoding, TextInput};
//!
//! # fn main() -> onnx_transformers_facade::Result<()> {
//! let model = ModelForEncoding::from_dir("models/minilm")?;
//! let embedding = model.call(&TextInput::from("hello world"), None)?;
//! # let _ = embedding;
//! # Ok(())
//! # }
//! ```

use onnx_transformers_adapters::{HfTokenizer, OrtSession};
use onnx_transformers_app::{CrossEncoder, EncodedInputs, Encoder, ModelMetadata, ModelRuntime};
use onnx_transformers_config::{DEFAULT_MODEL_STEM, ModelDirectory, build_default_encoding_config};
use onnx_transformers_ports::{FastTokenizerPort, InferenceSessionPort};
use std::path::Path;
use std::sync::Arc;

pub use onnx_transformers_app::ModelOutput;
pub use onnx_transformers_domain::{
    EncodingConfig, ExecutionProvider, ModelInfo, NamedTensors, NetworkInfo, Tensor, TextInput,
};
pub use onnx_transformers_shared::{ErrorEnvelope, ErrorKind, Result};

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Assemble a runtime from a model directory and already-built backends.
///
/// Reads `info.json`, `config.json`, `tokenizer.json` and the optional
/// `tokenizer_init.json`.
pub fn load_runtime_with(
    directory: &ModelDirectory,
    session: Arc<dyn InferenceSessionPort>,
    tokenizer: Arc<dyn FastTokenizerPort>,
) -> Result<ModelRuntime> {
    let info = directory.load_info()?;
    let config = directory.load_config()?;
    let encoding_config = build_default_encoding_config(directory)?;
    let descriptor = directory.load_tokenizer_descriptor()?;

    tracing::info!(
        model = %info.name,
        version = %info.version,
        provider = %session.execution_provider(),
        "model loaded"
    );

    Ok(ModelRuntime::new(
        session,
        tokenizer,
        descriptor,
        ModelMetadata {
            info,
            config,
            encoding_config,
        },
    ))
}

/// Load `<stem>.onnx` and `tokenizer.json` from a model directory.
///
/// The accelerator is requested when `info.json` declares a CUDA build.
pub fn load_runtime(dir: &Path, stem: &str) -> Result<ModelRuntime> {
    let directory = ModelDirectory::open(dir)?;
    let requested = directory.load_info()?.execution_provider();
    let session = OrtSession::load(&directory.model_path(stem), requested)?;
    let tokenizer = HfTokenizer::from_file(&directory.tokenizer_path())?;
    load_runtime_with(&directory, Arc::new(session), Arc::new(tokenizer))
}

/// A model producing embeddings or raw outputs.
#[derive(Debug, Clone)]
pub struct ModelForEncoding {
    encoder: Encoder,
}

impl ModelForEncoding {
    /// Load `model.onnx` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_dir_with_stem(dir, DEFAULT_MODEL_STEM)
    }

    /// Load `<stem>.onnx` from `dir`.
    pub fn from_dir_with_stem(dir: impl AsRef<Path>, stem: &str) -> Result<Self> {
        load_runtime(dir.as_ref(), stem).map(Self::from_runtime)
    }

    /// Wrap an assembled runtime.
    #[must_use]
    pub const fn from_runtime(runtime: ModelRuntime) -> Self {
        Self {
            encoder: Encoder::new(runtime),
        }
    }

    /// Encode, run and shape.
    pub fn call(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<ModelOutput> {
        self.encoder.call(input, override_config)
    }

    /// Model-input tensors for `input`, without running the model.
    pub fn encode(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<EncodedInputs> {
        self.encoder.encode(input, override_config)
    }

    /// Embedding width.
    pub fn output_dim(&self) -> Result<i64> {
        self.encoder.output_dim()
    }

    /// Declared inputs and outputs.
    #[must_use]
    pub const fn network_info(&self) -> &NetworkInfo {
        self.encoder.network_info()
    }

    /// `info.json`.
    #[must_use]
    pub const fn model_info(&self) -> &ModelInfo {
        self.encoder.model_info()
    }

    /// Model-level encoding config.
    #[must_use]
    pub const fn encoding_config(&self) -> &EncodingConfig {
        self.encoder.encoding_config()
    }
}

/// A model scoring sequence pairs.
#[derive(Debug, Clone)]
pub struct ModelForCrossEncoding {
    cross_encoder: CrossEncoder,
}

impl ModelForCrossEncoding {
    /// Load `model.onnx` from `dir`. With `use_sigmoid` scores are
    /// probabilities.
    pub fn from_dir(dir: impl AsRef<Path>, use_sigmoid: bool) -> Result<Self> {
        let runtime = load_runtime(dir.as_ref(), DEFAULT_MODEL_STEM)?;
        Ok(Self::from_runtime(runtime, use_sigmoid))
    }

    /// Wrap an assembled runtime.
    #[must_use]
    pub const fn from_runtime(runtime: ModelRuntime, use_sigmoid: bool) -> Self {
        Self {
            cross_encoder: CrossEncoder::new(runtime, use_sigmoid),
        }
    }

    /// Score the input.
    pub fn call(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<Tensor> {
        self.cross_encoder.call(input, override_config)
    }

    /// `info.json`.
    #[must_use]
    pub const fn model_info(&self) -> &ModelInfo {
        self.cross_encoder.encoder().model_info()
    }

    /// Returns true when logits are mapped to probabilities.
    #[must_use]
    pub const fn uses_sigmoid(&self) -> bool {
        self.cross_encoder.uses_sigmoid()
    }
}

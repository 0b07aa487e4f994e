//! # onnx-transformers-app
//!
//! Text-to-tensor encoding, inference execution and output shaping.
//! This crate depends on `ports`, `domain`, `config` and `shared`.

pub mod descriptor;
pub mod encoder;
pub mod execution;
pub mod shaping;
pub mod tokenization;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use descriptor::{
    input_signature, model_sequence_cap, network_info, output_dim, output_signature,
};
pub use encoder::{CrossEncoder, Encoder, ModelMetadata, ModelRuntime};
pub use execution::{ExecutionPath, InferenceExecutor};
pub use shaping::{ModelOutput, shape_outputs, sigmoid};
pub use tokenization::{EncodedInputs, InputKind, TokenizerAdapter};

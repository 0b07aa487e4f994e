//! # onnx-transformers-ports
//!
//! Port traits for the onnx-transformers hexagonal architecture.
//!
//! This crate defines the interfaces between the application layer and the
//! inference engine and tokenizer adapters. It depends only on `domain` and
//! `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod session;
pub mod tokenizer;

pub use session::*;
pub use tokenizer::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `onnx-transformers-domain`.
pub use onnx_transformers_domain::{
    Dimension, ElementType, ExecutionProvider, NamedTensors, Tensor, TensorData, TensorSpec,
};

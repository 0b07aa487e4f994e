//! # onnx-transformers-adapters
//!
//! Engine-backed implementations of the session and tokenizer ports.
//! This crate depends on `ports`, `domain` and `shared`.

/// ONNX Runtime session adapter.
#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "onnx")]
pub mod tokenizer;

#[cfg(feature = "onnx")]
pub use onnx::OrtSession;
#[cfg(feature = "onnx")]
pub use tokenizer::HfTokenizer;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

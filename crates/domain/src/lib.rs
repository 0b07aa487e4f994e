//! # onnx-transformers-domain
//!
//! Domain model for running packaged transformer models.
//!
//! - **Special tokens** - `TokenizerDescriptor`, `SpecialToken`, role resolution
//! - **Encoding** - `EncodingConfig` and its strategy enums
//! - **Network** - `Dimension`, `ElementType`, `TensorSpec`, `ModelIo`, `NetworkInfo`
//! - **Model** - `ModelInfo`, `ModelConfig`, `ExecutionProvider`
//! - **Input** - `TextInput`
//! - **Tensor** - `Tensor`, `TensorData`, `NamedTensors`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use onnx_transformers_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod encoding;
pub mod input;
pub mod model;
pub mod network;
pub mod special_tokens;
pub mod tensor;

pub use encoding::{
    DEFAULT_OUTPUT_NAME, Direction, EncodingConfig, PaddingStrategy, ParseEnumError,
    TruncationStrategy,
};
pub use input::TextInput;
pub use model::{ExecutionProvider, ModelConfig, ModelInfo};
pub use network::{Dimension, ElementType, ModelIo, NetworkInfo, TensorSpec};
pub use special_tokens::{
    AddedToken, SpecialToken, SpecialTokenRole, SpecialTokens, TokenEntry, TokenizerDescriptor,
    resolve, resolve_with_aliases,
};
pub use tensor::{NamedTensors, Tensor, TensorData, TensorError};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}

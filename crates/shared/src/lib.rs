//! # onnx-transformers-shared
//!
//! Result types and error handling shared by every crate of the
//! onnx-transformers workspace.
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **One error type** - Every layer returns [`ErrorEnvelope`]
//! 3. **Serde-compatible** - All public types support serialization

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod result;

pub use errors::{
    CONFIG_NAMESPACE, ENCODING_NAMESPACE, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata,
    INFERENCE_NAMESPACE,
};
pub use result::{Result, ResultExt};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::errors::{ErrorEnvelope, ErrorKind};
    use super::result::Result;

    #[test]
    fn shared_error_types_are_available() {
        let error = ErrorEnvelope::encoding("ragged_batch", "rows differ");
        assert_eq!(error.kind, ErrorKind::Expected);
        assert!(error.is_encoding_error());
    }

    #[test]
    fn shared_result_type_is_available() {
        let value: Result<i32> = Ok(5);
        assert!(matches!(value.map(|value| value + 1), Ok(6)));
    }
}

//! Error envelope types and helpers.
//!
//! Every failure in the workspace travels as an [`ErrorEnvelope`]. The stable
//! [`ErrorCode`] namespace carries the taxonomy callers match on:
//!
//! | namespace   | meaning                                                     |
//! |-------------|-------------------------------------------------------------|
//! | `config`    | missing/malformed model files, unresolvable output shape    |
//! | `encoding`  | inconsistent encoding config, unsupported input shape       |
//! | `inference` | the engine rejected the inputs or execution failed          |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, io};

/// Metadata attached to errors for diagnostics.
pub type ErrorMetadata = BTreeMap<String, String>;

/// Namespace for configuration errors.
pub const CONFIG_NAMESPACE: &str = "config";
/// Namespace for encoding errors.
pub const ENCODING_NAMESPACE: &str = "encoding";
/// Namespace for inference errors.
pub const INFERENCE_NAMESPACE: &str = "inference";

/// High-level classification of error origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Expected failures (validation, user input, model packaging).
    Expected,
    /// Unexpected failures in the external engine.
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected => formatter.write_str("expected"),
            Self::Unexpected => formatter.write_str("unexpected"),
        }
    }
}

/// Stable error code with namespace and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode {
    namespace: String,
    code: String,
}

impl ErrorCode {
    /// Create a new error code with a namespace and code.
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code: code.into(),
        }
    }

    /// Configuration error code (`config:<code>`).
    pub fn configuration(code: impl Into<String>) -> Self {
        Self::new(CONFIG_NAMESPACE, code)
    }

    /// Encoding error code (`encoding:<code>`).
    pub fn encoding(code: impl Into<String>) -> Self {
        Self::new(ENCODING_NAMESPACE, code)
    }

    /// Input shape incompatible with the requested truncation strategy.
    pub fn unsupported_input() -> Self {
        Self::new(ENCODING_NAMESPACE, "unsupported_input")
    }

    /// Inference error code (`inference:<code>`).
    pub fn inference(code: impl Into<String>) -> Self {
        Self::new(INFERENCE_NAMESPACE, code)
    }

    /// Returns the namespace portion.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the code identifier.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.namespace, self.code)
    }
}

/// Structured error envelope shared across crates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error kind describing the origin category.
    pub kind: ErrorKind,
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Additional diagnostic metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ErrorMetadata,
}

impl ErrorEnvelope {
    /// Create an expected error.
    pub fn expected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Expected, code, message)
    }

    /// Create an unexpected error.
    pub fn unexpected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Unexpected, code, message)
    }

    fn with_kind(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Missing or malformed model files, unresolvable output dimension.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        Self::expected(ErrorCode::configuration(code), message)
    }

    /// Inconsistent encoding configuration.
    pub fn encoding(code: &str, message: impl Into<String>) -> Self {
        Self::expected(ErrorCode::encoding(code), message)
    }

    /// Input shape incompatible with the configured truncation strategy.
    pub fn unsupported_input(message: impl Into<String>) -> Self {
        Self::expected(ErrorCode::unsupported_input(), message)
    }

    /// The execution engine rejected the inputs or failed while running.
    pub fn inference(code: &str, message: impl Into<String>) -> Self {
        Self::unexpected(ErrorCode::inference(code), message)
    }

    /// Returns true for `config:*` errors.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        self.code.namespace() == CONFIG_NAMESPACE
    }

    /// Returns true for `encoding:*` errors, including unsupported input.
    #[must_use]
    pub fn is_encoding_error(&self) -> bool {
        self.code.namespace() == ENCODING_NAMESPACE
    }

    /// Returns true when the input shape was rejected by the truncation strategy.
    #[must_use]
    pub fn is_unsupported_input(&self) -> bool {
        self.code == ErrorCode::unsupported_input()
    }

    /// Returns true for `inference:*` errors.
    #[must_use]
    pub fn is_inference_error(&self) -> bool {
        self.code.namespace() == INFERENCE_NAMESPACE
    }

    /// Attach a single metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}: {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

/// File-system failures while reading model packaging are configuration
/// errors: `missing_file`, `file_permission_denied`, or `file_io`.
impl From<io::Error> for ErrorEnvelope {
    fn from(error: io::Error) -> Self {
        let code = match error.kind() {
            io::ErrorKind::NotFound => "missing_file",
            io::ErrorKind::PermissionDenied => "file_permission_denied",
            _ => "file_io",
        };
        Self::configuration(code, error.to_string())
    }
}

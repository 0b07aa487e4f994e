use onnx_transformers_facade::{ErrorEnvelope, ErrorKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    InvalidInput = 2,
    Internal = 1,
}

impl ExitCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Expected failures (bad model packaging, bad encoding config, bad
    /// input) map to `InvalidInput`; engine and internal failures to
    /// `Internal`.
    #[must_use]
    pub const fn for_envelope(error: &ErrorEnvelope) -> Self {
        match error.kind {
            ErrorKind::Expected => Self::InvalidInput,
            ErrorKind::Unexpected => Self::Internal,
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    InvalidInput(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Logging(String),
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Io(_) | Self::Serialization(_) | Self::Logging(_) => ExitCode::Internal,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(formatter, "invalid input: {message}"),
            Self::Io(error) => write!(formatter, "io error: {error}"),
            Self::Serialization(error) => write!(formatter, "serialization error: {error}"),
            Self::Logging(message) => write!(formatter, "logging setup failed: {message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_envelopes_are_invalid_input() {
        let error = ErrorEnvelope::configuration("missing_file", "info.json not found");
        assert_eq!(ExitCode::for_envelope(&error), ExitCode::InvalidInput);
        assert_eq!(ExitCode::for_envelope(&error).as_u8(), 2);
    }

    #[test]
    fn inference_envelopes_are_internal() {
        let error = ErrorEnvelope::inference("run_failed", "engine failed");
        assert_eq!(ExitCode::for_envelope(&error), ExitCode::Internal);
        assert_eq!(ExitCode::for_envelope(&error).as_u8(), 1);
    }
}

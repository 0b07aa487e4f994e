//! Test fixtures for shared error codes and envelopes.

use onnx_transformers_shared::ErrorEnvelope;

/// A configuration error fixture.
pub fn configuration_error() -> ErrorEnvelope {
    ErrorEnvelope::configuration("missing_file", "model file is missing")
}

/// An unsupported input error fixture.
pub fn unsupported_input_error() -> ErrorEnvelope {
    ErrorEnvelope::unsupported_input("input shape is not supported")
}

/// An inference error fixture.
pub fn inference_error() -> ErrorEnvelope {
    ErrorEnvelope::inference("run_failed", "session run failed")
}

//! Integration tests for shared error propagation.

use onnx_transformers_shared::{ErrorCode, ErrorEnvelope, ErrorKind};
use onnx_transformers_testkit::errors::{configuration_error, inference_error};

#[test]
fn error_envelope_crosses_crates() {
    let error = inference_error();
    assert_eq!(error.code, ErrorCode::inference("run_failed"));

    let boxed: Box<dyn std::error::Error> = Box::new(error);
    assert!(boxed.to_string().contains("session run failed"));

    assert!(configuration_error().is_configuration_error());
}

#[test]
fn io_failures_surface_as_configuration_errors() {
    let envelope = ErrorEnvelope::from(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "tokenizer.json",
    ));
    assert_eq!(envelope.code, ErrorCode::configuration("missing_file"));
    assert_eq!(envelope.kind, ErrorKind::Expected);
}

#[test]
fn taxonomy_predicates_are_disjoint() {
    let unsupported = ErrorEnvelope::unsupported_input("pairs required");
    assert!(unsupported.is_unsupported_input());
    assert!(unsupported.is_encoding_error());
    assert!(!unsupported.is_configuration_error());
    assert!(!unsupported.is_inference_error());

    let inference = inference_error();
    assert_eq!(inference.kind, ErrorKind::Unexpected);
    assert!(!inference.is_encoding_error());
}

//! # onnx-transformers-testkit
//!
//! Test helpers and in-memory adapters.
//! This crate depends on `ports`, `domain` and `shared`.

pub mod errors;
pub mod fixtures;
pub mod in_memory;

pub use fixtures::ModelDirFixture;
pub use in_memory::{
    CLS_ID, FIRST_WORD_ID, InMemorySession, MASK_ID, PAD_ID, RecordedRun, Responder, RunKind,
    SEP_ID, UNK_ID, WhitespaceTokenizer,
};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_ports::ports_crate_version;
    use onnx_transformers_shared::shared_crate_version;

    #[test]
    fn testkit_crate_compiles() {
        let version = testkit_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn error_fixtures_are_available() {
        assert!(errors::configuration_error().is_configuration_error());
        assert!(errors::unsupported_input_error().is_unsupported_input());
        assert!(errors::inference_error().is_inference_error());
    }

    #[test]
    fn model_dir_fixture_writes_required_files() {
        let fixture = ModelDirFixture::new().unwrap();
        for name in ["info.json", "config.json", "tokenizer.json"] {
            assert!(fixture.path().join(name).is_file(), "missing {name}");
        }
    }
}

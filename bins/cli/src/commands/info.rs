//! Info command handler.

use crate::CliOutput;
use crate::error::CliError;
use crate::format::{error_output, ok_output};
use onnx_transformers_facade::{ModelForEncoding, facade_crate_version};
use std::path::Path;

/// Describe a model directory: metadata, network signature and encoding
/// defaults.
pub fn run_info(model_dir: &Path) -> Result<CliOutput, CliError> {
    let model = match ModelForEncoding::from_dir(model_dir) {
        Ok(model) => model,
        Err(error) => return Ok(error_output(&error)),
    };

    ok_output(&serde_json::json!({
        "status": "ok",
        "facadeVersion": facade_crate_version(),
        "model": model.model_info(),
        "network": model.network_info(),
        "encodingConfig": model.encoding_config(),
    }))
}

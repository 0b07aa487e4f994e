//! Cross-encode command handler.

use super::encode::pair_input;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{error_output, ok_output};
use onnx_transformers_facade::ModelForCrossEncoding;
use std::path::Path;

/// Score one or more sequence pairs. `logits` skips the sigmoid.
pub fn run_cross_encode(
    model_dir: &Path,
    pair: &[String],
    logits: bool,
) -> Result<CliOutput, CliError> {
    let input = pair_input(pair)?;

    let scores = ModelForCrossEncoding::from_dir(model_dir, !logits)
        .and_then(|model| model.call(&input, None));
    match scores {
        Ok(scores) => ok_output(&serde_json::json!({
            "status": "ok",
            "sigmoid": !logits,
            "scores": scores,
        })),
        Err(error) => Ok(error_output(&error)),
    }
}

//! Encode and output-dim command handlers.

use crate::CliOutput;
use crate::error::CliError;
use crate::format::{error_output, ok_output};
use onnx_transformers_config::load_encoding_config_file;
use onnx_transformers_facade::{ModelForEncoding, TextInput};
use std::path::Path;

/// Inputs for `otx encode`.
#[derive(Debug)]
pub struct EncodeCommandInput<'a> {
    pub model_dir: &'a Path,
    pub model_stem: &'a str,
    pub texts: &'a [String],
    pub pair: Option<&'a [String]>,
    pub config: Option<&'a Path>,
}

/// Run a model over text and print its shaped outputs.
pub fn run_encode(input: &EncodeCommandInput<'_>) -> Result<CliOutput, CliError> {
    let text_input = text_input(input.texts, input.pair)?;
    let override_config = match input.config.map(load_encoding_config_file) {
        Some(Ok(config)) => Some(config),
        Some(Err(error)) => return Ok(error_output(&error)),
        None => None,
    };

    let output = ModelForEncoding::from_dir_with_stem(input.model_dir, input.model_stem)
        .and_then(|model| model.call(&text_input, override_config.as_ref()));
    match output {
        Ok(output) => ok_output(&serde_json::json!({
            "status": "ok",
            "output": output,
        })),
        Err(error) => Ok(error_output(&error)),
    }
}

/// Print the embedding width of a model.
pub fn run_output_dim(model_dir: &Path, model_stem: &str) -> Result<CliOutput, CliError> {
    let dim = ModelForEncoding::from_dir_with_stem(model_dir, model_stem)
        .and_then(|model| model.output_dim());
    match dim {
        Ok(dim) => ok_output(&serde_json::json!({
            "status": "ok",
            "outputDim": dim,
        })),
        Err(error) => Ok(error_output(&error)),
    }
}

/// One text is a single input, several a batch, `--pair` a sequence pair.
fn text_input(texts: &[String], pair: Option<&[String]>) -> Result<TextInput, CliError> {
    match (texts, pair) {
        ([], Some(values)) => pair_input(values),
        ([single], None) => Ok(TextInput::Single(single.clone())),
        ([], None) => Err(CliError::InvalidInput(
            "expected --text or --pair".to_string(),
        )),
        (texts, None) => Ok(TextInput::Batch(texts.to_vec())),
        (_, Some(_)) => Err(CliError::InvalidInput(
            "--pair excludes --text".to_string(),
        )),
    }
}

/// Values of one or more `--pair` flags. One pair is a single input,
/// several a batch of pairs.
pub(crate) fn pair_input(values: &[String]) -> Result<TextInput, CliError> {
    match values {
        [first, second] => Ok(TextInput::Pair(first.clone(), second.clone())),
        [] => Err(CliError::InvalidInput("--pair needs two texts".to_string())),
        values if values.len() % 2 == 0 => Ok(TextInput::BatchOfPairs(
            values
                .chunks_exact(2)
                .filter_map(|chunk| match chunk {
                    [first, second] => Some((first.clone(), second.clone())),
                    _ => None,
                })
                .collect(),
        )),
        _ => Err(CliError::InvalidInput(
            "every --pair takes exactly two texts".to_string(),
        )),
    }
}

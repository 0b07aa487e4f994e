//! Schema command handler.

use crate::CliOutput;
use crate::error::CliError;
use crate::format::ok_output;
use onnx_transformers_config::encoding_config_schema;

/// Print the JSON schema of encoding override files.
pub fn run_schema() -> Result<CliOutput, CliError> {
    ok_output(&encoding_config_schema())
}

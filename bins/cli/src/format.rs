//! Output and log format helpers for CLI commands.

use crate::error::{CliError, ExitCode};
use crate::CliOutput;
use clap::{Args, ValueEnum};
use onnx_transformers_facade::ErrorEnvelope;
use serde::Serialize;

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-friendly lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging-related CLI flags.
#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log line format. Filter with `RUST_LOG`.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Pretty JSON with a trailing newline.
pub fn to_json_line<T: Serialize + ?Sized>(payload: &T) -> Result<String, CliError> {
    let mut output = serde_json::to_string_pretty(payload)?;
    output.push('\n');
    Ok(output)
}

/// Successful command output.
pub fn ok_output<T: Serialize + ?Sized>(payload: &T) -> Result<CliOutput, CliError> {
    Ok(CliOutput {
        stdout: to_json_line(payload)?,
        exit_code: ExitCode::Ok,
    })
}

/// Failed command output carrying the envelope.
pub fn error_output(error: &ErrorEnvelope) -> CliOutput {
    tracing::warn!(code = %error.code, kind = %error.kind, "command failed");
    let payload = serde_json::json!({
        "status": "error",
        "error": error,
    });

    // This is a CLI boundary, so JSON serialization errors are internal.
    let stdout = to_json_line(&payload).unwrap_or_else(|_| {
        "{\"status\":\"error\",\"error\":{\"message\":\"internal error\"}}\n".to_string()
    });

    CliOutput {
        stdout,
        exit_code: ExitCode::for_envelope(error),
    }
}

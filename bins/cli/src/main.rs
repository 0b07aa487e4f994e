//! CLI binary entrypoint.

mod commands;
mod error;
mod format;
mod logging;

use clap::{Parser, Subcommand};
use commands::{
    EncodeCommandInput, run_cross_encode, run_encode, run_info, run_output_dim, run_schema,
};
use error::{CliError, ExitCode};
use format::LogArgs;
use onnx_transformers_config::DEFAULT_MODEL_STEM;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(
    name = "otx",
    version,
    about = "Run packaged ONNX transformer models",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    logging: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show model metadata, network signature and encoding defaults.
    Info {
        /// Model directory (`info.json`, `config.json`, `tokenizer.json`, `model.onnx`).
        #[arg(long)]
        model_dir: PathBuf,
    },
    /// Print the embedding width of a model.
    OutputDim {
        /// Model directory.
        #[arg(long)]
        model_dir: PathBuf,
        /// Graph file stem inside the model directory.
        #[arg(long, default_value = DEFAULT_MODEL_STEM)]
        model_stem: String,
    },
    /// Encode text and print the model outputs.
    Encode {
        /// Model directory.
        #[arg(long)]
        model_dir: PathBuf,
        /// Graph file stem inside the model directory.
        #[arg(long, default_value = DEFAULT_MODEL_STEM)]
        model_stem: String,
        /// Input text. Repeat for a batch.
        #[arg(long = "text")]
        texts: Vec<String>,
        /// Encode a sequence pair instead. Repeat for a batch of pairs.
        #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"], conflicts_with = "texts")]
        pair: Option<Vec<String>>,
        /// Encoding override file (JSON or TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Score a sequence pair with a cross-encoder.
    CrossEncode {
        /// Model directory.
        #[arg(long)]
        model_dir: PathBuf,
        /// Query and document. Repeat to score a batch of pairs.
        #[arg(long, num_args = 2, value_names = ["QUERY", "DOCUMENT"], required = true)]
        pair: Vec<String>,
        /// Print raw logits instead of probabilities.
        #[arg(long)]
        logits: bool,
    },
    /// Print the JSON schema of encoding override files.
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Info { .. } => "info",
            Self::OutputDim { .. } => "output-dim",
            Self::Encode { .. } => "encode",
            Self::CrossEncode { .. } => "cross-encode",
            Self::Schema => "schema",
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    if let Err(error) = logging::init_logging(cli.logging.log_format) {
        return exit_with_error(&error);
    }

    let command = cli.command.name();
    let started = Instant::now();
    tracing::debug!(command, "command started");
    let result = run(&cli.command);
    if let Ok(output) = &result {
        tracing::info!(
            command,
            exit_code = output.exit_code.as_u8(),
            elapsed_ms = started.elapsed().as_millis(),
            "command finished"
        );
    }

    match result {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands) -> Result<CliOutput, CliError> {
    match command {
        Commands::Info { model_dir } => run_info(model_dir),
        Commands::OutputDim {
            model_dir,
            model_stem,
        } => run_output_dim(model_dir, model_stem),
        Commands::Encode {
            model_dir,
            model_stem,
            texts,
            pair,
            config,
        } => run_encode(&EncodeCommandInput {
            model_dir,
            model_stem,
            texts,
            pair: pair.as_deref(),
            config: config.as_deref(),
        }),
        Commands::CrossEncode {
            model_dir,
            pair,
            logits,
        } => run_cross_encode(model_dir, pair, *logits),
        Commands::Schema => run_schema(),
    }
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pair_takes_two_values() {
        let parsed = Cli::try_parse_from([
            "otx",
            "cross-encode",
            "--model-dir",
            "m",
            "--pair",
            "what is rust",
            "a language",
        ]);
        assert!(matches!(
            parsed.map(|cli| cli.command),
            Ok(Commands::CrossEncode { pair, logits: false, .. }) if pair.len() == 2
        ));
    }

    #[test]
    fn pair_repeats_into_one_flat_list() {
        let parsed = Cli::try_parse_from([
            "otx", "encode", "--model-dir", "m", "--pair", "a", "b", "--pair", "c", "d",
        ]);
        assert!(matches!(
            parsed.map(|cli| cli.command),
            Ok(Commands::Encode { pair: Some(pair), .. }) if pair.len() == 4
        ));
    }

    #[test]
    fn log_format_is_global() {
        let parsed = Cli::try_parse_from(["otx", "schema", "--log-format", "json"]);
        assert!(matches!(
            parsed.map(|cli| cli.logging.log_format),
            Ok(format::LogFormat::Json)
        ));
    }
}

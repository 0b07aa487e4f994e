//! Encoding configuration resolution.
//!
//! The model-level config starts from [`EncodingConfig::default`] and is
//! refined by `tokenizer_init.json`. Per-call overrides replace it wholesale.

use crate::load::{ModelDirectory, read_model_file};
use onnx_transformers_domain::{EncodingConfig, TruncationStrategy};
use onnx_transformers_shared::{ErrorCode, ErrorEnvelope, Result};
use serde_json::Value;
use std::path::Path;

/// `tokenizer_init.json` keys carrying the maximum length, in priority order.
pub const MAX_LENGTH_ALIASES: [&str; 4] =
    ["max_len", "model_max_length", "model_max_len", "max_length"];

/// Build the model-level encoding config for a model directory.
pub fn build_default_encoding_config(model_dir: &ModelDirectory) -> Result<EncodingConfig> {
    let config = EncodingConfig::default();
    match model_dir.load_tokenizer_init()? {
        Some(init) => apply_tokenizer_init(config, &init).map_err(|error| {
            let path = model_dir.tokenizer_init_path();
            error.with_metadata("path", path.to_string_lossy().to_string())
        }),
        None => Ok(config),
    }
}

/// Apply a parsed `tokenizer_init.json` document to a config.
///
/// The first present alias sets `max_length` and switches truncation to
/// `longest_first`. `do_lower_case` sets the lowercase flag.
pub fn apply_tokenizer_init(mut config: EncodingConfig, init: &Value) -> Result<EncodingConfig> {
    let present: Vec<(&str, &Value)> = MAX_LENGTH_ALIASES
        .iter()
        .filter_map(|alias| init.get(*alias).map(|value| (*alias, value)))
        .collect();

    if let Some((alias, value)) = present.first() {
        config.max_length = Some(parse_max_length(alias, value)?);
        config.truncation_strategy = TruncationStrategy::LongestFirst;

        let ignored: Vec<&str> = present
            .iter()
            .skip(1)
            .filter(|(_, other)| *other != *value)
            .map(|(name, _)| *name)
            .collect();
        if !ignored.is_empty() {
            tracing::warn!(
                winner = alias,
                ignored = ?ignored,
                "tokenizer_init.json declares conflicting maximum lengths"
            );
        }
    }

    if let Some(value) = init.get("do_lower_case") {
        config.do_lower_case = match value {
            Value::Bool(flag) => Some(*flag),
            Value::Null => None,
            _ => {
                return Err(invalid_init_value("do_lower_case", "expected a boolean"));
            },
        };
    }

    Ok(config)
}

fn parse_max_length(alias: &str, value: &Value) -> Result<usize> {
    let Value::Number(number) = value else {
        return Err(invalid_init_value(alias, "expected a positive integer"));
    };
    if let Some(length) = number.as_u64() {
        return Ok(usize::try_from(length).unwrap_or(usize::MAX));
    }
    // Unbounded tokenizers store a huge float sentinel such as 1e30.
    match number.as_f64() {
        Some(length) if length >= 1.0 && length.fract() == 0.0 => Ok(usize::MAX),
        _ => Err(invalid_init_value(alias, "expected a positive integer")),
    }
}

fn invalid_init_value(key: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::configuration("invalid_tokenizer_init"),
        format!("invalid `{key}` in tokenizer_init.json: {message}"),
    )
    .with_metadata("key", key)
}

/// Pick the config for one call: the override when given, else the default.
#[must_use]
pub fn resolve_call_config<'a>(
    default: &'a EncodingConfig,
    override_config: Option<&'a EncodingConfig>,
) -> &'a EncodingConfig {
    override_config.unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load a full replacement encoding config from a `.json` or `.toml` file.
pub fn load_encoding_config_file(path: &Path) -> Result<EncodingConfig> {
    let format = detect_config_format(path)?;
    let text = read_model_file(path)?;
    parse_encoding_config(&text, format)
        .map_err(|error| error.with_metadata("path", path.to_string_lossy().to_string()))
}

/// Parse an encoding config from JSON text.
pub fn parse_encoding_config_json(input: &str) -> Result<EncodingConfig> {
    parse_encoding_config(input, ConfigFormat::Json)
}

/// Parse an encoding config from TOML text.
pub fn parse_encoding_config_toml(input: &str) -> Result<EncodingConfig> {
    parse_encoding_config(input, ConfigFormat::Toml)
}

fn parse_encoding_config(input: &str, format: ConfigFormat) -> Result<EncodingConfig> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::configuration("invalid_json"),
                format!("invalid encoding config JSON: {error}"),
            )
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::configuration("invalid_toml"),
                format!("invalid encoding config TOML: {error}"),
            )
        }),
    }
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        other => Err(ErrorEnvelope::expected(
            ErrorCode::configuration("unsupported_format"),
            "unsupported encoding config format; use .json or .toml",
        )
        .with_metadata("extension", other.unwrap_or_default().to_string())),
    }
}

/// JSON schema of [`EncodingConfig`].
#[must_use]
pub fn encoding_config_schema() -> schemars::Schema {
    schemars::schema_for!(EncodingConfig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_domain::PaddingStrategy;
    use serde_json::json;

    #[test]
    fn first_alias_wins_and_enables_longest_first() -> Result<()> {
        let init = json!({"model_max_length": 512, "max_length": 128, "do_lower_case": true});
        let config = apply_tokenizer_init(EncodingConfig::default(), &init)?;

        assert_eq!(config.max_length, Some(512));
        assert_eq!(config.truncation_strategy, TruncationStrategy::LongestFirst);
        assert_eq!(config.do_lower_case, Some(true));
        Ok(())
    }

    #[test]
    fn alias_priority_follows_declared_order() -> Result<()> {
        let init = json!({"max_length": 64, "model_max_len": 32, "max_len": 16});
        let config = apply_tokenizer_init(EncodingConfig::default(), &init)?;
        assert_eq!(config.max_length, Some(16));
        Ok(())
    }

    #[test]
    fn empty_init_keeps_defaults() -> Result<()> {
        let config = apply_tokenizer_init(EncodingConfig::default(), &json!({}))?;
        assert_eq!(config, EncodingConfig::default());
        Ok(())
    }

    #[test]
    fn huge_sentinel_is_unbounded() -> Result<()> {
        let init = json!({"model_max_length": 1.0e30});
        let config = apply_tokenizer_init(EncodingConfig::default(), &init)?;
        assert_eq!(config.max_length, Some(usize::MAX));
        Ok(())
    }

    #[test]
    fn non_numeric_max_length_is_rejected() {
        let init = json!({"max_len": "long"});
        let error = apply_tokenizer_init(EncodingConfig::default(), &init).err();
        assert!(error.is_some_and(|error| error.is_configuration_error()));
    }

    #[test]
    fn override_replaces_default_wholesale() {
        let default = EncodingConfig::default().with_max_length(128);
        let override_config = EncodingConfig::default().with_padding(PaddingStrategy::DoNotPad);

        let resolved = resolve_call_config(&default, Some(&override_config));
        assert_eq!(resolved.max_length, None);
        assert_eq!(resolved.padding_strategy, PaddingStrategy::DoNotPad);

        assert_eq!(resolve_call_config(&default, None), &default);
    }

    #[test]
    fn toml_and_json_parse_to_the_same_config() -> Result<()> {
        let from_json = parse_encoding_config_json(
            r#"{"max_length": 32, "truncation_strategy": "only_first", "output_name": "logits"}"#,
        )?;
        let from_toml = parse_encoding_config_toml(
            "max_length = 32\ntruncation_strategy = \"only_first\"\noutput_name = \"logits\"\n",
        )?;
        assert_eq!(from_json, from_toml);
        Ok(())
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let error = load_encoding_config_file(Path::new("encoding.yaml")).err();
        assert!(
            error.is_some_and(|error| error.code == ErrorCode::configuration("unsupported_format"))
        );
    }

    #[test]
    fn schema_lists_config_fields() -> std::result::Result<(), serde_json::Error> {
        let schema = serde_json::to_value(encoding_config_schema())?;
        let properties = schema.get("properties");

        assert!(properties.is_some_and(|value| value.get("truncation_strategy").is_some()));
        assert!(properties.is_some_and(|value| value.get("output_name").is_some()));
        Ok(())
    }
}

//! Encoding configuration and its strategy enums.

use onnx_transformers_shared::{ErrorCode, ErrorEnvelope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output tensor selected by default on multi-output models.
pub const DEFAULT_OUTPUT_NAME: &str = "embedding";

/// Unknown string for a strategy enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{value} is not a valid {kind}, please select one of {expected:?}")]
pub struct ParseEnumError {
    /// Enum being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
    /// Accepted values.
    pub expected: &'static [&'static str],
}

impl From<ParseEnumError> for ErrorEnvelope {
    fn from(error: ParseEnumError) -> Self {
        Self::expected(ErrorCode::encoding("invalid_enum_value"), error.to_string())
            .with_metadata("value", error.value)
            .with_metadata("kind", error.kind)
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$variant_meta])* $variant ),+
        }

        impl $name {
            /// Accepted string values.
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            /// Returns the canonical string value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $value ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: value.to_owned(),
                        expected: Self::VALUES,
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// How rows of a batch are padded.
    PaddingStrategy {
        /// Pad to the longest row of the batch.
        #[default]
        Longest => "longest",
        /// Pad to the configured `max_length`.
        MaxLength => "max_length",
        /// Leave rows unpadded.
        DoNotPad => "do_not_pad",
    }
}

string_enum! {
    /// How over-long inputs are shortened.
    TruncationStrategy {
        /// Only the first sequence is shortened.
        OnlyFirst => "only_first",
        /// Only the second sequence of a pair is shortened.
        OnlySecond => "only_second",
        /// The longer sequence is shortened first, token by token.
        LongestFirst => "longest_first",
        /// No truncation.
        #[default]
        DoNotTruncate => "do_not_truncate",
    }
}

string_enum! {
    /// Side on which padding or truncation is applied.
    Direction {
        /// Leading side.
        Left => "left",
        /// Trailing side.
        #[default]
        Right => "right",
    }
}

/// Full contract for one encode call.
///
/// The model-level instance is derived once from the model directory; callers
/// derive modified copies with the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "flags mirror the tokenizer call options one to one"
)]
pub struct EncodingConfig {
    /// Inject special tokens (`[CLS]`, `[SEP]`, ...).
    pub add_special_tokens: bool,
    /// Input strings are pre-split words.
    pub is_split_into_words: bool,
    /// Force (`true`) or suppress (`false`) token type ids; `None` follows the model.
    pub return_token_type_ids: Option<bool>,
    /// Force (`true`) or suppress (`false`) the attention mask; `None` follows the model.
    pub return_attention_mask: Option<bool>,
    /// Emit truncated tokens as extra overflow rows.
    pub return_overflowing_tokens: bool,
    /// Emit the special-tokens mask.
    pub return_special_tokens_mask: bool,
    /// Emit character offsets per token.
    pub return_offsets_mapping: bool,
    /// Emit the unpadded length per row.
    pub return_length: bool,
    /// Padding strategy.
    #[serde(alias = "padding")]
    pub padding_strategy: PaddingStrategy,
    /// Truncation strategy.
    #[serde(alias = "truncation")]
    pub truncation_strategy: TruncationStrategy,
    /// Maximum sequence length including special tokens.
    pub max_length: Option<usize>,
    /// Overlap between consecutive overflow windows.
    pub stride: usize,
    /// Round the padded length up to a multiple of this value.
    pub pad_to_multiple_of: Option<usize>,
    /// Side padding is applied on.
    pub padding_direction: Direction,
    /// Side tokens are removed from.
    pub truncation_direction: Direction,
    /// Lowercase inputs before segmentation when `Some(true)`.
    pub do_lower_case: Option<bool>,
    /// Output selected on multi-output models.
    pub output_name: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            add_special_tokens: true,
            is_split_into_words: false,
            return_token_type_ids: None,
            return_attention_mask: None,
            return_overflowing_tokens: false,
            return_special_tokens_mask: false,
            return_offsets_mapping: false,
            return_length: false,
            padding_strategy: PaddingStrategy::default(),
            truncation_strategy: TruncationStrategy::default(),
            max_length: None,
            stride: 0,
            pad_to_multiple_of: None,
            padding_direction: Direction::default(),
            truncation_direction: Direction::default(),
            do_lower_case: None,
            output_name: DEFAULT_OUTPUT_NAME.to_owned(),
        }
    }
}

impl EncodingConfig {
    /// Set `add_special_tokens`.
    #[must_use]
    pub fn with_add_special_tokens(mut self, value: bool) -> Self {
        self.add_special_tokens = value;
        self
    }

    /// Set `is_split_into_words`.
    #[must_use]
    pub fn with_is_split_into_words(mut self, value: bool) -> Self {
        self.is_split_into_words = value;
        self
    }

    /// Set `return_token_type_ids`.
    #[must_use]
    pub fn with_return_token_type_ids(mut self, value: bool) -> Self {
        self.return_token_type_ids = Some(value);
        self
    }

    /// Set `return_attention_mask`.
    #[must_use]
    pub fn with_return_attention_mask(mut self, value: bool) -> Self {
        self.return_attention_mask = Some(value);
        self
    }

    /// Set `return_overflowing_tokens`.
    #[must_use]
    pub fn with_return_overflowing_tokens(mut self, value: bool) -> Self {
        self.return_overflowing_tokens = value;
        self
    }

    /// Set `return_special_tokens_mask`.
    #[must_use]
    pub fn with_return_special_tokens_mask(mut self, value: bool) -> Self {
        self.return_special_tokens_mask = value;
        self
    }

    /// Set `return_offsets_mapping`.
    #[must_use]
    pub fn with_return_offsets_mapping(mut self, value: bool) -> Self {
        self.return_offsets_mapping = value;
        self
    }

    /// Set `return_length`.
    #[must_use]
    pub fn with_return_length(mut self, value: bool) -> Self {
        self.return_length = value;
        self
    }

    /// Set the padding strategy.
    #[must_use]
    pub fn with_padding(mut self, strategy: PaddingStrategy) -> Self {
        self.padding_strategy = strategy;
        self
    }

    /// Set the truncation strategy.
    #[must_use]
    pub fn with_truncation(mut self, strategy: TruncationStrategy) -> Self {
        self.truncation_strategy = strategy;
        self
    }

    /// Set `max_length`.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the overflow stride.
    #[must_use]
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set `pad_to_multiple_of`.
    #[must_use]
    pub fn with_pad_to_multiple_of(mut self, multiple: usize) -> Self {
        self.pad_to_multiple_of = Some(multiple);
        self
    }

    /// Set the padding side.
    #[must_use]
    pub fn with_padding_direction(mut self, direction: Direction) -> Self {
        self.padding_direction = direction;
        self
    }

    /// Set the truncation side.
    #[must_use]
    pub fn with_truncation_direction(mut self, direction: Direction) -> Self {
        self.truncation_direction = direction;
        self
    }

    /// Set `do_lower_case`.
    #[must_use]
    pub fn with_do_lower_case(mut self, value: bool) -> Self {
        self.do_lower_case = Some(value);
        self
    }

    /// Set the selected output name.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Returns true when inputs are lowercased before segmentation.
    #[must_use]
    pub const fn lowercases(&self) -> bool {
        matches!(self.do_lower_case, Some(true))
    }

    /// Returns true when the truncation strategy removes tokens.
    #[must_use]
    pub const fn truncates(&self) -> bool {
        !matches!(self.truncation_strategy, TruncationStrategy::DoNotTruncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let config = EncodingConfig::default();

        assert!(config.add_special_tokens);
        assert_eq!(config.padding_strategy, PaddingStrategy::Longest);
        assert_eq!(config.truncation_strategy, TruncationStrategy::DoNotTruncate);
        assert_eq!(config.padding_direction, Direction::Right);
        assert_eq!(config.truncation_direction, Direction::Right);
        assert_eq!(config.max_length, None);
        assert_eq!(config.stride, 0);
        assert_eq!(config.output_name, "embedding");
        assert!(!config.truncates());
    }

    #[test]
    fn builders_produce_modified_copies() {
        let base = EncodingConfig::default();
        let derived = base
            .clone()
            .with_max_length(16)
            .with_truncation(TruncationStrategy::LongestFirst)
            .with_output_name("logits");

        assert_eq!(base, EncodingConfig::default());
        assert_eq!(derived.max_length, Some(16));
        assert!(derived.truncates());
        assert_eq!(derived.output_name, "logits");
    }

    #[test]
    fn unknown_enum_value_lists_valid_values() {
        let error = "sideways".parse::<Direction>().err();
        let message = error.map(|error| error.to_string()).unwrap_or_default();

        assert!(message.contains("sideways is not a valid Direction"));
        assert!(message.contains("left"));
        assert!(message.contains("right"));
    }

    #[test]
    fn enum_strings_round_trip_through_from_str() {
        for value in TruncationStrategy::VALUES {
            let parsed = value.parse::<TruncationStrategy>();
            assert_eq!(parsed.map(TruncationStrategy::as_str), Ok(*value));
        }
    }

    #[test]
    fn partial_documents_fill_defaults() -> Result<(), serde_json::Error> {
        let config: EncodingConfig = serde_json::from_value(json!({
            "max_length": 8,
            "truncation_strategy": "only_first",
            "padding": "max_length"
        }))?;

        assert_eq!(config.max_length, Some(8));
        assert_eq!(config.truncation_strategy, TruncationStrategy::OnlyFirst);
        assert_eq!(config.padding_strategy, PaddingStrategy::MaxLength);
        assert!(config.add_special_tokens);
        Ok(())
    }

    #[test]
    fn unknown_strategy_string_is_rejected() {
        let parsed: Result<EncodingConfig, _> =
            serde_json::from_value(json!({"padding_strategy": "everything"}));
        let message = parsed.err().map(|error| error.to_string()).unwrap_or_default();

        assert!(message.contains("longest"));
        assert!(message.contains("do_not_pad"));
    }

    #[test]
    fn parse_error_converts_into_envelope() {
        let error = "nope"
            .parse::<PaddingStrategy>()
            .err()
            .map(ErrorEnvelope::from);

        assert!(error.is_some_and(|error| error.is_encoding_error()));
    }
}

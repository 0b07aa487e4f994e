//! Text to model-input tensors.
//!
//! [`TokenizerAdapter::encode`] validates the call config, segments every
//! item, truncates against the length budget, injects special tokens, pads
//! the batch and lays the result out as `[rows, seq_len]` tensors for the
//! inputs the network declares.

use onnx_transformers_domain::{
    Direction, ElementType, EncodingConfig, NamedTensors, NetworkInfo, PaddingStrategy,
    SpecialTokens, Tensor, TextInput, TokenizerDescriptor, TruncationStrategy,
};
use onnx_transformers_ports::{FastTokenizerPort, TokenSequence};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;

/// Extra tensor: attention mask when requested but not declared.
pub const ATTENTION_MASK: &str = "attention_mask";
/// Extra tensor: token type ids when requested but not declared.
pub const TOKEN_TYPE_IDS: &str = "token_type_ids";
/// Extra tensor: special-tokens mask.
pub const SPECIAL_TOKENS_MASK: &str = "special_tokens_mask";
/// Extra tensor: `[rows, seq_len, 2]` character offsets.
pub const OFFSET_MAPPING: &str = "offset_mapping";
/// Extra tensor: unpadded length per row.
pub const LENGTH: &str = "length";
/// Extra tensor: source item of every row.
pub const OVERFLOW_TO_SAMPLE_MAPPING: &str = "overflow_to_sample_mapping";

/// Kind of a declared model input, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Token ids.
    InputIds,
    /// 1 for tokens, 0 for padding.
    AttentionMask,
    /// Segment ids.
    TokenTypeIds,
    /// 1 for special tokens and padding.
    SpecialTokensMask,
    /// Position index per token.
    PositionIds,
}

impl InputKind {
    /// Classify a declared input name.
    #[must_use]
    pub fn classify(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("attention_mask") {
            Some(Self::AttentionMask)
        } else if lower.contains("token_type") {
            Some(Self::TokenTypeIds)
        } else if lower.contains("special_tokens_mask") {
            Some(Self::SpecialTokensMask)
        } else if lower.contains("position_ids") {
            Some(Self::PositionIds)
        } else if lower.contains("input_ids") || lower == "ids" {
            Some(Self::InputIds)
        } else {
            None
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::InputIds => "input_ids",
            Self::AttentionMask => "attention_mask",
            Self::TokenTypeIds => "token_type_ids",
            Self::SpecialTokensMask => "special_tokens_mask",
            Self::PositionIds => "position_ids",
        })
    }
}

/// Result of encoding one call.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInputs {
    /// Tensors for the declared model inputs, in declared order.
    pub feeds: NamedTensors,
    /// Requested auxiliary tensors the model does not consume.
    pub extras: NamedTensors,
    /// Rows in the batch, overflow rows included.
    pub num_rows: usize,
    /// Padded sequence length.
    pub sequence_length: usize,
}

/// Turns text into model-ready tensors.
#[derive(Clone)]
pub struct TokenizerAdapter {
    tokenizer: Arc<dyn FastTokenizerPort>,
    descriptor: TokenizerDescriptor,
    model_cap: Option<usize>,
}

impl fmt::Debug for TokenizerAdapter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenizerAdapter")
            .field("model_cap", &self.model_cap)
            .finish_non_exhaustive()
    }
}

impl TokenizerAdapter {
    /// Build an adapter over a fast tokenizer and its descriptor.
    #[must_use]
    pub fn new(tokenizer: Arc<dyn FastTokenizerPort>, descriptor: TokenizerDescriptor) -> Self {
        Self {
            tokenizer,
            descriptor,
            model_cap: None,
        }
    }

    /// Length the model imposes, used by `longest_first` without `max_length`.
    #[must_use]
    pub const fn with_model_cap(mut self, cap: Option<usize>) -> Self {
        self.model_cap = cap;
        self
    }

    /// Special tokens of the descriptor.
    #[must_use]
    pub const fn special_tokens(&self) -> SpecialTokens<'_> {
        SpecialTokens::new(&self.descriptor)
    }

    /// Tokenizer descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &TokenizerDescriptor {
        &self.descriptor
    }

    /// Encode an input for the given network.
    pub fn encode(
        &self,
        input: &TextInput,
        config: &EncodingConfig,
        network: &NetworkInfo,
    ) -> Result<EncodedInputs> {
        let plan = self.plan(input, config)?;

        let mut rows = Vec::with_capacity(input.len());
        for (sample, (first, second)) in input.items().into_iter().enumerate() {
            let first = self.segment(first, config)?;
            let second = second
                .map(|text| self.segment(text, config))
                .transpose()?
                .map(|sequence| sequence.with_type_id(1));

            for (first, second) in truncate(first, second, config, plan.budget)? {
                let sequence = self
                    .tokenizer
                    .post_process(first, second, config.add_special_tokens)?;
                rows.push(Row {
                    sequence,
                    sample,
                    padding: 0,
                });
            }
        }

        let sequence_length = self.pad(&mut rows, config, plan.max_length)?;
        build_tensors(&rows, sequence_length, config, network)
    }

    /// Segment one sequence. Lowercased text is segmented with its offsets
    /// mapped back onto the caller's text.
    fn segment(&self, text: &str, config: &EncodingConfig) -> Result<TokenSequence> {
        if !config.lowercases() {
            return self.tokenizer.segment(text, config.is_split_into_words);
        }
        let (lowered, origins) = lowercase_with_origins(text);
        let mut sequence = self
            .tokenizer
            .segment(&lowered, config.is_split_into_words)?;
        for offsets in &mut sequence.offsets {
            *offsets = (origin(&origins, offsets.0), origin(&origins, offsets.1));
        }
        Ok(sequence)
    }

    fn plan(&self, input: &TextInput, config: &EncodingConfig) -> Result<Plan> {
        if input.is_empty() {
            return Err(ErrorEnvelope::encoding("empty_input", "input batch is empty"));
        }
        if config.truncation_strategy == TruncationStrategy::OnlySecond && !input.is_paired() {
            return Err(ErrorEnvelope::unsupported_input(
                "truncation strategy `only_second` requires paired input",
            ));
        }
        if config.pad_to_multiple_of == Some(0) {
            return Err(ErrorEnvelope::encoding(
                "invalid_pad_multiple",
                "`pad_to_multiple_of` must be positive",
            ));
        }

        let max_length = match (config.max_length, config.truncation_strategy) {
            (Some(length), _) => Some(length),
            (None, TruncationStrategy::LongestFirst) => self.model_cap,
            (None, _) => None,
        };

        if config.truncates() && max_length.is_none() {
            return Err(ErrorEnvelope::encoding(
                "max_length_required",
                format!(
                    "truncation strategy `{}` requires `max_length`",
                    config.truncation_strategy
                ),
            ));
        }
        if config.padding_strategy == PaddingStrategy::MaxLength && max_length.is_none() {
            return Err(ErrorEnvelope::encoding(
                "max_length_required",
                "padding strategy `max_length` requires `max_length`",
            ));
        }

        let budget = match max_length {
            Some(length) if config.truncates() => {
                let added = if config.add_special_tokens {
                    self.tokenizer.num_special_tokens_to_add(input.is_paired())
                } else {
                    0
                };
                Some(length.saturating_sub(added))
            },
            _ => None,
        };

        if config.return_overflowing_tokens {
            if let Some(budget) = budget {
                if config.stride >= budget {
                    return Err(ErrorEnvelope::encoding(
                        "invalid_stride",
                        format!(
                            "stride {} must be smaller than the {budget} tokens left after special tokens",
                            config.stride
                        ),
                    ));
                }
            }
            if input.is_paired() && config.truncation_strategy == TruncationStrategy::LongestFirst
            {
                return Err(ErrorEnvelope::encoding(
                    "overflow_not_supported",
                    "overflowing tokens cannot be returned for pairs with `longest_first`",
                ));
            }
        }

        Ok(Plan { max_length, budget })
    }

    fn pad(
        &self,
        rows: &mut [Row],
        config: &EncodingConfig,
        max_length: Option<usize>,
    ) -> Result<usize> {
        let longest = rows.iter().map(|row| row.sequence.len()).max().unwrap_or(0);

        let target = match config.padding_strategy {
            PaddingStrategy::DoNotPad => {
                if rows.iter().any(|row| row.sequence.len() != longest) {
                    return Err(ErrorEnvelope::encoding(
                        "ragged_batch",
                        "rows differ in length and padding is disabled",
                    ));
                }
                return Ok(longest);
            },
            PaddingStrategy::Longest => longest,
            PaddingStrategy::MaxLength => max_length
                .filter(|length| *length != usize::MAX)
                .unwrap_or(longest)
                .max(longest),
        };
        let target = match config.pad_to_multiple_of {
            Some(multiple) if multiple > 0 => target.div_ceil(multiple) * multiple,
            _ => target,
        };

        if rows.iter().all(|row| row.sequence.len() == target) {
            return Ok(target);
        }

        let pad_id = self.special_tokens().pad_token_id().ok_or_else(|| {
            ErrorEnvelope::encoding(
                "missing_pad_token",
                "padding is required but the tokenizer has no pad token",
            )
        })?;
        let pad_type_id = self.special_tokens().pad_token_type_id();

        for row in rows.iter_mut() {
            row.padding = pad_sequence(
                &mut row.sequence,
                target,
                pad_id,
                pad_type_id,
                config.padding_direction,
            );
        }
        Ok(target)
    }
}

struct Plan {
    max_length: Option<usize>,
    budget: Option<usize>,
}

#[derive(Debug)]
struct Row {
    sequence: TokenSequence,
    sample: usize,
    padding: usize,
}

impl Row {
    fn unpadded_len(&self) -> usize {
        self.sequence.len() - self.padding
    }
}

/// One truncated item: the kept pair followed by its overflow windows.
type Truncated = Vec<(TokenSequence, Option<TokenSequence>)>;

fn truncate(
    first: TokenSequence,
    second: Option<TokenSequence>,
    config: &EncodingConfig,
    budget: Option<usize>,
) -> Result<Truncated> {
    let Some(budget) = budget else {
        return Ok(vec![(first, second)]);
    };
    let total = first.len() + second.as_ref().map_or(0, TokenSequence::len);
    if total <= budget {
        return Ok(vec![(first, second)]);
    }
    let to_remove = total - budget;
    let direction = config.truncation_direction;
    let stride = config.stride;
    let overflow = config.return_overflowing_tokens;

    match (config.truncation_strategy, second) {
        (TruncationStrategy::DoNotTruncate, second) => Ok(vec![(first, second)]),
        (TruncationStrategy::LongestFirst, None) => {
            let windows = split_windows(&first, budget, stride, direction, overflow);
            Ok(windows.into_iter().map(|window| (window, None)).collect())
        },
        (TruncationStrategy::LongestFirst, Some(second)) => {
            let (target_first, target_second) =
                longest_first_targets(first.len(), second.len(), budget);
            let first = keep(&first, target_first, direction);
            let second = keep(&second, target_second, direction);
            Ok(vec![(first, Some(second))])
        },
        (TruncationStrategy::OnlyFirst, second) => {
            let target = shortened_length(first.len(), to_remove, "first")?;
            let windows = split_windows(&first, target, stride, direction, overflow);
            Ok(windows
                .into_iter()
                .map(|window| (window, second.clone()))
                .collect())
        },
        (TruncationStrategy::OnlySecond, Some(second)) => {
            let target = shortened_length(second.len(), to_remove, "second")?;
            let windows = split_windows(&second, target, stride, direction, overflow);
            Ok(windows
                .into_iter()
                .map(|window| (first.clone(), Some(window)))
                .collect())
        },
        (TruncationStrategy::OnlySecond, None) => Err(ErrorEnvelope::unsupported_input(
            "truncation strategy `only_second` requires paired input",
        )),
    }
}

fn shortened_length(len: usize, to_remove: usize, which: &str) -> Result<usize> {
    if len > to_remove {
        return Ok(len - to_remove);
    }
    Err(ErrorEnvelope::encoding(
        "sequence_too_short",
        format!(
            "{to_remove} tokens must be removed but the {which} sequence only has {len}"
        ),
    )
    .with_metadata("to_remove", to_remove.to_string())
    .with_metadata("length", len.to_string()))
}

/// Per-sequence targets for `longest_first` on a pair.
///
/// The longer sequence is cut down towards the shorter one first; when both
/// still exceed the budget it is split evenly and the originally longer
/// sequence keeps the odd token.
fn longest_first_targets(first: usize, second: usize, budget: usize) -> (usize, usize) {
    let swapped = first > second;
    let (mut short, mut long) = if swapped {
        (second, first)
    } else {
        (first, second)
    };

    long = if short > budget {
        short
    } else {
        short.max(budget - short)
    };
    if short + long > budget {
        short = budget / 2;
        long = short + budget % 2;
    }

    if swapped { (long, short) } else { (short, long) }
}

fn keep(sequence: &TokenSequence, target: usize, direction: Direction) -> TokenSequence {
    let len = sequence.len();
    if target >= len {
        return sequence.clone();
    }
    match direction {
        Direction::Right => sequence.slice(0..target),
        Direction::Left => sequence.slice(len - target..len),
    }
}

/// Kept window first, then overflow windows of `size` tokens overlapping by
/// `stride`. Without `overflow` only the kept window is returned.
fn split_windows(
    sequence: &TokenSequence,
    size: usize,
    stride: usize,
    direction: Direction,
    overflow: bool,
) -> Vec<TokenSequence> {
    let len = sequence.len();
    if !overflow || size == 0 || size >= len {
        return vec![keep(sequence, size, direction)];
    }

    let step = size.saturating_sub(stride).max(1);
    let mut windows = Vec::new();
    match direction {
        Direction::Right => {
            let mut start = 0;
            loop {
                let stop = (start + size).min(len);
                windows.push(sequence.slice(start..stop));
                if stop == len {
                    break;
                }
                start += step;
            }
        },
        Direction::Left => {
            let mut stop = len;
            loop {
                let start = stop.saturating_sub(size);
                windows.push(sequence.slice(start..stop));
                if start == 0 {
                    break;
                }
                stop -= step;
            }
        },
    }
    windows
}

/// Pad to `target` tokens and return how many were added.
fn pad_sequence(
    sequence: &mut TokenSequence,
    target: usize,
    pad_id: u32,
    pad_type_id: u32,
    direction: Direction,
) -> usize {
    let missing = target.saturating_sub(sequence.len());
    if missing == 0 {
        return 0;
    }
    let pad_values = |values: &mut Vec<u32>, value: u32| match direction {
        Direction::Right => values.extend(std::iter::repeat_n(value, missing)),
        Direction::Left => {
            values.splice(0..0, std::iter::repeat_n(value, missing));
        },
    };
    pad_values(&mut sequence.ids, pad_id);
    pad_values(&mut sequence.type_ids, pad_type_id);
    pad_values(&mut sequence.special_tokens_mask, 1);
    match direction {
        Direction::Right => sequence
            .offsets
            .extend(std::iter::repeat_n((0, 0), missing)),
        Direction::Left => {
            sequence
                .offsets
                .splice(0..0, std::iter::repeat_n((0, 0), missing));
        },
    }
    missing
}

fn build_tensors(
    rows: &[Row],
    sequence_length: usize,
    config: &EncodingConfig,
    network: &NetworkInfo,
) -> Result<EncodedInputs> {
    let num_rows = rows.len();
    let shape = vec![num_rows, sequence_length];
    let attention = attention_mask(rows, sequence_length, config.padding_direction);

    let mut feeds = NamedTensors::new();
    let mut declared = Vec::new();
    for name in network.input_names() {
        let kind = InputKind::classify(name).ok_or_else(|| {
            ErrorEnvelope::encoding(
                "unsupported_model_input",
                format!("model input `{name}` cannot be produced from text"),
            )
            .with_metadata("input", name.clone())
        })?;
        let values = match kind {
            InputKind::InputIds => flatten(rows, |sequence| &sequence.ids),
            InputKind::AttentionMask => attention.clone(),
            InputKind::TokenTypeIds => flatten(rows, |sequence| &sequence.type_ids),
            InputKind::SpecialTokensMask => {
                flatten(rows, |sequence| &sequence.special_tokens_mask)
            },
            InputKind::PositionIds => position_ids(num_rows, sequence_length),
        };
        let element_type = network.input_type(name).unwrap_or(&ElementType::Int64);
        feeds.insert(
            name.clone(),
            typed_tensor(name, shape.clone(), values, element_type)?,
        );
        declared.push(kind);
    }

    let mut extras = NamedTensors::new();
    if config.return_attention_mask == Some(true) && !declared.contains(&InputKind::AttentionMask)
    {
        extras.insert(ATTENTION_MASK, int_tensor(shape.clone(), attention)?);
    }
    if config.return_token_type_ids == Some(true) && !declared.contains(&InputKind::TokenTypeIds) {
        extras.insert(
            TOKEN_TYPE_IDS,
            int_tensor(shape.clone(), flatten(rows, |sequence| &sequence.type_ids))?,
        );
    }
    if config.return_special_tokens_mask && !declared.contains(&InputKind::SpecialTokensMask) {
        extras.insert(
            SPECIAL_TOKENS_MASK,
            int_tensor(
                shape.clone(),
                flatten(rows, |sequence| &sequence.special_tokens_mask),
            )?,
        );
    }
    if config.return_offsets_mapping {
        let offsets = rows
            .iter()
            .flat_map(|row| row.sequence.offsets.iter())
            .flat_map(|(start, end)| [to_i64(*start), to_i64(*end)])
            .collect();
        extras.insert(
            OFFSET_MAPPING,
            int_tensor(vec![num_rows, sequence_length, 2], offsets)?,
        );
    }
    if config.return_length {
        let lengths = rows.iter().map(|row| to_i64(row.unpadded_len())).collect();
        extras.insert(LENGTH, int_tensor(vec![num_rows], lengths)?);
    }
    if config.return_overflowing_tokens {
        let mapping = rows.iter().map(|row| to_i64(row.sample)).collect();
        extras.insert(OVERFLOW_TO_SAMPLE_MAPPING, int_tensor(vec![num_rows], mapping)?);
    }

    Ok(EncodedInputs {
        feeds,
        extras,
        num_rows,
        sequence_length,
    })
}

fn flatten(rows: &[Row], field: impl Fn(&TokenSequence) -> &Vec<u32>) -> Vec<i64> {
    rows.iter()
        .flat_map(|row| field(&row.sequence).iter().map(|value| i64::from(*value)))
        .collect()
}

fn attention_mask(rows: &[Row], sequence_length: usize, direction: Direction) -> Vec<i64> {
    let mut mask = Vec::with_capacity(rows.len() * sequence_length);
    for row in rows {
        let real = row.unpadded_len();
        let padding = sequence_length.saturating_sub(real);
        match direction {
            Direction::Right => {
                mask.extend(std::iter::repeat_n(1, real));
                mask.extend(std::iter::repeat_n(0, padding));
            },
            Direction::Left => {
                mask.extend(std::iter::repeat_n(0, padding));
                mask.extend(std::iter::repeat_n(1, real));
            },
        }
    }
    mask
}

/// Lowercase `text`, recording for every byte of the result the offset of
/// the source character it came from, plus one trailing end offset.
fn lowercase_with_origins(text: &str) -> (String, Vec<usize>) {
    let mut lowered = String::with_capacity(text.len());
    let mut origins = Vec::with_capacity(text.len() + 1);
    for (index, character) in text.char_indices() {
        lowered.extend(character.to_lowercase());
        origins.resize(lowered.len(), index);
    }
    origins.push(text.len());
    (lowered, origins)
}

fn origin(origins: &[usize], offset: usize) -> usize {
    origins
        .get(offset)
        .or_else(|| origins.last())
        .copied()
        .unwrap_or(offset)
}

fn position_ids(num_rows: usize, sequence_length: usize) -> Vec<i64> {
    (0..num_rows)
        .flat_map(|_| (0..sequence_length).map(to_i64))
        .collect()
}

fn int_tensor(shape: Vec<usize>, values: Vec<i64>) -> Result<Tensor> {
    Tensor::from_i64(shape, values).map_err(ErrorEnvelope::from)
}

fn typed_tensor(
    name: &str,
    shape: Vec<usize>,
    values: Vec<i64>,
    element_type: &ElementType,
) -> Result<Tensor> {
    int_tensor(shape, values)?.cast_to(element_type).map_err(|error| {
        ErrorEnvelope::encoding(
            "unsupported_model_input",
            format!("model input `{name}` has unsupported element type: {error}"),
        )
        .with_metadata("input", name)
        .with_metadata("element_type", element_type.type_tag())
    })
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

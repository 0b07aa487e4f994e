//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the encoding and shaping pipeline
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without an ONNX runtime or tokenizer files

use onnx_transformers_domain::{AddedToken, TokenizerDescriptor};
use onnx_transformers_ports::{
    Dimension, ExecutionProvider, FastTokenizerPort, InferenceSessionPort, NamedTensors, Tensor,
    TensorData, TensorSpec, TokenSequence,
};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Custom output producer for [`InMemorySession`].
pub type Responder = Arc<dyn Fn(&NamedTensors) -> Result<Vec<Tensor>> + Send + Sync>;

/// How a recorded run reached the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// [`InferenceSessionPort::run`].
    Direct,
    /// [`InferenceSessionPort::run_bound`].
    Bound,
}

/// One call observed by [`InMemorySession`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRun {
    /// Entry point used.
    pub kind: RunKind,
    /// Feeds passed in.
    pub feeds: NamedTensors,
}

/// Deterministic in-memory inference session.
///
/// Without a responder every declared output is filled with values derived
/// from the first feed, shaped `[rows, ...]` where symbolic axes take the
/// feed's sequence length.
pub struct InMemorySession {
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
    provider: ExecutionProvider,
    responder: Option<Responder>,
    runs: Mutex<Vec<RecordedRun>>,
}

impl fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySession")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl InMemorySession {
    /// Create a CPU session with the given signature.
    pub fn new(inputs: Vec<TensorSpec>, outputs: Vec<TensorSpec>) -> Self {
        Self {
            inputs,
            outputs,
            provider: ExecutionProvider::Cpu,
            responder: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Report a different execution provider.
    pub fn with_provider(mut self, provider: ExecutionProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Replace the default output generator.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&NamedTensors) -> Result<Vec<Tensor>> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Calls observed so far.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().map(|runs| runs.clone()).unwrap_or_default()
    }

    fn respond(&self, kind: RunKind, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(RecordedRun {
                kind,
                feeds: feeds.clone(),
            });
        }
        match &self.responder {
            Some(responder) => responder(feeds),
            None => default_outputs(&self.outputs, feeds),
        }
    }
}

impl InferenceSessionPort for InMemorySession {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    fn execution_provider(&self) -> ExecutionProvider {
        self.provider
    }

    fn run(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        self.respond(RunKind::Direct, feeds)
    }

    fn run_bound(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        self.respond(RunKind::Bound, feeds)
    }
}

/// Row sums of the first feed, plus its sequence length.
fn feed_summary(feeds: &NamedTensors) -> (Vec<i64>, usize) {
    let Some((_, first)) = feeds.iter().next() else {
        return (vec![0], 1);
    };
    let rows = first.shape().first().copied().unwrap_or(1).max(1);
    let seq_len = first.shape().get(1).copied().unwrap_or(1);
    let values: Vec<i64> = match first.data() {
        TensorData::Int64(values) => values.clone(),
        TensorData::Int32(values) => values.iter().copied().map(i64::from).collect(),
        TensorData::Float32(values) => values.iter().map(|value| *value as i64).collect(),
    };
    let sums = (0..rows)
        .map(|row| {
            values
                .iter()
                .skip(row * seq_len)
                .take(seq_len)
                .sum::<i64>()
        })
        .collect();
    (sums, seq_len)
}

fn default_outputs(outputs: &[TensorSpec], feeds: &NamedTensors) -> Result<Vec<Tensor>> {
    let (sums, seq_len) = feed_summary(feeds);
    let rows = sums.len();

    outputs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let shape: Vec<usize> = spec
                .shape
                .iter()
                .enumerate()
                .map(|(axis, dim)| match (axis, dim) {
                    (0, _) => rows,
                    (_, Dimension::Fixed(extent)) => usize::try_from(*extent).unwrap_or(1).max(1),
                    (_, Dimension::Symbolic(_)) => seq_len,
                })
                .collect();
            let shape = if shape.is_empty() { vec![rows] } else { shape };
            let per_row = shape.iter().skip(1).product::<usize>();
            let values = sums
                .iter()
                .flat_map(|sum| {
                    (0..per_row).map(move |offset| {
                        (*sum as f32).mul_add(0.01, offset as f32 * 0.001) + index as f32
                    })
                })
                .collect();
            Tensor::from_f32(shape, values).map_err(ErrorEnvelope::from)
        })
        .collect()
}

/// Id of `[PAD]` in [`WhitespaceTokenizer`].
pub const PAD_ID: u32 = 0;
/// Id of `[UNK]` in [`WhitespaceTokenizer`].
pub const UNK_ID: u32 = 1;
/// Id of `[CLS]` in [`WhitespaceTokenizer`].
pub const CLS_ID: u32 = 2;
/// Id of `[SEP]` in [`WhitespaceTokenizer`].
pub const SEP_ID: u32 = 3;
/// Id of `[MASK]` in [`WhitespaceTokenizer`].
pub const MASK_ID: u32 = 4;
/// First id assigned to vocabulary words.
pub const FIRST_WORD_ID: u32 = 5;

/// BERT-style tokenizer that splits on whitespace.
///
/// Known words map to their vocabulary id and everything else to `[UNK]`.
/// Offsets are byte ranges into the segmented text.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTokenizer {
    vocab: BTreeMap<String, u32>,
}

impl WhitespaceTokenizer {
    /// Tokenizer whose every word is `[UNK]`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizer with ids assigned from [`FIRST_WORD_ID`] in order.
    pub fn with_vocab(words: &[&str]) -> Self {
        let vocab = words
            .iter()
            .zip(FIRST_WORD_ID..)
            .map(|(word, id)| ((*word).to_owned(), id))
            .collect();
        Self { vocab }
    }

    /// Id of a word.
    pub fn id_of(&self, word: &str) -> u32 {
        self.vocab.get(word).copied().unwrap_or(UNK_ID)
    }

    /// Descriptor listing the special tokens as added tokens.
    pub fn descriptor() -> TokenizerDescriptor {
        TokenizerDescriptor::with_added_tokens(special_added_tokens(true))
    }

    /// Descriptor without a pad token.
    pub fn descriptor_without_pad() -> TokenizerDescriptor {
        TokenizerDescriptor::with_added_tokens(special_added_tokens(false))
    }
}

fn special_added_tokens(with_pad: bool) -> Vec<AddedToken> {
    [
        (PAD_ID, "[PAD]"),
        (UNK_ID, "[UNK]"),
        (CLS_ID, "[CLS]"),
        (SEP_ID, "[SEP]"),
        (MASK_ID, "[MASK]"),
    ]
    .into_iter()
    .filter(|(id, _)| with_pad || *id != PAD_ID)
    .map(|(id, content)| AddedToken {
        id,
        content: content.to_owned(),
        special: true,
    })
    .collect()
}

fn special(id: u32) -> TokenSequence {
    TokenSequence {
        ids: vec![id],
        type_ids: vec![0],
        offsets: vec![(0, 0)],
        special_tokens_mask: vec![1],
    }
}

fn append(target: &mut TokenSequence, mut other: TokenSequence, type_id: u32) {
    other.type_ids.iter_mut().for_each(|value| *value = type_id);
    target.ids.append(&mut other.ids);
    target.type_ids.append(&mut other.type_ids);
    target.offsets.append(&mut other.offsets);
    target
        .special_tokens_mask
        .append(&mut other.special_tokens_mask);
}

impl FastTokenizerPort for WhitespaceTokenizer {
    fn segment(&self, text: &str, _is_split_into_words: bool) -> Result<TokenSequence> {
        let mut ids = Vec::new();
        let mut offsets = Vec::new();
        let mut start = None;
        for (index, ch) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
            match (ch.is_whitespace(), start) {
                (true, Some(begin)) => {
                    ids.push(self.id_of(&text[begin..index]));
                    offsets.push((begin, index));
                    start = None;
                },
                (false, None) => start = Some(index),
                _ => {},
            }
        }
        Ok(TokenSequence::new(ids, offsets, 0))
    }

    fn num_special_tokens_to_add(&self, is_pair: bool) -> usize {
        if is_pair { 3 } else { 2 }
    }

    fn post_process(
        &self,
        first: TokenSequence,
        second: Option<TokenSequence>,
        add_special_tokens: bool,
    ) -> Result<TokenSequence> {
        let mut merged = TokenSequence::default();
        if add_special_tokens {
            append(&mut merged, special(CLS_ID), 0);
        }
        append(&mut merged, first, 0);
        if add_special_tokens {
            append(&mut merged, special(SEP_ID), 0);
        }
        if let Some(second) = second {
            append(&mut merged, second, 1);
            if add_special_tokens {
                append(&mut merged, special(SEP_ID), 1);
            }
        }
        Ok(merged)
    }
}

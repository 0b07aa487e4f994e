//! Hugging Face `tokenizers` adapter.

use onnx_transformers_ports::{FastTokenizerPort, TokenSequence};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use std::fmt;
use std::path::Path;
use tokenizers::{Encoding, PostProcessor, Token, Tokenizer};

/// Fast tokenizer backed by a serialized `tokenizer.json`.
///
/// Truncation and padding baked into the file are disabled; both are applied
/// by the encoding pipeline instead.
pub struct HfTokenizer {
    tokenizer: Tokenizer,
}

impl fmt::Debug for HfTokenizer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HfTokenizer")
            .field("vocab_size", &self.tokenizer.get_vocab_size(true))
            .finish_non_exhaustive()
    }
}

impl HfTokenizer {
    /// Load `tokenizer.json`.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(
                ErrorEnvelope::configuration("missing_file", "tokenizer file not found")
                    .with_metadata("path", path.to_string_lossy().to_string()),
            );
        }
        let tokenizer = Tokenizer::from_file(path).map_err(|error| {
            ErrorEnvelope::configuration(
                "invalid_tokenizer",
                format!("failed to load tokenizer: {error}"),
            )
            .with_metadata("path", path.to_string_lossy().to_string())
        })?;
        Self::from_tokenizer(tokenizer)
    }

    /// Wrap an already-built tokenizer.
    pub fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer
            .with_truncation(None)
            .map_err(tokenizer_error)?
            .with_padding(None);
        Ok(Self { tokenizer })
    }

    fn to_encoding(&self, sequence: &TokenSequence) -> Encoding {
        let type_id = sequence.type_ids.first().copied().unwrap_or(0);
        let tokens = sequence
            .ids
            .iter()
            .zip(&sequence.offsets)
            .map(|(id, offsets)| {
                let value = self.tokenizer.id_to_token(*id).unwrap_or_default();
                Token::new(*id, value, *offsets)
            })
            .collect();
        Encoding::from_tokens(tokens, type_id)
    }
}

impl FastTokenizerPort for HfTokenizer {
    fn segment(&self, text: &str, is_split_into_words: bool) -> Result<TokenSequence> {
        if !is_split_into_words {
            let encoding = self.tokenizer.encode(text, false).map_err(tokenizer_error)?;
            return Ok(sequence_from(&encoding));
        }

        // Pre-tokenized offsets are relative to each word; shift them back
        // onto the source text.
        let words: Vec<(usize, &str)> = split_words(text);
        let pieces: Vec<&str> = words.iter().map(|(_, word)| *word).collect();
        let encoding = self
            .tokenizer
            .encode(pieces, false)
            .map_err(tokenizer_error)?;
        let mut sequence = sequence_from(&encoding);
        for (offsets, word) in sequence.offsets.iter_mut().zip(encoding.get_word_ids()) {
            let start = word
                .and_then(|index| words.get(index as usize))
                .map_or(0, |(start, _)| *start);
            *offsets = (offsets.0 + start, offsets.1 + start);
        }
        Ok(sequence)
    }

    fn num_special_tokens_to_add(&self, is_pair: bool) -> usize {
        self.tokenizer
            .get_post_processor()
            .map_or(0, |processor| processor.added_tokens(is_pair))
    }

    fn post_process(
        &self,
        first: TokenSequence,
        second: Option<TokenSequence>,
        add_special_tokens: bool,
    ) -> Result<TokenSequence> {
        let first = self.to_encoding(&first);
        let second = second.map(|sequence| self.to_encoding(&sequence));
        let merged = self
            .tokenizer
            .post_process(first, second, add_special_tokens)
            .map_err(tokenizer_error)?;
        Ok(sequence_from(&merged))
    }
}

fn sequence_from(encoding: &Encoding) -> TokenSequence {
    TokenSequence {
        ids: encoding.get_ids().to_vec(),
        type_ids: encoding.get_type_ids().to_vec(),
        offsets: encoding.get_offsets().to_vec(),
        special_tokens_mask: encoding.get_special_tokens_mask().to_vec(),
    }
}

fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut bounds = Vec::new();
    let mut start = None;
    for (index, character) in text.char_indices() {
        match (character.is_whitespace(), start) {
            (true, Some(begin)) => {
                bounds.push((begin, index));
                start = None;
            },
            (false, None) => start = Some(index),
            _ => {},
        }
    }
    if let Some(begin) = start {
        bounds.push((begin, text.len()));
    }
    bounds
        .into_iter()
        .filter_map(|(begin, end)| text.get(begin..end).map(|word| (begin, word)))
        .collect()
}

fn tokenizer_error(error: impl fmt::Display) -> ErrorEnvelope {
    ErrorEnvelope::encoding("tokenizer_failed", format!("tokenizer error: {error}"))
}

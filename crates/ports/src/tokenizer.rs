//! Fast tokenizer boundary contract.

use onnx_transformers_shared::Result;

/// Token ids and per-token annotations of one sequence or sequence pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
    /// Vocabulary ids.
    pub ids: Vec<u32>,
    /// Segment ids (`0` for the first sequence, `1` for the second).
    pub type_ids: Vec<u32>,
    /// Character offsets into the source text.
    pub offsets: Vec<(usize, usize)>,
    /// `1` for injected special tokens and padding, `0` otherwise.
    pub special_tokens_mask: Vec<u32>,
}

impl TokenSequence {
    /// Build a sequence of regular tokens sharing one segment id.
    #[must_use]
    pub fn new(ids: Vec<u32>, offsets: Vec<(usize, usize)>, type_id: u32) -> Self {
        let len = ids.len();
        Self {
            ids,
            type_ids: vec![type_id; len],
            offsets,
            special_tokens_mask: vec![0; len],
        }
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true when there are no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Overwrite every segment id.
    #[must_use]
    pub fn with_type_id(mut self, type_id: u32) -> Self {
        self.type_ids.iter_mut().for_each(|value| *value = type_id);
        self
    }

    /// Copy of the tokens in `range`.
    #[must_use]
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        let pick = |values: &[u32]| values.get(range.clone()).unwrap_or_default().to_vec();
        Self {
            ids: pick(&self.ids),
            type_ids: pick(&self.type_ids),
            offsets: self
                .offsets
                .get(range.clone())
                .unwrap_or_default()
                .to_vec(),
            special_tokens_mask: pick(&self.special_tokens_mask),
        }
    }
}

/// Fast tokenizer used to segment text and inject special tokens.
pub trait FastTokenizerPort: Send + Sync {
    /// Segment text into tokens without special tokens.
    ///
    /// With `is_split_into_words` the text is a whitespace-separated word list
    /// and no further pre-tokenization splits words apart.
    fn segment(&self, text: &str, is_split_into_words: bool) -> Result<TokenSequence>;

    /// Number of special tokens added around a single sequence or a pair.
    fn num_special_tokens_to_add(&self, is_pair: bool) -> usize;

    /// Merge a sequence (and optional pair) and inject special tokens.
    ///
    /// With `add_special_tokens == false` the sequences are only concatenated.
    fn post_process(
        &self,
        first: TokenSequence,
        second: Option<TokenSequence>,
        add_special_tokens: bool,
    ) -> Result<TokenSequence>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_annotations() {
        let sequence = TokenSequence::new(vec![5, 6], vec![(0, 1), (2, 3)], 1);
        assert_eq!(sequence.type_ids, [1, 1]);
        assert_eq!(sequence.special_tokens_mask, [0, 0]);
        assert_eq!(sequence.len(), 2);
    }

    #[test]
    fn slice_copies_every_annotation() {
        let sequence = TokenSequence::new(vec![1, 2, 3], vec![(0, 1), (2, 3), (4, 5)], 0);
        let tail = sequence.slice(1..3);

        assert_eq!(tail.ids, [2, 3]);
        assert_eq!(tail.offsets, [(2, 3), (4, 5)]);
        assert_eq!(tail.type_ids.len(), 2);
        assert!(sequence.slice(5..9).is_empty());
    }
}

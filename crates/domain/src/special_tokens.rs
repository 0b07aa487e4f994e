//! Special-token discovery over tokenizer descriptors.
//!
//! Tokenizer descriptors come in several shapes: some carry a direct
//! `cls_token`/`pad_token` entry, others only list the token inside
//! `added_tokens`. Resolution checks the direct entry first and then falls
//! back to an ordered alias scan.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A resolved special token. Never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecialToken {
    /// Literal token text, e.g. `[CLS]`.
    pub content: String,
    /// Vocabulary id.
    pub id: u32,
}

impl SpecialToken {
    /// Build a special token.
    pub fn new(content: impl Into<String>, id: u32) -> Self {
        Self {
            content: content.into(),
            id,
        }
    }
}

/// Entry of the descriptor's `added_tokens` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedToken {
    /// Vocabulary id.
    pub id: u32,
    /// Literal token text.
    pub content: String,
    /// Whether the tokenizer treats the token as special.
    #[serde(default)]
    pub special: bool,
}

/// Direct role entry as found in descriptor files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenEntry {
    /// Bare content string, resolved through `added_tokens`.
    Content(String),
    /// Object form. Without an `id` it is resolved through `added_tokens`.
    Object {
        /// Literal token text.
        content: String,
        /// Vocabulary id, when the descriptor carries it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u32>,
    },
}

impl TokenEntry {
    /// Literal token text of the entry.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Content(content) | Self::Object { content, .. } => content,
        }
    }
}

/// Parsed `tokenizer.json` view used for special-token discovery.
///
/// Role entries are explicit; every other top-level key is kept untouched in
/// [`TokenizerDescriptor::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenizerDescriptor {
    /// Direct `cls_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls_token: Option<TokenEntry>,
    /// Direct `pad_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_token: Option<TokenEntry>,
    /// Direct `sep_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sep_token: Option<TokenEntry>,
    /// Direct `eos_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eos_token: Option<TokenEntry>,
    /// Direct `unk_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unk_token: Option<TokenEntry>,
    /// Direct `bos_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bos_token: Option<TokenEntry>,
    /// Direct `mask_token` entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_token: Option<TokenEntry>,
    /// Ordered added-token list.
    #[serde(default)]
    pub added_tokens: Vec<AddedToken>,
    /// Every other top-level key.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TokenizerDescriptor {
    /// Descriptor with only an added-token list.
    #[must_use]
    pub fn with_added_tokens(added_tokens: Vec<AddedToken>) -> Self {
        Self {
            added_tokens,
            ..Self::default()
        }
    }

    /// Look up a direct entry by key. Unknown keys are read from the side table.
    #[must_use]
    pub fn direct_entry(&self, key: &str) -> Option<TokenEntry> {
        let named = match key {
            "cls_token" => self.cls_token.as_ref(),
            "pad_token" => self.pad_token.as_ref(),
            "sep_token" => self.sep_token.as_ref(),
            "eos_token" => self.eos_token.as_ref(),
            "unk_token" => self.unk_token.as_ref(),
            "bos_token" => self.bos_token.as_ref(),
            "mask_token" => self.mask_token.as_ref(),
            _ => {
                return self
                    .extra
                    .get(key)
                    .and_then(|value| serde_json::from_value(value.clone()).ok());
            },
        };
        named.cloned()
    }

    fn added_token_by_content(&self, content: &str) -> Option<SpecialToken> {
        self.added_tokens
            .iter()
            .find(|token| token.content == content)
            .map(|token| SpecialToken::new(token.content.clone(), token.id))
    }
}

/// Special-token roles known to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialTokenRole {
    /// Classification token.
    Cls,
    /// Padding token.
    Pad,
    /// Separator token.
    Sep,
    /// End-of-sequence token.
    Eos,
    /// Unknown-word token.
    Unk,
    /// Beginning-of-sequence token.
    Bos,
    /// Mask token.
    Mask,
}

impl SpecialTokenRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Cls,
        Self::Pad,
        Self::Sep,
        Self::Eos,
        Self::Unk,
        Self::Bos,
        Self::Mask,
    ];

    /// Key of the direct descriptor entry.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cls => "cls_token",
            Self::Pad => "pad_token",
            Self::Sep => "sep_token",
            Self::Eos => "eos_token",
            Self::Unk => "unk_token",
            Self::Bos => "bos_token",
            Self::Mask => "mask_token",
        }
    }

    /// Alias contents scanned in `added_tokens`, in priority order.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Cls => &["[CLS]"],
            Self::Pad => &["[PAD]", "<pad>"],
            Self::Sep => &["[SEP]"],
            Self::Eos => &["[EOS]", "</s>"],
            Self::Unk => &["[UNK]", "<unk>"],
            Self::Bos => &["[BOS]"],
            Self::Mask => &["[MASK]", "<mask>"],
        }
    }
}

impl fmt::Display for SpecialTokenRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.key())
    }
}

/// Resolve a role against a descriptor.
#[must_use]
pub fn resolve(descriptor: &TokenizerDescriptor, role: SpecialTokenRole) -> Option<SpecialToken> {
    resolve_with_aliases(descriptor, role.key(), role.aliases())
}

/// Resolve a direct key, falling back to an alias scan over `added_tokens`.
///
/// The scan walks `added_tokens` in order and, for each entry, tries the
/// aliases in the supplied order. Returns `None` when nothing matches.
#[must_use]
pub fn resolve_with_aliases(
    descriptor: &TokenizerDescriptor,
    key: &str,
    aliases: &[&str],
) -> Option<SpecialToken> {
    if let Some(entry) = descriptor.direct_entry(key) {
        return match entry {
            TokenEntry::Object {
                content,
                id: Some(id),
            } => Some(SpecialToken::new(content, id)),
            TokenEntry::Object { content, id: None } | TokenEntry::Content(content) => {
                descriptor.added_token_by_content(&content)
            },
        };
    }

    descriptor.added_tokens.iter().find_map(|entry| {
        aliases
            .iter()
            .any(|alias| entry.content == *alias)
            .then(|| SpecialToken::new(entry.content.clone(), entry.id))
    })
}

/// Accessor view over a descriptor's special tokens.
#[derive(Debug, Clone, Copy)]
pub struct SpecialTokens<'a> {
    descriptor: &'a TokenizerDescriptor,
}

impl<'a> SpecialTokens<'a> {
    /// Wrap a descriptor.
    #[must_use]
    pub const fn new(descriptor: &'a TokenizerDescriptor) -> Self {
        Self { descriptor }
    }

    /// Resolve an arbitrary role.
    #[must_use]
    pub fn token(&self, role: SpecialTokenRole) -> Option<SpecialToken> {
        resolve(self.descriptor, role)
    }

    /// Resolve the id of an arbitrary role.
    #[must_use]
    pub fn token_id(&self, role: SpecialTokenRole) -> Option<u32> {
        self.token(role).map(|token| token.id)
    }

    /// Classification token.
    #[must_use]
    pub fn cls_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Cls)
    }

    /// Classification token id.
    #[must_use]
    pub fn cls_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Cls)
    }

    /// Padding token.
    #[must_use]
    pub fn pad_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Pad)
    }

    /// Padding token id.
    #[must_use]
    pub fn pad_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Pad)
    }

    /// Token type id used for padding positions. Always zero.
    #[must_use]
    pub const fn pad_token_type_id(&self) -> u32 {
        0
    }

    /// Separator token.
    #[must_use]
    pub fn sep_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Sep)
    }

    /// Separator token id.
    #[must_use]
    pub fn sep_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Sep)
    }

    /// End-of-sequence token.
    #[must_use]
    pub fn eos_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Eos)
    }

    /// End-of-sequence token id.
    #[must_use]
    pub fn eos_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Eos)
    }

    /// Unknown-word token.
    #[must_use]
    pub fn unk_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Unk)
    }

    /// Unknown-word token id.
    #[must_use]
    pub fn unk_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Unk)
    }

    /// Beginning-of-sequence token.
    #[must_use]
    pub fn bos_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Bos)
    }

    /// Beginning-of-sequence token id.
    #[must_use]
    pub fn bos_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Bos)
    }

    /// Mask token.
    #[must_use]
    pub fn mask_token(&self) -> Option<SpecialToken> {
        self.token(SpecialTokenRole::Mask)
    }

    /// Mask token id.
    #[must_use]
    pub fn mask_token_id(&self) -> Option<u32> {
        self.token_id(SpecialTokenRole::Mask)
    }
}

//! Text inputs accepted by encoder calls.

/// Caller input, resolved once at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    /// One sequence.
    Single(String),
    /// Several sequences.
    Batch(Vec<String>),
    /// One sequence pair.
    Pair(String, String),
    /// Several sequence pairs.
    BatchOfPairs(Vec<(String, String)>),
}

impl TextInput {
    /// Single items are squeezed on output.
    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::Single(_) | Self::Pair(..))
    }

    /// Returns true when items carry a second sequence.
    #[must_use]
    pub const fn is_paired(&self) -> bool {
        matches!(self, Self::Pair(..) | Self::BatchOfPairs(_))
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) | Self::Pair(..) => 1,
            Self::Batch(items) => items.len(),
            Self::BatchOfPairs(items) => items.len(),
        }
    }

    /// Returns true for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalise to a batch of `(first, second)` items.
    #[must_use]
    pub fn items(&self) -> Vec<(&str, Option<&str>)> {
        match self {
            Self::Single(text) => vec![(text.as_str(), None)],
            Self::Batch(items) => items.iter().map(|text| (text.as_str(), None)).collect(),
            Self::Pair(first, second) => vec![(first.as_str(), Some(second.as_str()))],
            Self::BatchOfPairs(items) => items
                .iter()
                .map(|(first, second)| (first.as_str(), Some(second.as_str())))
                .collect(),
        }
    }
}

impl From<&str> for TextInput {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for TextInput {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for TextInput {
    fn from(value: Vec<String>) -> Self {
        Self::Batch(value)
    }
}

impl From<Vec<&str>> for TextInput {
    fn from(value: Vec<&str>) -> Self {
        Self::Batch(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<(String, String)> for TextInput {
    fn from((first, second): (String, String)) -> Self {
        Self::Pair(first, second)
    }
}

impl From<(&str, &str)> for TextInput {
    fn from((first, second): (&str, &str)) -> Self {
        Self::Pair(first.to_owned(), second.to_owned())
    }
}

impl From<Vec<(String, String)>> for TextInput {
    fn from(value: Vec<(String, String)>) -> Self {
        Self::BatchOfPairs(value)
    }
}

impl From<Vec<(&str, &str)>> for TextInput {
    fn from(value: Vec<(&str, &str)>) -> Self {
        Self::BatchOfPairs(
            value
                .into_iter()
                .map(|(first, second)| (first.to_owned(), second.to_owned()))
                .collect(),
        )
    }
}

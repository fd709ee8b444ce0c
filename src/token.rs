use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tiktoken_rs::{CoreBPE, get_bpe_from_model};

/// Model whose vocabulary is used when none is configured.
pub const DEFAULT_TOKENIZER_MODEL: &str = "text-davinci-002";

const SIMPLE_CHARS_PER_TOKEN: usize = 4;

// Encoders are immutable once built; the lock only guards insertion.
static ENCODERS: Lazy<Mutex<HashMap<String, Arc<CoreBPE>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Type of tokenizer to use for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Byte-pair encoding with the vocabulary of a named model
    #[default]
    Bpe,
    /// Character-based heuristic (~4 chars per token), needs no vocabulary
    Simple,
}

impl TokenizerKind {
    /// Creates a token counter of this kind.
    ///
    /// `model` selects the vocabulary for [`TokenizerKind::Bpe`] and is ignored
    /// by [`TokenizerKind::Simple`].
    ///
    /// # Errors
    ///
    /// Returns an error if no vocabulary is known for `model`.
    pub fn create(self, model: &str) -> Result<Arc<dyn TokenCounter>> {
        match self {
            Self::Bpe => Ok(Arc::new(BpeTokenizer::for_model(model)?)),
            Self::Simple => Ok(Arc::new(SimpleTokenizer)),
        }
    }
}

/// Counts tokens in text.
///
/// Implementations must be deterministic: the same text always yields the
/// same count.
pub trait TokenCounter: Send + Sync {
    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Tokenizer backed by a model's byte-pair vocabulary.
#[derive(Clone)]
pub struct BpeTokenizer {
    model: String,
    bpe: Arc<CoreBPE>,
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl BpeTokenizer {
    /// Returns a tokenizer for `model`, building its encoder on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the model name does not map to a known vocabulary.
    pub fn for_model(model: &str) -> Result<Self> {
        let mut cache = ENCODERS
            .lock()
            .map_err(|_| Error::tokenizer(model, "encoder cache poisoned"))?;

        let bpe = if let Some(bpe) = cache.get(model) {
            Arc::clone(bpe)
        } else {
            let bpe = Arc::new(get_bpe_from_model(model).map_err(|e| Error::tokenizer(model, e))?);
            cache.insert(model.to_string(), Arc::clone(&bpe));
            bpe
        };

        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }

    /// Returns the model whose vocabulary this tokenizer uses.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for BpeTokenizer {
    fn count(&self, text: &str) -> usize {
        // Ordinary encoding: special-token markup counts as plain text
        self.bpe.encode_ordinary(text).len()
    }
}

/// Simple character-based tokenizer.
///
/// Uses a heuristic of approximately 4 characters per token.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimpleTokenizer;

impl TokenCounter for SimpleTokenizer {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count();
        char_count
            .saturating_add(SIMPLE_CHARS_PER_TOKEN - 1)
            .saturating_div(SIMPLE_CHARS_PER_TOKEN)
            .max(1)
    }
}

/// Counts tokens in `text` with the default model vocabulary.
///
/// # Errors
///
/// Returns an error if the default vocabulary cannot be loaded.
pub fn count_tokens(text: &str) -> Result<usize> {
    Ok(BpeTokenizer::for_model(DEFAULT_TOKENIZER_MODEL)?.count(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokenizer_empty() {
        assert_eq!(SimpleTokenizer.count(""), 0);
    }

    #[test]
    fn test_simple_tokenizer_basic() {
        assert_eq!(SimpleTokenizer.count("test"), 1); // 4 chars = 1 token
        assert_eq!(SimpleTokenizer.count("hello world"), 3); // 11 chars = 3 tokens
    }

    #[test]
    fn test_simple_tokenizer_counts_chars_not_bytes() {
        assert_eq!(SimpleTokenizer.count("éééé"), 1);
    }

    #[test]
    fn test_bpe_token_count_is_stable() {
        assert_eq!(count_tokens("hello world").unwrap(), 2);
        assert_eq!(count_tokens("").unwrap(), 0);
    }

    #[test]
    fn test_bpe_is_deterministic() {
        let text = "Transformers rely on self-attention over token sequences.";
        let first = count_tokens(text).unwrap();
        let second = BpeTokenizer::for_model(DEFAULT_TOKENIZER_MODEL)
            .unwrap()
            .count(text);
        assert_eq!(first, second);
        assert!(first > 5);
    }

    #[test]
    fn test_special_tokens_are_ordinary_text() {
        let tokenizer = BpeTokenizer::for_model(DEFAULT_TOKENIZER_MODEL).unwrap();
        assert!(tokenizer.count("<|endoftext|>") > 1);
    }

    #[test]
    fn test_unknown_model_is_error() {
        let err = BpeTokenizer::for_model("definitely-not-a-model").unwrap_err();
        assert!(matches!(err, Error::Tokenizer { .. }));
    }

    #[test]
    fn test_kind_create() {
        let simple = TokenizerKind::Simple.create("ignored").unwrap();
        assert_eq!(simple.count("abcdefgh"), 2);

        let bpe = TokenizerKind::Bpe.create(DEFAULT_TOKENIZER_MODEL).unwrap();
        assert_eq!(bpe.count("hello world"), 2);
    }
}

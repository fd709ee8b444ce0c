//! Packs leading pages of a document into a token budget.

use crate::error::{Error, Result};
use crate::pdf::PageSource;
use crate::token::TokenCounter;
use serde::Deserialize;
use tracing::{debug, warn};

/// Token budget for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Total tokens available per document
    pub token_limit: usize,

    /// Headroom subtracted from every budget check
    pub buffer_tokens: usize,
}

impl Budget {
    /// Creates a budget.
    #[must_use]
    pub const fn new(token_limit: usize, buffer_tokens: usize) -> Self {
        Self {
            token_limit,
            buffer_tokens,
        }
    }

    /// Width of one segment, in characters.
    #[must_use]
    pub const fn segment_size(&self) -> usize {
        self.token_limit.saturating_sub(self.buffer_tokens)
    }

    /// Returns true if `page_tokens` more tokens fit after `tokens_read`.
    #[must_use]
    pub const fn admits(&self, tokens_read: usize, page_tokens: usize) -> bool {
        tokens_read
            .saturating_add(page_tokens)
            .saturating_add(self.buffer_tokens)
            <= self.token_limit
    }
}

/// What to do with a page that has no extractable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTextPolicy {
    /// Treat the page as empty text (zero tokens) and log a warning
    #[default]
    Empty,
    /// Fail the document with an extraction error
    Fail,
}

/// Result of packing pages into a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulation {
    /// Trimmed page texts, each followed by a newline
    pub text: String,

    /// Number of leading pages included
    pub pages_used: usize,

    /// Tokens counted for the included pages
    pub tokens: usize,

    /// Number of pages in the source
    pub total_pages: usize,

    /// 0-based indices of included pages that had no text
    pub pages_without_text: Vec<usize>,
}

impl Accumulation {
    /// Returns true if some pages were left out.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.pages_used < self.total_pages
    }
}

/// Accumulates the longest prefix of `pages` that fits in `budget`.
///
/// Pages are taken in order. The first page whose tokens, added to the tokens
/// already read and the buffer, would exceed the limit ends the accumulation;
/// later pages are never considered, even if they are smaller.
///
/// # Errors
///
/// Returns an error if a page cannot be extracted, or has no text and
/// `policy` is [`MissingTextPolicy::Fail`].
pub fn accumulate<S>(
    pages: &S,
    counter: &dyn TokenCounter,
    budget: Budget,
    policy: MissingTextPolicy,
) -> Result<Accumulation>
where
    S: PageSource + ?Sized,
{
    let total_pages = pages.page_count();
    let mut text = String::new();
    let mut tokens_read = 0usize;
    let mut pages_processed = 0usize;
    let mut pages_without_text = Vec::new();

    // No room left after the buffer: even zero-token pages are not taken
    let has_room = budget.segment_size() > 0;
    if !has_room {
        debug!(
            "Buffer of {} tokens leaves no room under limit {}",
            budget.buffer_tokens, budget.token_limit
        );
    }

    while has_room && tokens_read < budget.token_limit && pages_processed < total_pages {
        let page_text = match pages.extract_text(pages_processed)? {
            Some(page_text) => page_text,
            None => match policy {
                MissingTextPolicy::Empty => {
                    warn!(
                        "Page {} of '{}' has no text; treating it as empty",
                        pages_processed + 1,
                        pages.origin().display()
                    );
                    pages_without_text.push(pages_processed);
                    String::new()
                }
                MissingTextPolicy::Fail => {
                    return Err(Error::extraction(
                        pages.origin(),
                        pages_processed + 1,
                        "page has no extractable text",
                    ));
                }
            },
        };

        let page_tokens = counter.count(&page_text);

        if !budget.admits(tokens_read, page_tokens) {
            debug!(
                "Page {} ({} tokens) does not fit: {} read, limit {}, buffer {}",
                pages_processed + 1,
                page_tokens,
                tokens_read,
                budget.token_limit,
                budget.buffer_tokens
            );
            // A rejected page was never included
            if pages_without_text.last() == Some(&pages_processed) {
                pages_without_text.pop();
            }
            break;
        }

        text.push_str(page_text.trim());
        text.push('\n');
        tokens_read += page_tokens;
        pages_processed += 1;

        debug!(
            "Page {}/{}: {} tokens ({} total)",
            pages_processed, total_pages, page_tokens, tokens_read
        );
    }

    let accumulation = Accumulation {
        text,
        pages_used: pages_processed,
        tokens: tokens_read,
        total_pages,
        pages_without_text,
    };

    if accumulation.is_truncated() {
        warn!(
            "'{}': token budget reached after {}/{} pages; remaining pages are not summarized",
            pages.origin().display(),
            accumulation.pages_used,
            accumulation.total_pages
        );
    }

    Ok(accumulation)
}

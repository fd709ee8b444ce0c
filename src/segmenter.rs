use crate::accumulator::Budget;
use crate::error::{Error, Result};

/// Fixed-width character windows over a text.
///
/// Every segment except possibly the last is exactly `size` characters
/// (Unicode scalar values) long. An empty text yields a single empty segment.
/// The iterator is restartable: clone it before consuming to walk the
/// segments again.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    size: usize,
    // byte offset of the next segment
    pos: usize,
    emitted_empty: bool,
}

impl<'a> Segments<'a> {
    /// Width of each segment in characters.
    #[must_use]
    pub const fn segment_size(&self) -> usize {
        self.size
    }

    /// Text being segmented.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.text.is_empty() {
            if self.emitted_empty {
                return None;
            }
            self.emitted_empty = true;
            return Some("");
        }

        if self.pos >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.pos..];
        let end = rest
            .char_indices()
            .nth(self.size)
            .map_or(self.text.len(), |(offset, _)| self.pos + offset);

        let segment = &self.text[self.pos..end];
        self.pos = end;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.text.is_empty() {
            usize::from(!self.emitted_empty)
        } else {
            segment_count(self.text[self.pos..].chars().count(), self.size)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments<'_> {}

/// Number of segments produced for a text of `char_len` characters.
///
/// An empty text still produces one (empty) segment.
#[must_use]
pub const fn segment_count(char_len: usize, size: usize) -> usize {
    if char_len == 0 {
        return 1;
    }
    if size == 0 {
        return 0;
    }
    char_len.div_ceil(size)
}

/// Splits `text` into windows of `budget.segment_size()` characters.
///
/// The segment width is measured in characters even though it is derived
/// from a token budget.
///
/// # Errors
///
/// Returns an error if the segment size is zero and `text` is not empty.
pub fn segment(text: &str, budget: Budget) -> Result<Segments<'_>> {
    let size = budget.segment_size();
    if size == 0 && !text.is_empty() {
        return Err(Error::config(format!(
            "segment size is zero (token_limit {} - buffer_tokens {}) but {} characters need summarizing",
            budget.token_limit,
            budget.buffer_tokens,
            text.chars().count()
        )));
    }

    Ok(Segments {
        text,
        size,
        pos: 0,
        emitted_empty: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str, limit: usize, buffer: usize) -> Vec<&str> {
        segment(text, Budget::new(limit, buffer)).unwrap().collect()
    }

    #[test]
    fn test_250_chars_into_100() {
        let text = "x".repeat(250);
        let lengths: Vec<usize> = collect(&text, 110, 10).iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![100, 100, 50]);
    }

    #[test]
    fn test_exact_multiple() {
        let text = "abcdef";
        assert_eq!(collect(text, 3, 0), vec!["abc", "def"]);
    }

    #[test]
    fn test_shorter_than_segment() {
        assert_eq!(collect("abc", 10, 0), vec!["abc"]);
    }

    #[test]
    fn test_empty_text_yields_one_empty_segment() {
        assert_eq!(collect("", 10, 2), vec![""]);
    }

    #[test]
    fn test_zero_size_with_empty_text() {
        assert_eq!(collect("", 10, 10), vec![""]);
    }

    #[test]
    fn test_zero_size_with_text_is_error() {
        let err = segment("abc", Budget::new(10, 10)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "héllo wörld";
        let segments = collect(text, 4, 0);
        assert_eq!(segments, vec!["héll", "o wö", "rld"]);
    }

    #[test]
    fn test_restartable() {
        let segments = segment("abcdefg", Budget::new(3, 0)).unwrap();
        let first: Vec<_> = segments.clone().collect();
        let second: Vec<_> = segments.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exact_size() {
        let mut segments = segment("abcdefg", Budget::new(3, 0)).unwrap();
        assert_eq!(segments.len(), 3);
        segments.next();
        assert_eq!(segments.len(), 2);

        let mut empty = segment("", Budget::new(3, 0)).unwrap();
        assert_eq!(empty.len(), 1);
        empty.next();
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count(0, 100), 1);
        assert_eq!(segment_count(250, 100), 3);
        assert_eq!(segment_count(200, 100), 2);
        assert_eq!(segment_count(1, 100), 1);
    }
}

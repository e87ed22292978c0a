//! Caption segmentation into wrap-safe word units.
//!
//! Every segmenter upholds the coverage rule: concatenating the produced
//! units in order yields the input exactly, nothing added or dropped.

use icu_segmenter::{options::WordBreakInvariantOptions, WordSegmenter};

/// A contiguous slice of the caption treated as one atomic wrap token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordUnit {
    /// Byte offset of the unit inside the caption
    pub start: usize,
    pub text: String,
}

impl WordUnit {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Rebuild the caption from its units.
pub fn reassemble(units: &[WordUnit]) -> String {
    units.iter().map(WordUnit::as_str).collect()
}

/// Boundary placement strategy.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<WordUnit>;
}

/// Dictionary/LSTM backed word segmentation from ICU4X.
///
/// Scripts without spaces (Japanese, Chinese, Thai, ...) are split by the
/// bundled models. Segments that are not word-like (whitespace, punctuation)
/// are glued onto the preceding unit so a line never starts with them; leading
/// ones are carried onto the first word.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuSegmenter;

impl IcuSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for IcuSegmenter {
    fn segment(&self, text: &str) -> Vec<WordUnit> {
        if text.is_empty() {
            return Vec::new();
        }

        let segmenter = WordSegmenter::new_auto(WordBreakInvariantOptions::default());
        let boundaries: Vec<_> = segmenter.segment_str(text).iter_with_word_type().collect();

        let mut units: Vec<WordUnit> = Vec::new();
        let mut pending_start: Option<usize> = None;

        for pair in boundaries.windows(2) {
            let (start, _) = pair[0];
            let (end, word_type) = pair[1];
            if start >= end {
                continue;
            }
            let piece = &text[start..end];

            if word_type.is_word_like() {
                let unit_start = pending_start.take().unwrap_or(start);
                units.push(WordUnit {
                    start: unit_start,
                    text: text[unit_start..end].to_string(),
                });
            } else if let Some(last) = units.last_mut() {
                last.text.push_str(piece);
            } else if pending_start.is_none() {
                pending_start = Some(start);
            }
        }

        // Caption made only of separators/punctuation.
        if let Some(start) = pending_start {
            units.push(WordUnit {
                start,
                text: text[start..].to_string(),
            });
        }

        units
    }
}

/// Breaks after each run of whitespace; the whitespace stays on the unit
/// before the break. Useful for Latin-only captions or when no model data is
/// wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> Vec<WordUnit> {
        let mut units = Vec::new();
        let mut start = 0usize;
        let mut prev_ws = false;

        for (idx, ch) in text.char_indices() {
            let ws = ch.is_whitespace();
            if prev_ws && !ws && idx > start {
                units.push(WordUnit {
                    start,
                    text: text[start..idx].to_string(),
                });
                start = idx;
            }
            prev_ws = ws;
        }
        if start < text.len() {
            units.push(WordUnit {
                start,
                text: text[start..].to_string(),
            });
        }
        units
    }
}

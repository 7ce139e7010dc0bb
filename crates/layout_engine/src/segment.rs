//! Text segmentation for line breaking
//!
//! A text run inside an expression may only be broken between the units a
//! [`TextSegmenter`] returns. The default [`UnicodeSegmenter`] works on
//! UAX #29 word boundaries and grapheme clusters.

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into units that must not be broken across lines
pub trait TextSegmenter: Send + Sync {
    /// Byte ranges of the units of `text`, in order, covering all of it
    fn segment(&self, text: &str) -> Vec<Range<usize>>;

    /// The units of `text` as string slices
    fn units<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.segment(text)
            .into_iter()
            .filter_map(|range| text.get(range))
            .collect()
    }
}

/// Script classes that change how text may be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    /// Han, Hiragana, Katakana, Hangul: breakable between any two clusters
    Cjk,
    /// Everything else: breakable at whitespace only
    Other,
}

impl Script {
    /// Script class of a character
    pub fn of(ch: char) -> Self {
        match ch {
            '\u{1100}'..='\u{11FF}' => Script::Cjk, // Hangul Jamo
            '\u{3040}'..='\u{309F}' => Script::Cjk, // Hiragana
            '\u{30A0}'..='\u{30FF}' => Script::Cjk, // Katakana
            '\u{3400}'..='\u{4DBF}' => Script::Cjk, // CJK Extension A
            '\u{4E00}'..='\u{9FFF}' => Script::Cjk, // CJK Unified Ideographs
            '\u{AC00}'..='\u{D7AF}' => Script::Cjk, // Hangul Syllables
            '\u{F900}'..='\u{FAFF}' => Script::Cjk, // CJK Compatibility Ideographs
            '\u{20000}'..='\u{2A6DF}' => Script::Cjk, // CJK Extension B
            _ => Script::Other,
        }
    }

    /// Script class of the first character of `text`
    pub fn detect(text: &str) -> Self {
        text.chars().next().map(Script::of).unwrap_or(Script::Other)
    }
}

/// Segmenter following Unicode word and grapheme boundaries
///
/// - CJK text breaks between any two grapheme clusters.
/// - Other text breaks only where whitespace ends; the whitespace stays
///   with the unit before it.
/// - Punctuation never starts a unit when something precedes it.
/// - Numbers such as `3,14` or `1,000,000` are single words and never split.
/// - Grapheme clusters (emoji sequences, combining marks) are never split.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl UnicodeSegmenter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Whitespace,
    Cjk,
    Word,
}

impl TextSegmenter for UnicodeSegmenter {
    fn segment(&self, text: &str) -> Vec<Range<usize>> {
        let mut units: Vec<Range<usize>> = Vec::new();
        let mut tail: Option<Tail> = None;

        for (start, piece) in text.split_word_bound_indices() {
            let end = start + piece.len();

            if piece.chars().all(char::is_whitespace) {
                match units.last_mut() {
                    Some(unit) => unit.end = end,
                    None => units.push(start..end),
                }
                tail = Some(Tail::Whitespace);
                continue;
            }

            if Script::detect(piece) == Script::Cjk {
                for (offset, cluster) in piece.grapheme_indices(true) {
                    units.push(start + offset..start + offset + cluster.len());
                }
                tail = Some(Tail::Cjk);
                continue;
            }

            let is_punctuation = !piece.chars().any(char::is_alphanumeric);
            let glue = match tail {
                Some(Tail::Word) => true,
                Some(Tail::Cjk) => is_punctuation,
                Some(Tail::Whitespace) | None => false,
            };
            match units.last_mut() {
                Some(unit) if glue => unit.end = end,
                _ => units.push(start..end),
            }
            tail = Some(Tail::Word);
        }

        units
    }
}

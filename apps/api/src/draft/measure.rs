//! Length measurement — the one place that knows how prose length is counted.

use serde::{Deserialize, Serialize};

/// The unit a length contract is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    /// Count of CJK code points (ideographs, kana, hangul).
    #[serde(rename = "cjk-char", alias = "cjk_char", alias = "cjkchar")]
    CjkChar,
    /// Count of non-whitespace characters.
    #[serde(rename = "generic-char", alias = "generic_char", alias = "char")]
    GenericChar,
    /// Count of whitespace-delimited tokens.
    #[serde(rename = "word")]
    Word,
}

impl LengthUnit {
    /// Loose string form used during spec coercion.
    pub fn parse(s: &str) -> Option<LengthUnit> {
        match s.trim().to_lowercase().as_str() {
            "cjk-char" | "cjk_char" | "cjkchar" => Some(LengthUnit::CjkChar),
            "generic-char" | "generic_char" | "char" => Some(LengthUnit::GenericChar),
            "word" | "words" => Some(LengthUnit::Word),
            _ => None,
        }
    }

    /// Human-readable unit name for prompts.
    pub fn label(self) -> &'static str {
        match self {
            LengthUnit::CjkChar => "Chinese characters",
            LengthUnit::GenericChar => "characters",
            LengthUnit::Word => "words",
        }
    }
}

/// Measures `text` in the given unit.
pub fn measure(text: &str, unit: LengthUnit) -> usize {
    match unit {
        LengthUnit::Word => text.split_whitespace().count(),
        LengthUnit::CjkChar => text.chars().filter(|&c| is_cjk_char(c)).count(),
        LengthUnit::GenericChar => text.chars().filter(|c| !c.is_whitespace()).count(),
    }
}

/// CJK code point check: unified ideographs (plus extension A and
/// compatibility block), kana, and hangul syllables.
pub fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_whitespace_tokens() {
        assert_eq!(measure("one two  three\nfour", LengthUnit::Word), 4);
        assert_eq!(measure("", LengthUnit::Word), 0);
    }

    #[test]
    fn test_cjk_count_ignores_latin_and_punctuation() {
        // 7 ideographs (光合作用 + 是 + 过程), punctuation and ASCII excluded
        assert_eq!(measure("光合作用，是 photo 过程。", LengthUnit::CjkChar), 7);
    }

    #[test]
    fn test_cjk_count_includes_kana_and_hangul() {
        assert_eq!(measure("ひらがな 한글", LengthUnit::CjkChar), 6);
    }

    #[test]
    fn test_generic_count_skips_whitespace() {
        assert_eq!(measure("a b\tc\nd", LengthUnit::GenericChar), 4);
    }

    #[test]
    fn test_unit_parse_loose_forms() {
        assert_eq!(LengthUnit::parse("Word"), Some(LengthUnit::Word));
        assert_eq!(LengthUnit::parse("cjk_char"), Some(LengthUnit::CjkChar));
        assert_eq!(LengthUnit::parse("generic-char"), Some(LengthUnit::GenericChar));
        assert_eq!(LengthUnit::parse("syllable"), None);
    }
}

//! Draft sanitization — applied after every generate/repair/adjust call.
//!
//! The model regularly wraps prose in apologies, preambles, premature
//! concluding transitions, or stray citations. Sanitization strips these
//! before validation so the validator judges the actual content.

/// Boilerplate openers that are meta-commentary, not content. A line whose
/// trimmed start matches one of these is dropped.
const META_PHRASES: &[&str] = &[
    "I'm sorry",
    "I am sorry",
    "I apologize",
    "I apologise",
    "As an AI",
    "As a language model",
    "I cannot continue",
    "I can't continue",
    "I cannot comply",
    "Sure, here",
    "Sure! Here",
    "Certainly, here",
    "Certainly! Here",
    "Here is the paragraph",
    "Here's the paragraph",
    "Here is your paragraph",
    "抱歉",
    "很抱歉",
    "作为AI",
    "作为一个AI",
    "作为人工智能",
    "无法继续",
    "以下是",
];

/// Concluding transitions stripped from the start of non-conclusion text.
const CONCLUDING_TRANSITIONS: &[&str] = &[
    "In conclusion,",
    "In conclusion",
    "To conclude,",
    "To sum up,",
    "In summary,",
    "Overall,",
    "综上所述，",
    "综上所述",
    "总而言之，",
    "总之，",
    "最后，",
];

/// Drops meta-commentary lines and code fences, keeping the prose.
pub fn strip_meta_phrases(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let t = line.trim();
            if t.starts_with("```") {
                return false;
            }
            !META_PHRASES.iter().any(|p| t.starts_with(p))
        })
        .collect();
    kept.join("\n").trim().to_string()
}

/// Strips one leading concluding-transition phrase. Only applied to
/// non-conclusion sections; a conclusion is allowed to open this way.
pub fn strip_leading_concluding_transition(text: &str) -> String {
    let trimmed = text.trim_start();
    for phrase in CONCLUDING_TRANSITIONS {
        if let Some(rest) = trimmed.strip_prefix(phrase) {
            return rest.trim_start().to_string();
        }
    }
    text.to_string()
}

/// Collapses multi-line text into a single paragraph. CJK text joins
/// without a separator (no inter-word spaces); other scripts join with one
/// space.
pub fn collapse_to_single_paragraph(text: &str, is_cjk: bool) -> String {
    let separator = if is_cjk { "" } else { " " };
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// True if `text` contains a citation-shaped substring: a bracketed numeric
/// reference like `[12]`, or a parenthesized segment carrying a four-digit
/// year like `(Smith, 2020)` / `（王，2020）`.
pub fn contains_citation(text: &str) -> bool {
    !find_citation_ranges(text).is_empty()
}

/// Removes citation-shaped substrings, then tidies doubled spaces left
/// behind by the removal.
pub fn strip_citations(text: &str) -> String {
    let ranges = find_citation_ranges(text);
    if ranges.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in ranges {
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    let mut tidied = String::with_capacity(out.len());
    let mut prev_space = false;
    for c in out.chars() {
        if c == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        tidied.push(c);
    }
    // A removed citation often leaves " ." or " ," behind.
    tidied
        .replace(" .", ".")
        .replace(" ,", ",")
        .trim()
        .to_string()
}

/// Byte ranges of citation-shaped substrings, in order, non-overlapping.
fn find_citation_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        let close = match c {
            '[' => Some(']'),
            '(' => Some(')'),
            '（' => Some('）'),
            _ => None,
        };
        if let Some(close) = close {
            if let Some(j) = chars[i + 1..].iter().position(|&(_, cc)| cc == close) {
                let j = i + 1 + j;
                let inner: String = chars[i + 1..j].iter().map(|&(_, cc)| cc).collect();
                let end = chars[j].0 + chars[j].1.len_utf8();
                let is_citation = if c == '[' {
                    !inner.is_empty() && inner.chars().all(|cc| cc.is_ascii_digit())
                } else {
                    contains_four_digit_year(&inner)
                };
                if is_citation {
                    ranges.push((start, end));
                    i = j + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    ranges
}

fn contains_four_digit_year(s: &str) -> bool {
    let digits: Vec<bool> = s.chars().map(|c| c.is_ascii_digit()).collect();
    let chars: Vec<char> = s.chars().collect();
    for i in 0..chars.len() {
        if i + 4 <= chars.len() && digits[i..i + 4].iter().all(|&d| d) {
            let bounded_left = i == 0 || !digits[i - 1];
            let bounded_right = i + 4 == chars.len() || !digits[i + 4];
            if bounded_left && bounded_right {
                let year: String = chars[i..i + 4].iter().collect();
                if let Ok(y) = year.parse::<u32>() {
                    if (1500..=2099).contains(&y) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

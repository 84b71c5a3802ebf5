//! Paragraph validator — measures a candidate text against its
//! [`ParagraphSpec`] and reports every violated check. Never short-circuits:
//! the repair prompt needs the full violation list, not just the first one.

use serde::Serialize;

use crate::draft::measure::measure;
use crate::draft::sanitize::contains_citation;
use crate::draft::spec::ParagraphSpec;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    LengthOutOfRange {
        measured: usize,
        min: usize,
        max: usize,
    },
    MultipleParagraphs {
        count: usize,
    },
    LineBreakPresent,
    HeadingPresent,
    BulletPresent,
    CitationPresent,
}

impl Violation {
    /// Human-readable form enumerated in the repair prompt.
    pub fn describe(&self) -> String {
        match self {
            Violation::LengthOutOfRange { measured, min, max } => format!(
                "length is {measured} but must be between {min} and {max}"
            ),
            Violation::MultipleParagraphs { count } => {
                format!("text has {count} paragraphs but must be a single paragraph")
            }
            Violation::LineBreakPresent => "text contains line breaks, which are not allowed".to_string(),
            Violation::HeadingPresent => "text contains a heading, which is not allowed".to_string(),
            Violation::BulletPresent => "text contains a bullet list, which is not allowed".to_string(),
            Violation::CitationPresent => "text contains a citation, which is not allowed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub measured_length: usize,
    pub paragraph_count: usize,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// A pass-through result for text accepted without a spec (legacy path).
    pub fn unchecked(measured_length: usize, paragraph_count: usize) -> Self {
        Self {
            is_valid: true,
            measured_length,
            paragraph_count,
            violations: vec![],
        }
    }

    /// True when the only thing wrong is the length — the precondition for
    /// the dedicated length-adjust pass.
    pub fn purely_length_violation(&self) -> bool {
        !self.is_valid
            && self
                .violations
                .iter()
                .all(|v| matches!(v, Violation::LengthOutOfRange { .. }))
    }
}

/// Checks `text` against `spec`, reporting every violated check.
pub fn validate(text: &str, spec: &ParagraphSpec) -> ValidationResult {
    let measured_length = measure(text, spec.unit);
    let paragraph_count = count_paragraphs(text);
    let mut violations = Vec::new();

    let (min, max) = spec.length_range();
    if measured_length < min || measured_length > max {
        violations.push(Violation::LengthOutOfRange {
            measured: measured_length,
            min,
            max,
        });
    }

    if spec.single_paragraph_only && paragraph_count > 1 {
        violations.push(Violation::MultipleParagraphs {
            count: paragraph_count,
        });
    }

    if !spec.allow_line_breaks && text.trim().contains('\n') {
        violations.push(Violation::LineBreakPresent);
    }

    if !spec.allow_headings && text.lines().any(is_heading_line) {
        violations.push(Violation::HeadingPresent);
    }

    if !spec.allow_bullets && text.lines().any(is_bullet_line) {
        violations.push(Violation::BulletPresent);
    }

    if !spec.allow_citations && contains_citation(text) {
        violations.push(Violation::CitationPresent);
    }

    ValidationResult {
        is_valid: violations.is_empty(),
        measured_length,
        paragraph_count,
        violations,
    }
}

/// Paragraphs are blocks separated by at least one blank line.
pub fn count_paragraphs(text: &str) -> usize {
    let mut count = 0;
    let mut in_block = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            in_block = false;
        } else if !in_block {
            count += 1;
            in_block = true;
        }
    }
    count
}

fn is_heading_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('#')
}

fn is_bullet_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("- ") || t.starts_with("* ") || t.starts_with("• ")
}

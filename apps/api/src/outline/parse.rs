//! Outline parsing and structural normalization — header canonicalization,
//! section splitting, positional role assignment, subtitle attachment, and
//! body clipping.
//!
//! Every function here is a pure transformation over an immutable section
//! list; the engine threads the list through them in order.

use crate::language::Language;
use crate::outline::bullets::{is_bullet_line, is_rationale_line};
use crate::outline::{OutlineSection, SectionRole};

/// Parses a canonical ordinal header (either language) into its ordinal and
/// remaining title text (budget suffix still attached).
pub fn canonical_header(line: &str) -> Option<(u32, String)> {
    let t = line.trim();
    if let Some(rest) = t.strip_prefix("Section ") {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            let after = &rest[digits.len()..];
            if let Some(title) = after.strip_prefix(':').or_else(|| after.strip_prefix('：')) {
                return Some((digits.parse().ok()?, title.trim().to_string()));
            }
        }
    }
    if let Some(rest) = t.strip_prefix('第') {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            let after = &rest[digits.len()..];
            if let Some(after) = after.strip_prefix("部分") {
                let title = after
                    .strip_prefix('：')
                    .or_else(|| after.strip_prefix(':'))
                    .unwrap_or(after);
                return Some((digits.parse().ok()?, title.trim().to_string()));
            }
        }
    }
    None
}

/// Strips a trailing budget suffix — `(200 words)` or `（约200字）` — from a
/// header title. Returns the title unchanged when no suffix is present.
pub fn strip_budget_suffix(title: &str) -> String {
    let t = title.trim_end();
    for (open, close) in [('(', ')'), ('（', '）')] {
        if t.ends_with(close) {
            if let Some(start) = t.rfind(open) {
                let inner = &t[start + open.len_utf8()..t.len() - close.len_utf8()];
                if is_budget_suffix(inner) {
                    return t[..start].trim_end().to_string();
                }
            }
        }
    }
    t.to_string()
}

/// Reads the budget out of a header title's suffix, if present.
pub fn parse_budget_suffix(title: &str) -> Option<u32> {
    let t = title.trim_end();
    for (open, close) in [('(', ')'), ('（', '）')] {
        if t.ends_with(close) {
            if let Some(start) = t.rfind(open) {
                let inner = &t[start + open.len_utf8()..t.len() - close.len_utf8()];
                if is_budget_suffix(inner) {
                    let digits: String = inner.chars().filter(|c| c.is_ascii_digit()).collect();
                    return digits.parse().ok();
                }
            }
        }
    }
    None
}

fn is_budget_suffix(inner: &str) -> bool {
    let inner = inner.trim();
    let rest = inner.strip_prefix('约').unwrap_or(inner);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    let tail = rest[digits.len()..].trim();
    matches!(tail, "words" | "word" | "字" | "chars" | "characters")
}

/// Rewrites alternate header markers (markdown heads, bold-line titles,
/// bare numeric ordinals) into canonical ordinal-header form with a running
/// counter. Non-header lines pass through untouched.
pub fn normalize_headers(raw: &str, language: Language) -> String {
    let mut counter: u32 = 0;
    let mut out: Vec<String> = Vec::new();
    for line in raw.lines() {
        if let Some(title) = header_title(line) {
            counter += 1;
            out.push(language.format_header_plain(counter, &title));
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

/// Recognizes a header-shaped line and returns its title text.
fn header_title(line: &str) -> Option<String> {
    let t = line.trim();
    if t.is_empty() {
        return None;
    }
    // Already-canonical ordinal headers are re-numbered too, so a model
    // that restarts numbering mid-outline still yields a monotone sequence.
    if let Some((_, title)) = canonical_header(t) {
        return Some(title);
    }
    // Markdown headings.
    if t.starts_with('#') {
        let title = t.trim_start_matches('#').trim();
        if !title.is_empty() {
            return Some(title.to_string());
        }
        return None;
    }
    // Whole-line bold titles.
    if t.len() > 4 && t.starts_with("**") && t.ends_with("**") {
        let title = t[2..t.len() - 2].trim();
        if !title.is_empty() {
            return Some(title.to_string());
        }
        return None;
    }
    // "Part N" ordinals.
    if let Some(rest) = t.strip_prefix("Part ") {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            let title = rest[digits.len()..]
                .trim_start_matches(&[':', '：', '.'][..])
                .trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    // Bare numeric ordinals: "1. Title", "2、Title", "3: Title". The outline
    // prompt mandates dash bullets, so a numbered top-level line is a header.
    let digits: String = t.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() && digits.len() <= 2 {
        let after = &t[digits.len()..];
        for delim in [". ", "、", "：", ": "] {
            if let Some(title) = after.strip_prefix(delim) {
                let title = title.trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
            }
        }
    }
    None
}

/// Splits canonical text into sections. Content lines are kept verbatim
/// (end-trimmed); blank lines and any preamble before the first header are
/// dropped. Budgets are read from header suffixes when present.
pub fn parse_sections(text: &str, _language: Language) -> Vec<OutlineSection> {
    let mut sections: Vec<OutlineSection> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some((_, raw_title)) = canonical_header(line) {
            let index = sections.len() as u32 + 1;
            sections.push(OutlineSection {
                index,
                role: SectionRole::Body,
                title: strip_budget_suffix(&raw_title),
                bullet_lines: vec![],
                word_budget: parse_budget_suffix(&raw_title).unwrap_or(0),
            });
        } else if let Some(current) = sections.last_mut() {
            current.bullet_lines.push(line.trim().to_string());
        }
        // Lines before the first header are preamble and are dropped.
    }
    sections
}

/// Structural floor: fewer than 3 sections gets placeholder body/conclusion
/// sections appended until at least 3 exist.
pub fn ensure_minimum_sections(
    sections: Vec<OutlineSection>,
    language: Language,
) -> Vec<OutlineSection> {
    let mut sections = sections;
    while sections.len() < 3 {
        let index = sections.len() as u32 + 1;
        sections.push(OutlineSection {
            index,
            role: SectionRole::Body,
            title: String::new(),
            bullet_lines: vec![language.placeholder_bullet().to_string()],
            word_budget: 0,
        });
    }
    sections
}

/// Positional role normalization: section 1 is the introduction, the last
/// is the conclusion, everything between is a numbered body paragraph.
/// Titles are replaced by the role label; bullets are preserved.
pub fn normalize_roles(sections: Vec<OutlineSection>, language: Language) -> Vec<OutlineSection> {
    let len = sections.len();
    sections
        .into_iter()
        .enumerate()
        .map(|(i, mut s)| {
            s.index = i as u32 + 1;
            if i == 0 {
                s.role = SectionRole::Introduction;
                s.title = language.introduction_label().to_string();
            } else if i + 1 == len {
                s.role = SectionRole::Conclusion;
                s.title = language.conclusion_label().to_string();
            } else {
                s.role = SectionRole::Body;
                s.title = language.body_label(i);
            }
            s
        })
        .collect()
}

/// Attaches explicit body subtitles from the plan, in order.
pub fn attach_subtitles(
    sections: Vec<OutlineSection>,
    subtitles: &[String],
    language: Language,
) -> Vec<OutlineSection> {
    if subtitles.is_empty() {
        return sections;
    }
    let mut body_seen = 0;
    sections
        .into_iter()
        .map(|mut s| {
            if s.role == SectionRole::Body {
                if let Some(subtitle) = subtitles.get(body_seen) {
                    if !subtitle.trim().is_empty() {
                        s.title = language.join_subtitle(&s.title, subtitle.trim());
                    }
                }
                body_seen += 1;
            }
            s
        })
        .collect()
}

/// Clips excess body sections: overflow sections' bullets merge into the
/// last retained body section, whose rationale line stays last. Overflow
/// rationale lines are discarded.
pub fn clip_body_sections(
    sections: Vec<OutlineSection>,
    desired_body_count: usize,
    language: Language,
) -> Vec<OutlineSection> {
    let desired = desired_body_count.max(1);
    let body_count = sections
        .iter()
        .filter(|s| s.role == SectionRole::Body)
        .count();
    if body_count <= desired {
        return sections;
    }

    let mut kept: Vec<OutlineSection> = Vec::new();
    let mut overflow_bullets: Vec<String> = Vec::new();
    let mut bodies_kept = 0;
    for section in sections {
        match section.role {
            SectionRole::Body if bodies_kept >= desired => {
                overflow_bullets.extend(
                    section
                        .bullet_lines
                        .into_iter()
                        .filter(|l| is_bullet_line(l) && !is_rationale_line(l)),
                );
            }
            SectionRole::Body => {
                bodies_kept += 1;
                kept.push(section);
            }
            _ => kept.push(section),
        }
    }

    if !overflow_bullets.is_empty() {
        if let Some(last_body) = kept
            .iter_mut()
            .rev()
            .find(|s| s.role == SectionRole::Body)
        {
            let rationale_at = last_body
                .bullet_lines
                .iter()
                .position(|l| is_rationale_line(l));
            match rationale_at {
                Some(pos) => {
                    for (offset, bullet) in overflow_bullets.into_iter().enumerate() {
                        last_body.bullet_lines.insert(pos + offset, bullet);
                    }
                }
                None => last_body.bullet_lines.extend(overflow_bullets),
            }
        }
    }

    // Re-number and re-label after the clip.
    normalize_roles(kept, language)
}

/// Pads missing body sections with placeholders (inserted before the
/// conclusion) so a request for N body sections always yields N of them,
/// even when the model under-delivers. Placeholders are later backfilled.
pub fn pad_body_sections(
    sections: Vec<OutlineSection>,
    desired_body_count: usize,
    language: Language,
) -> Vec<OutlineSection> {
    let desired = desired_body_count.max(1);
    let mut bodies = sections
        .iter()
        .filter(|s| s.role == SectionRole::Body)
        .count();
    if bodies >= desired {
        return sections;
    }
    let mut sections = sections;
    while bodies < desired {
        let insert_at = sections.len() - 1;
        sections.insert(
            insert_at,
            OutlineSection {
                index: 0,
                role: SectionRole::Body,
                title: String::new(),
                bullet_lines: vec![language.placeholder_bullet().to_string()],
                word_budget: 0,
            },
        );
        bodies += 1;
    }
    normalize_roles(sections, language)
}

/// Renders the canonical outline text: budgeted headers with verbatim
/// content lines, sections separated by a blank line. Rendering then
/// re-parsing a canonical outline reproduces it byte-identically, which is
/// what makes single-section regeneration splicing safe.
pub fn render_outline(sections: &[OutlineSection], language: Language) -> String {
    sections
        .iter()
        .map(|s| {
            let header = if s.word_budget > 0 {
                language.format_header(s.index, &s.title, s.word_budget)
            } else {
                language.format_header_plain(s.index, &s.title)
            };
            let mut block = vec![header];
            block.extend(s.bullet_lines.iter().cloned());
            block.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(role: SectionRole, title: &str, bullets: &[&str]) -> OutlineSection {
        OutlineSection {
            index: 0,
            role,
            title: title.to_string(),
            bullet_lines: bullets.iter().map(|s| s.to_string()).collect(),
            word_budget: 0,
        }
    }

    #[test]
    fn test_canonical_header_both_languages() {
        assert_eq!(
            canonical_header("Section 2: Body Paragraph 1 (240 words)"),
            Some((2, "Body Paragraph 1 (240 words)".to_string()))
        );
        assert_eq!(
            canonical_header("第1部分：引言（约130字）"),
            Some((1, "引言（约130字）".to_string()))
        );
        assert_eq!(canonical_header("- just a bullet"), None);
    }

    #[test]
    fn test_budget_suffix_roundtrip() {
        assert_eq!(strip_budget_suffix("Introduction (130 words)"), "Introduction");
        assert_eq!(parse_budget_suffix("Introduction (130 words)"), Some(130));
        assert_eq!(strip_budget_suffix("引言（约130字）"), "引言");
        assert_eq!(parse_budget_suffix("引言（约130字）"), Some(130));
        // A parenthetical that is not a budget stays.
        assert_eq!(
            strip_budget_suffix("Energy (light and heat)"),
            "Energy (light and heat)"
        );
    }

    #[test]
    fn test_normalize_headers_markdown_and_numeric() {
        let raw = "## Introduction\n- point one here\n2. The Second Part\n- point two here";
        let normalized = normalize_headers(raw, Language::English);
        assert_eq!(
            normalized,
            "Section 1: Introduction\n- point one here\nSection 2: The Second Part\n- point two here"
        );
    }

    #[test]
    fn test_normalize_headers_renumbers_canonical() {
        let raw = "Section 3: A\nSection 9: B";
        assert_eq!(
            normalize_headers(raw, Language::English),
            "Section 1: A\nSection 2: B"
        );
    }

    #[test]
    fn test_part_ordinal_is_header() {
        let raw = "Part 1: Opening Remarks\n- a point to keep";
        let normalized = normalize_headers(raw, Language::English);
        assert!(normalized.starts_with("Section 1: Opening Remarks"));
    }

    #[test]
    fn test_bold_line_is_header_bullets_are_not() {
        let raw = "**Opening**\n- a dash bullet stays a bullet";
        let normalized = normalize_headers(raw, Language::English);
        assert!(normalized.starts_with("Section 1: Opening"));
        assert!(normalized.contains("- a dash bullet stays a bullet"));
    }

    #[test]
    fn test_parse_sections_drops_preamble_and_blanks() {
        let text = "Here is your outline:\n\nSection 1: Introduction\n- first point\n\nSection 2: Conclusion\n- second point";
        let sections = parse_sections(text, Language::English);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Introduction");
        assert_eq!(sections[0].bullet_lines, vec!["- first point"]);
        assert_eq!(sections[1].bullet_lines, vec!["- second point"]);
    }

    #[test]
    fn test_minimum_three_sections_synthesized() {
        let sections = parse_sections("Section 1: Only One\n- a point", Language::English);
        let sections = ensure_minimum_sections(sections, Language::English);
        assert_eq!(sections.len(), 3);
        assert_eq!(
            sections[2].bullet_lines,
            vec![Language::English.placeholder_bullet().to_string()]
        );
    }

    #[test]
    fn test_roles_assigned_by_position_not_title() {
        let sections = vec![
            section(SectionRole::Body, "Conclusion", &["- a"]),
            section(SectionRole::Body, "Whatever", &["- b"]),
            section(SectionRole::Body, "Introduction", &["- c"]),
        ];
        let roles = normalize_roles(sections, Language::English);
        assert_eq!(roles[0].role, SectionRole::Introduction);
        assert_eq!(roles[0].title, "Introduction");
        assert_eq!(roles[1].role, SectionRole::Body);
        assert_eq!(roles[1].title, "Body Paragraph 1");
        assert_eq!(roles[2].role, SectionRole::Conclusion);
        assert_eq!(roles[2].title, "Conclusion");
    }

    #[test]
    fn test_attach_subtitles_in_order() {
        let sections = normalize_roles(
            vec![
                section(SectionRole::Body, "", &[]),
                section(SectionRole::Body, "", &[]),
                section(SectionRole::Body, "", &[]),
                section(SectionRole::Body, "", &[]),
            ],
            Language::English,
        );
        let subtitled = attach_subtitles(
            sections,
            &["Light Reactions".to_string(), "Calvin Cycle".to_string()],
            Language::English,
        );
        assert_eq!(subtitled[1].title, "Body Paragraph 1: Light Reactions");
        assert_eq!(subtitled[2].title, "Body Paragraph 2: Calvin Cycle");
    }

    #[test]
    fn test_clip_merges_overflow_bullets_before_rationale() {
        let sections = normalize_roles(
            vec![
                section(SectionRole::Body, "", &["- intro point"]),
                section(SectionRole::Body, "", &["- keep one", "Rationale: why"]),
                section(SectionRole::Body, "", &["- overflow point", "Rationale: dropped"]),
                section(SectionRole::Body, "", &["- closing point"]),
            ],
            Language::English,
        );
        let clipped = clip_body_sections(sections, 1, Language::English);
        assert_eq!(clipped.len(), 3);
        assert_eq!(
            clipped[1].bullet_lines,
            vec!["- keep one", "- overflow point", "Rationale: why"]
        );
    }

    #[test]
    fn test_render_parse_roundtrip_is_identity() {
        let mut sections = normalize_roles(
            vec![
                section(SectionRole::Body, "", &["- opening idea", "Rationale: sets scope"]),
                section(SectionRole::Body, "", &["- core claim", "a. sub-point here"]),
                section(SectionRole::Body, "", &["- final takeaway"]),
            ],
            Language::English,
        );
        for (s, b) in sections.iter_mut().zip([130, 640, 130]) {
            s.word_budget = b;
        }
        let rendered = render_outline(&sections, Language::English);
        let reparsed = parse_sections(&rendered, Language::English);
        let reparsed = normalize_roles(reparsed, Language::English);
        let mut reparsed = reparsed;
        for (s, b) in reparsed.iter_mut().zip([130, 640, 130]) {
            s.word_budget = b;
        }
        assert_eq!(render_outline(&reparsed, Language::English), rendered);
    }
}

//! Bullet sanitization — filters, deduplicates, and caps a section's
//! bullets, and extracts bullet-shaped lines from backfill/enrichment
//! responses. Sanitizing an already-sanitized section is a no-op.

use crate::language::Language;
use crate::outline::OutlineSection;

/// Bullet caps per section after sanitization.
const MAX_BULLETS: usize = 5;

/// Content-length gates (in characters) for a surviving bullet.
const MIN_LEN_CJK: usize = 6;
const MAX_LEN_CJK: usize = 60;
const MIN_LEN_OTHER: usize = 8;
const MAX_LEN_OTHER: usize = 120;

/// True for a bullet-marked line: dash/asterisk/dot markers or a lettered
/// sub-point (`a.` / `b)`).
pub fn is_bullet_line(line: &str) -> bool {
    let t = line.trim_start();
    if t.starts_with("- ") || t.starts_with("-（") || t.starts_with("* ") || t.starts_with("• ") {
        return true;
    }
    is_lettered_subpoint(t)
}

fn is_lettered_subpoint(t: &str) -> bool {
    let mut chars = t.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), Some(delim), Some(space)) => {
            letter.is_ascii_lowercase()
                && (delim == '.' || delim == ')')
                && space == ' '
        }
        _ => false,
    }
}

/// True for a trailing rationale line (`Rationale: …` / `理由：…`).
pub fn is_rationale_line(line: &str) -> bool {
    let t = line.trim_start();
    Language::rationale_prefixes()
        .iter()
        .any(|p| t.starts_with(p))
}

/// The bullet's content with its marker removed.
pub fn bullet_content(line: &str) -> &str {
    let t = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = t.strip_prefix(marker) {
            return rest.trim();
        }
    }
    if let Some(rest) = t.strip_prefix("-（") {
        // CJK placeholder form "-（…）" keeps its brackets as content.
        return t.strip_prefix('-').unwrap_or(rest).trim();
    }
    if is_lettered_subpoint(t) {
        return t[2..].trim();
    }
    t
}

/// Case- and punctuation-insensitive key used for deduplication.
pub fn dedup_key(content: &str) -> String {
    content
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Sanitizes one section's bullets:
/// keeps only bullet-marked lines (plus the first rationale line, kept
/// last), drops bullets outside the length gates, deduplicates, caps at
/// [`MAX_BULLETS`], and inserts one placeholder when nothing survives.
pub fn sanitize_section_bullets(section: &OutlineSection, language: Language) -> OutlineSection {
    let (min_len, max_len) = if language.is_cjk() {
        (MIN_LEN_CJK, MAX_LEN_CJK)
    } else {
        (MIN_LEN_OTHER, MAX_LEN_OTHER)
    };
    let placeholder = language.placeholder_bullet();

    let mut rationale: Option<String> = None;
    let mut kept: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for line in &section.bullet_lines {
        if is_rationale_line(line) {
            if rationale.is_none() {
                rationale = Some(line.trim().to_string());
            }
            continue;
        }
        if !is_bullet_line(line) {
            continue;
        }
        let trimmed = line.trim().to_string();
        if trimmed == placeholder {
            continue; // re-inserted below only if nothing real survives
        }
        let content = bullet_content(&trimmed);
        let len = content.chars().count();
        if len < min_len || len > max_len {
            continue;
        }
        let key = dedup_key(content);
        if seen.contains(&key) {
            continue;
        }
        if kept.len() >= MAX_BULLETS {
            continue;
        }
        seen.push(key);
        kept.push(trimmed);
    }

    if kept.is_empty() {
        kept.push(placeholder.to_string());
    }
    if let Some(r) = rationale {
        kept.push(r);
    }

    OutlineSection {
        bullet_lines: kept,
        ..section.clone()
    }
}

/// True when the section has at least one real (non-placeholder) bullet.
pub fn has_real_bullet(section: &OutlineSection, language: Language) -> bool {
    let placeholder = language.placeholder_bullet();
    section
        .bullet_lines
        .iter()
        .any(|l| is_bullet_line(l) && l.trim() != placeholder && !is_rationale_line(l))
}

/// Keeps only bullet/sub-point-shaped lines from a model response, end-
/// trimmed. Used to splice backfill and enrichment rewrites.
pub fn extract_bullet_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .filter(|l| is_bullet_line(l))
        .map(|l| l.trim().to_string())
        .collect()
}

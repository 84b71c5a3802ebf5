//! Outline Structuring Engine — turns a raw generated outline into a
//! canonical section tree with normalized roles, sanitized bullets, and an
//! exact length budget per section.

pub mod budget;
pub mod bullets;
pub mod engine;
pub mod handlers;
pub mod parse;
pub mod prompts;

use serde::{Deserialize, Serialize};

/// Section role, determined by position in the outline — never by whatever
/// title the model produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionRole {
    Introduction,
    Body,
    Conclusion,
}

/// One canonical outline section.
///
/// `bullet_lines` holds the section's content lines verbatim: primary
/// bullets, optional lettered sub-points, and an optional trailing
/// rationale line. `word_budget` is exact once budgets are allocated —
/// budgets across an outline sum to the requested total, each a multiple
/// of ten, minimum 50.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// 1-based position in the outline.
    pub index: u32,
    pub role: SectionRole,
    /// Title without the ordinal prefix or budget suffix.
    pub title: String,
    pub bullet_lines: Vec<String>,
    pub word_budget: u32,
}

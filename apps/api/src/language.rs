//! Language handling — labels, ordinal headers, and measurement defaults.
//!
//! All language-dependent surface strings (section headers, role labels,
//! budget suffixes, rationale markers) live here so the outline and draft
//! pipelines stay language-agnostic.

use serde::{Deserialize, Serialize};

use crate::draft::measure::LengthUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "en", alias = "en-us", alias = "en-gb")]
    English,
    #[serde(alias = "zh", alias = "zh-cn", alias = "zh-tw")]
    Chinese,
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl Language {
    pub fn is_cjk(self) -> bool {
        matches!(self, Language::Chinese)
    }

    /// The unit used to measure prose length in this language.
    pub fn default_unit(self) -> LengthUnit {
        if self.is_cjk() {
            LengthUnit::CjkChar
        } else {
            LengthUnit::Word
        }
    }

    pub fn introduction_label(self) -> &'static str {
        match self {
            Language::English => "Introduction",
            Language::Chinese => "引言",
        }
    }

    pub fn conclusion_label(self) -> &'static str {
        match self {
            Language::English => "Conclusion",
            Language::Chinese => "结论",
        }
    }

    pub fn body_label(self, n: usize) -> String {
        match self {
            Language::English => format!("Body Paragraph {n}"),
            Language::Chinese => format!("主体段落{n}"),
        }
    }

    /// Canonical ordinal header without a budget suffix.
    pub fn format_header_plain(self, index: u32, title: &str) -> String {
        match self {
            Language::English => format!("Section {index}: {title}"),
            Language::Chinese => format!("第{index}部分：{title}"),
        }
    }

    /// Canonical ordinal header with the budget suffix appended.
    pub fn format_header(self, index: u32, title: &str, budget: u32) -> String {
        match self {
            Language::English => format!("Section {index}: {title} ({budget} words)"),
            Language::Chinese => format!("第{index}部分：{title}（约{budget}字）"),
        }
    }

    /// Prefixes that mark a section's trailing rationale line.
    /// Both languages are accepted regardless of the requested language,
    /// since the model does not always follow the prompt's language.
    pub fn rationale_prefixes() -> &'static [&'static str] {
        &["Rationale:", "Rationale：", "理由：", "理由:"]
    }

    pub fn placeholder_bullet(self) -> &'static str {
        match self {
            Language::English => "- (to be expanded)",
            Language::Chinese => "-（待补充）",
        }
    }

    /// How the subtitle is attached to a body header title.
    pub fn join_subtitle(self, label: &str, subtitle: &str) -> String {
        match self {
            Language::English => format!("{label}: {subtitle}"),
            Language::Chinese => format!("{label}：{subtitle}"),
        }
    }
}

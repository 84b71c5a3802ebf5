//! Paragraph Specification — the declarative length/format contract a
//! section draft must satisfy.
//!
//! A stored spec is never mutated; the synthesizer adjusts only a working
//! copy per attempt (citation gating).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::draft::measure::LengthUnit;
use crate::language::Language;
use crate::outline::SectionRole;

/// Tolerance fallback when the supplied value is non-positive.
pub const DEFAULT_TOLERANCE: f32 = 0.1;
/// Upper clamp for tolerance — a contract looser than ±50% is meaningless.
pub const MAX_TOLERANCE: f32 = 0.5;

/// The normalized, machine-checkable contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphSpec {
    pub target_count: u32,
    pub unit: LengthUnit,
    pub tolerance_percent: f32,
    pub single_paragraph_only: bool,
    pub allow_line_breaks: bool,
    pub allow_bullets: bool,
    pub allow_headings: bool,
    pub allow_citations: bool,
    pub allow_examples: bool,
    pub max_examples: Option<u32>,
    pub paragraph_type: String,
    pub rhetorical_move: String,
}

impl ParagraphSpec {
    /// Inclusive accepted length range `[T·(1−tol), T·(1+tol)]`.
    pub fn length_range(&self) -> (usize, usize) {
        let t = self.target_count as f32;
        let min = (t * (1.0 - self.tolerance_percent)).ceil() as usize;
        let max = (t * (1.0 + self.tolerance_percent)).floor() as usize;
        (min, max)
    }

    /// Role-specific preset with unit/target filled from the requested
    /// length and language.
    pub fn preset_for_role(role: SectionRole, target: u32, language: Language) -> ParagraphSpec {
        let unit = language.default_unit();
        match role {
            SectionRole::Introduction => ParagraphSpec {
                target_count: target,
                unit,
                tolerance_percent: DEFAULT_TOLERANCE,
                single_paragraph_only: true,
                allow_line_breaks: false,
                allow_bullets: false,
                allow_headings: false,
                allow_citations: false,
                allow_examples: false,
                max_examples: None,
                paragraph_type: "introduction".to_string(),
                rhetorical_move: "hook-context-thesis".to_string(),
            },
            SectionRole::Body => ParagraphSpec {
                target_count: target,
                unit,
                tolerance_percent: DEFAULT_TOLERANCE,
                single_paragraph_only: true,
                allow_line_breaks: false,
                allow_bullets: false,
                allow_headings: false,
                allow_citations: true,
                allow_examples: true,
                max_examples: Some(2),
                paragraph_type: "body".to_string(),
                rhetorical_move: "claim-evidence-analysis".to_string(),
            },
            SectionRole::Conclusion => ParagraphSpec {
                target_count: target,
                unit,
                tolerance_percent: DEFAULT_TOLERANCE,
                single_paragraph_only: true,
                allow_line_breaks: false,
                allow_bullets: false,
                allow_headings: false,
                allow_citations: false,
                allow_examples: false,
                max_examples: None,
                paragraph_type: "conclusion".to_string(),
                rhetorical_move: "restate-synthesize-close".to_string(),
            },
        }
    }
}

/// The loose, caller-supplied form. Fields arrive as free-form JSON values
/// ("240" vs 240, 1 vs true) and are coerced during normalization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawParagraphSpec {
    pub target_count: Option<Value>,
    pub unit: Option<Value>,
    pub tolerance_percent: Option<Value>,
    pub single_paragraph_only: Option<Value>,
    pub allow_line_breaks: Option<Value>,
    pub allow_bullets: Option<Value>,
    pub allow_headings: Option<Value>,
    pub allow_citations: Option<Value>,
    pub allow_examples: Option<Value>,
    pub max_examples: Option<Value>,
    pub paragraph_type: Option<Value>,
    pub rhetorical_move: Option<Value>,
}

/// Merges a raw spec over an optional fallback (the role preset) and
/// normalizes it. Returns `None` when a required field is missing after the
/// merge, the target is non-positive, or the unit is unrecognized.
pub fn normalize_spec(
    raw: &RawParagraphSpec,
    fallback: Option<&ParagraphSpec>,
) -> Option<ParagraphSpec> {
    let target_count = match &raw.target_count {
        Some(v) => coerce_u32(v)?,
        None => fallback?.target_count,
    };
    if target_count == 0 {
        return None;
    }

    let unit = match &raw.unit {
        Some(v) => coerce_unit(v)?,
        None => fallback?.unit,
    };

    let tolerance_raw = match &raw.tolerance_percent {
        Some(v) => coerce_f32(v)?,
        None => fallback?.tolerance_percent,
    };
    let tolerance_percent = if tolerance_raw <= 0.0 {
        DEFAULT_TOLERANCE
    } else if tolerance_raw > MAX_TOLERANCE {
        MAX_TOLERANCE
    } else {
        tolerance_raw
    };

    let single_paragraph_only = match &raw.single_paragraph_only {
        Some(v) => coerce_bool(v)?,
        None => fallback?.single_paragraph_only,
    };

    let paragraph_type = match &raw.paragraph_type {
        Some(v) => coerce_string(v)?,
        None => fallback?.paragraph_type.clone(),
    };
    let rhetorical_move = match &raw.rhetorical_move {
        Some(v) => coerce_string(v)?,
        None => fallback?.rhetorical_move.clone(),
    };

    // Optional flags default from the fallback, else to the strictest form.
    let allow_line_breaks = opt_bool(&raw.allow_line_breaks, fallback.map(|f| f.allow_line_breaks))?;
    let allow_bullets = opt_bool(&raw.allow_bullets, fallback.map(|f| f.allow_bullets))?;
    let allow_headings = opt_bool(&raw.allow_headings, fallback.map(|f| f.allow_headings))?;
    let allow_citations = opt_bool(&raw.allow_citations, fallback.map(|f| f.allow_citations))?;
    let allow_examples = opt_bool(&raw.allow_examples, fallback.map(|f| f.allow_examples))?;
    let max_examples = match &raw.max_examples {
        Some(v) => Some(coerce_u32(v)?),
        None => fallback.and_then(|f| f.max_examples),
    };

    Some(ParagraphSpec {
        target_count,
        unit,
        tolerance_percent,
        single_paragraph_only,
        allow_line_breaks,
        allow_bullets,
        allow_headings,
        allow_citations,
        allow_examples,
        max_examples,
        paragraph_type,
        rhetorical_move,
    })
}

fn opt_bool(raw: &Option<Value>, fallback: Option<bool>) -> Option<bool> {
    match raw {
        Some(v) => coerce_bool(v),
        None => Some(fallback.unwrap_or(false)),
    }
}

fn coerce_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|x| u32::try_from(x).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn coerce_unit(v: &Value) -> Option<LengthUnit> {
    match v {
        Value::String(s) => LengthUnit::parse(s),
        _ => None,
    }
}

fn coerce_f32(v: &Value) -> Option<f32> {
    match v {
        Value::Number(n) => n.as_f64().map(|x| x as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

fn coerce_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

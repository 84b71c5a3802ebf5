//! Section Draft Synthesizer — turns an outline section plus a paragraph
//! contract into validated prose.
//!
//! State machine per request:
//!
//!   BUILD_SPEC → GENERATE → VALIDATE → (REPAIR ⇄ VALIDATE, ≤ 2)
//!             → LENGTH_ADJUST (pure length miss only) → VALIDATE
//!             → ACCEPT | legacy fallback
//!
//! Every model reply passes through sanitization and the payload guard
//! before it is measured or returned. The legacy path is the pre-contract
//! behavior: a free-form role prompt with bounded length nudges and
//! continuations, accepted best-effort unless the caller pinned an
//! explicit spec.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::draft::assembly::AssemblyPolicy;
use crate::draft::intro_plan::classify_intro_bullets;
use crate::draft::measure::{measure, LengthUnit};
use crate::draft::prompts::{
    BODY_ROLE_INSTRUCTIONS, CONCLUSION_ROLE_INSTRUCTIONS, CONTINUATION_PROMPT_TEMPLATE,
    DRAFT_SYSTEM, GENERATE_PROMPT_TEMPLATE, INTRO_NUDGE_PROMPT_TEMPLATE,
    INTRO_ROLE_INSTRUCTIONS, LEGACY_PROMPT_TEMPLATE, LENGTH_ADJUST_PROMPT_TEMPLATE,
    REPAIR_PROMPT_TEMPLATE,
};
use crate::draft::sanitize::{
    collapse_to_single_paragraph, contains_citation, strip_citations,
    strip_leading_concluding_transition, strip_meta_phrases,
};
use crate::draft::spec::{normalize_spec, ParagraphSpec, RawParagraphSpec};
use crate::draft::validate::{validate, ValidationResult};
use crate::errors::AppError;
use crate::guard;
use crate::language::Language;
use crate::llm_client::{call_with_fallback, CallOptions, ChatMessage, CompletionBackend};
use crate::outline::bullets::{bullet_content, is_bullet_line};
use crate::outline::SectionRole;
use crate::sources::{any_usable, VerifiedSource};

const MAX_REPAIRS: u32 = 2;
const DRAFT_TIMEOUT: Duration = Duration::from_secs(180);
const GENERATE_TEMPERATURE: f32 = 0.7;
const REPAIR_TEMPERATURE: f32 = 0.3;
const MIN_TOKENS: u32 = 256;
const MAX_TOKENS: u32 = 4096;
/// Under-length threshold that triggers legacy continuations.
const CONTINUATION_THRESHOLD: f32 = 0.9;

#[derive(Debug, Clone, Deserialize)]
pub struct DraftRequest {
    pub title: String,
    #[serde(default)]
    pub section_role: Option<SectionRole>,
    pub target_length: u32,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub outline_fragment: String,
    #[serde(default)]
    pub verified_sources: Vec<VerifiedSource>,
    #[serde(default)]
    pub explicit_spec: Option<RawParagraphSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDraftResult {
    pub text: String,
    pub language: Language,
    pub attempts_used: u32,
    pub final_validation: ValidationResult,
}

/// Drafts one section. Strict contract path when a spec can be built,
/// legacy free-form path otherwise or on exhaustion.
pub async fn synthesize_section(
    llm: &dyn CompletionBackend,
    config: &Config,
    req: &DraftRequest,
) -> Result<SectionDraftResult, AppError> {
    let language = req.language;
    let title = guard::sanitize_field(&req.title);
    let outline = guard::sanitize_field(&req.outline_fragment);
    let tone = guard::sanitize_field(&req.tone);
    let tone = if tone.trim().is_empty() {
        "neutral academic".to_string()
    } else {
        tone
    };

    // BUILD_SPEC. An explicit spec normalizes over the role preset; a bare
    // role instantiates its preset; neither means the legacy path.
    let preset = req
        .section_role
        .map(|role| ParagraphSpec::preset_for_role(role, req.target_length, language));
    let spec = match &req.explicit_spec {
        Some(raw) => normalize_spec(raw, preset.as_ref()),
        None => preset.clone(),
    };
    let has_explicit_spec = req.explicit_spec.is_some() && spec.is_some();

    let Some(mut spec) = spec else {
        let text = legacy_draft(llm, config, req, &title, &outline, &tone).await?;
        let measured = measure(&text, language.default_unit());
        return Ok(SectionDraftResult {
            text,
            language,
            attempts_used: 1,
            final_validation: ValidationResult::unchecked(measured, 1),
        });
    };

    // Citation gating: citations are only allowed when a usable verified
    // source exists to back them.
    let citations_backed = any_usable(&req.verified_sources, spec.unit);
    if spec.allow_citations && !citations_backed {
        warn!("no usable verified source in context, gating citations off");
        spec.allow_citations = false;
    }

    // GENERATE.
    let mut attempts = 1u32;
    let prompt = generate_prompt(req, &title, &outline, &tone, &spec, language);
    let mut text = call_model(llm, config, &prompt, &spec, GENERATE_TEMPERATURE).await?;
    text = sanitize_reply(&text, req.section_role, &spec, language);
    let mut result = validate(&text, &spec);

    // REPAIR ⇄ VALIDATE.
    let mut repairs = 0u32;
    while !result.is_valid && repairs < MAX_REPAIRS {
        repairs += 1;
        attempts += 1;
        let prompt = repair_prompt(&text, &spec, &result);
        text = call_model(llm, config, &prompt, &spec, REPAIR_TEMPERATURE).await?;
        text = sanitize_reply(&text, req.section_role, &spec, language);
        result = validate(&text, &spec);
    }

    // LENGTH_ADJUST, only when length is the sole survivor.
    if !result.is_valid && result.purely_length_violation() {
        attempts += 1;
        let prompt = length_adjust_prompt(&text, &spec, result.measured_length);
        text = call_model(llm, config, &prompt, &spec, REPAIR_TEMPERATURE).await?;
        text = sanitize_reply(&text, req.section_role, &spec, language);
        result = validate(&text, &spec);
    }

    // ACCEPT requires the validator AND an independent recount to agree.
    if result.is_valid {
        let recount = measure(&text, spec.unit);
        let (min, max) = spec.length_range();
        info!(
            validator_length = result.measured_length,
            recount, "draft accepted, both measurements logged"
        );
        if recount >= min && recount <= max {
            guard::ensure_clean_response(&text)?;
            return Ok(SectionDraftResult {
                text,
                language,
                attempts_used: attempts,
                final_validation: result,
            });
        }
        warn!(
            validator_length = result.measured_length,
            recount, "independent recount out of range, falling back"
        );
    }

    // Legacy fallback.
    warn!(attempts, "strict path exhausted, taking legacy path");
    let text = legacy_draft(llm, config, req, &title, &outline, &tone).await?;
    attempts += 1;
    let result = validate(&text, &spec);
    if has_explicit_spec && !result.is_valid {
        return Err(AppError::ValidationExhausted(format!(
            "draft failed its explicit contract after {attempts} attempts: {}",
            result
                .violations
                .iter()
                .map(|v| v.describe())
                .collect::<Vec<_>>()
                .join("; ")
        )));
    }
    Ok(SectionDraftResult {
        text,
        language,
        attempts_used: attempts,
        final_validation: result,
    })
}

/// One gateway call with fallback, guard-checked and with token ceiling
/// scaled from the contract target.
async fn call_model(
    llm: &dyn CompletionBackend,
    config: &Config,
    prompt: &str,
    spec: &ParagraphSpec,
    temperature: f32,
) -> Result<String, AppError> {
    let messages = [ChatMessage::system(DRAFT_SYSTEM), ChatMessage::user(prompt)];
    let opts = CallOptions {
        model: config.primary_model.clone(),
        temperature,
        max_tokens: token_ceiling(spec),
        timeout: DRAFT_TIMEOUT,
    };
    let text = call_with_fallback(llm, &messages, &opts, &config.secondary_model).await?;
    guard::ensure_clean_response(&text)?;
    Ok(text)
}

/// Token ceiling scaled from the target: characters compress into tokens,
/// words expand. Clamped to a sane window.
fn token_ceiling(spec: &ParagraphSpec) -> u32 {
    let factor = match spec.unit {
        LengthUnit::CjkChar | LengthUnit::GenericChar => 1.3,
        LengthUnit::Word => 2.4,
    };
    ((spec.target_count as f32 * factor) as u32).clamp(MIN_TOKENS, MAX_TOKENS)
}

/// Post-call sanitization: meta-phrases always; a leading concluding
/// transition for non-conclusion sections; paragraph collapse when line
/// breaks are out of contract; citation strip when gated off.
fn sanitize_reply(
    raw: &str,
    role: Option<SectionRole>,
    spec: &ParagraphSpec,
    language: Language,
) -> String {
    let mut text = strip_meta_phrases(raw);
    if role != Some(SectionRole::Conclusion) {
        text = strip_leading_concluding_transition(&text);
    }
    if spec.single_paragraph_only || !spec.allow_line_breaks {
        text = collapse_to_single_paragraph(&text, language.is_cjk());
    }
    if !spec.allow_citations && contains_citation(&text) {
        text = strip_citations(&text);
    }
    text.trim().to_string()
}

fn role_instructions(role: Option<SectionRole>) -> &'static str {
    match role {
        Some(SectionRole::Introduction) => INTRO_ROLE_INSTRUCTIONS,
        Some(SectionRole::Conclusion) => CONCLUSION_ROLE_INSTRUCTIONS,
        _ => BODY_ROLE_INSTRUCTIONS,
    }
}

/// For an introduction, the outline bullets are re-ordered into the
/// hook/background/thesis structure before prompting; other roles pass
/// the fragment through.
fn outline_for_prompt(role: Option<SectionRole>, outline: &str) -> String {
    if role != Some(SectionRole::Introduction) {
        return outline.to_string();
    }
    let bullets: Vec<String> = outline
        .lines()
        .map(str::trim)
        .filter(|l| is_bullet_line(l))
        .map(|l| bullet_content(l).to_string())
        .collect();
    if bullets.is_empty() {
        return outline.to_string();
    }
    let plan = classify_intro_bullets(&bullets);
    let mut out = String::new();
    for (label, items) in [
        ("HOOK", &plan.hook),
        ("BACKGROUND", &plan.background),
        ("THESIS", &plan.thesis),
    ] {
        for item in items {
            out.push_str(&format!("{label}: {item}\n"));
        }
    }
    out.trim_end().to_string()
}

fn generate_prompt(
    req: &DraftRequest,
    title: &str,
    outline: &str,
    tone: &str,
    spec: &ParagraphSpec,
    language: Language,
) -> String {
    let sources = if spec.allow_citations {
        let listing = req
            .verified_sources
            .iter()
            .filter(|s| s.is_usable(spec.unit))
            .map(|s| {
                format!(
                    "- {} ({})",
                    s.title,
                    s.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "CITATIONS: cite only from these verified sources, in (Author Year) form:\n{listing}\n"
        )
    } else {
        "CITATIONS: do not cite any source.\n".to_string()
    };
    GENERATE_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{role_instructions}", role_instructions(req.section_role))
        .replace("{language}", language_name(language))
        .replace("{tone}", tone)
        .replace("{target}", &spec.target_count.to_string())
        .replace("{unit}", spec.unit.label())
        .replace("{sources}", &sources)
        .replace("{outline}", &outline_for_prompt(req.section_role, outline))
}

fn repair_prompt(text: &str, spec: &ParagraphSpec, result: &ValidationResult) -> String {
    let violations = result
        .violations
        .iter()
        .map(|v| format!("- {}", v.describe()))
        .collect::<Vec<_>>()
        .join("\n");
    REPAIR_PROMPT_TEMPLATE
        .replace("{violations}", &violations)
        .replace("{target}", &spec.target_count.to_string())
        .replace("{unit}", spec.unit.label())
        .replace("{text}", text)
}

fn length_adjust_prompt(text: &str, spec: &ParagraphSpec, measured: usize) -> String {
    let direction = if measured < spec.target_count as usize {
        "Expand"
    } else {
        "Shorten"
    };
    LENGTH_ADJUST_PROMPT_TEMPLATE
        .replace("{direction}", direction)
        .replace("{measured}", &measured.to_string())
        .replace("{target}", &spec.target_count.to_string())
        .replace("{unit}", spec.unit.label())
        .replace("{text}", text)
}

// ────────────────────────────────────────────────────────────────────────────
// Legacy path
// ────────────────────────────────────────────────────────────────────────────

/// Pre-contract drafting: one free-form role prompt, a bounded length
/// nudge for non-CJK introductions, then up to 2 continuations for any
/// section still clearly under length.
async fn legacy_draft(
    llm: &dyn CompletionBackend,
    config: &Config,
    req: &DraftRequest,
    title: &str,
    outline: &str,
    tone: &str,
) -> Result<String, AppError> {
    let language = req.language;
    let unit = language.default_unit();
    let target = req.target_length;
    let opts = legacy_opts(config, target, unit);

    let prompt = LEGACY_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{role_instructions}", role_instructions(req.section_role))
        .replace("{language}", language_name(language))
        .replace("{tone}", tone)
        .replace("{target}", &target.to_string())
        .replace("{unit}", unit.label())
        .replace("{outline}", &outline_for_prompt(req.section_role, outline));
    let messages = [ChatMessage::system(DRAFT_SYSTEM), ChatMessage::user(prompt)];
    let raw = call_with_fallback(llm, &messages, &opts, &config.secondary_model).await?;
    guard::ensure_clean_response(&raw)?;
    let mut text = strip_meta_phrases(&raw);
    if req.section_role != Some(SectionRole::Conclusion) {
        text = strip_leading_concluding_transition(&text);
    }
    text = text.trim().to_string();

    // Non-CJK introductions get one dedicated ±10% nudge.
    if req.section_role == Some(SectionRole::Introduction) && !language.is_cjk() {
        let measured = measure(&text, unit);
        let low = (target as f32 * 0.9) as usize;
        let high = (target as f32 * 1.1) as usize;
        if measured < low || measured > high {
            let direction = if measured < low { "Expand" } else { "Shorten" };
            let prompt = INTRO_NUDGE_PROMPT_TEMPLATE
                .replace("{direction}", direction)
                .replace("{text}", &text);
            let messages = [ChatMessage::system(DRAFT_SYSTEM), ChatMessage::user(prompt)];
            match call_with_fallback(llm, &messages, &opts, &config.secondary_model).await {
                Ok(nudged) => {
                    guard::ensure_clean_response(&nudged)?;
                    let nudged = strip_meta_phrases(&nudged).trim().to_string();
                    if !nudged.is_empty() {
                        text = collapse_to_single_paragraph(&nudged, language.is_cjk());
                    }
                }
                Err(e) => warn!(error = %e, "intro length nudge failed, keeping draft"),
            }
        }
    }

    // Under-length sections get bounded continuations.
    let policy = AssemblyPolicy::for_role(req.section_role);
    let threshold = (target as f32 * CONTINUATION_THRESHOLD) as usize;
    let mut continuations = 0;
    while continuations < policy.max_continuations && measure(&text, unit) < threshold {
        continuations += 1;
        let prompt = CONTINUATION_PROMPT_TEMPLATE
            .replace("{title}", title)
            .replace("{target}", &target.to_string())
            .replace("{unit}", unit.label())
            .replace("{text}", &text);
        let messages = [ChatMessage::system(DRAFT_SYSTEM), ChatMessage::user(prompt)];
        let reply = call_with_fallback(llm, &messages, &opts, &config.secondary_model).await?;
        guard::ensure_clean_response(&reply)?;
        let continuation = strip_meta_phrases(&reply);
        let continuation = continuation.trim();
        if continuation.is_empty() {
            break;
        }
        text = policy.append(&text, continuation);
    }

    // Meta stripping can leave a token that hid behind preamble in the
    // raw reply, so the assembled text gets its own final check.
    guard::ensure_clean_response(&text)?;
    Ok(text)
}

fn legacy_opts(config: &Config, target: u32, unit: LengthUnit) -> CallOptions {
    let factor = match unit {
        LengthUnit::CjkChar | LengthUnit::GenericChar => 1.3,
        LengthUnit::Word => 2.4,
    };
    CallOptions {
        model: config.primary_model.clone(),
        temperature: GENERATE_TEMPERATURE,
        max_tokens: ((target as f32 * factor) as u32).clamp(MIN_TOKENS, MAX_TOKENS),
        timeout: DRAFT_TIMEOUT,
    }
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::English => "English",
        Language::Chinese => "Chinese",
    }
}

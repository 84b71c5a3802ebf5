//! Outline Structuring Engine — orchestrates the full outline pipeline.
//!
//! Flow: request raw outline → normalize headers → parse → structural
//! floor → positional roles → clip/pad bodies → subtitles → sanitize
//! bullets → backfill → enrich → budgets → render.
//!
//! The section list is threaded immutably through pure transforms; only
//! the backfill/enrich steps talk to the model, and their failures are
//! non-fatal.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::guard;
use crate::language::Language;
use crate::llm_client::{call_with_fallback, CallOptions, ChatMessage, CompletionBackend};
use crate::outline::budget::{allocate_budgets, minimum_total, ExplicitPlan};
use crate::outline::bullets::{
    extract_bullet_lines, has_real_bullet, is_bullet_line, is_rationale_line,
    sanitize_section_bullets,
};
use crate::outline::parse::{
    attach_subtitles, clip_body_sections, ensure_minimum_sections, normalize_headers,
    normalize_roles, pad_body_sections, parse_sections, render_outline,
};
use crate::outline::prompts::{
    BACKFILL_PROMPT_TEMPLATE, ENRICH_PROMPT_TEMPLATE, OUTLINE_PROMPT_TEMPLATE, OUTLINE_SYSTEM,
    REGENERATE_SECTION_PROMPT_TEMPLATE,
};
use crate::outline::{OutlineSection, SectionRole};

const OUTLINE_TIMEOUT: Duration = Duration::from_secs(60);
const AUX_TIMEOUT: Duration = Duration::from_secs(30);
const OUTLINE_MAX_TOKENS: u32 = 2048;
const AUX_MAX_TOKENS: u32 = 512;
const OUTLINE_TEMPERATURE: f32 = 0.7;
const ENRICH_TEMPERATURE: f32 = 0.5;

fn default_body_count() -> usize {
    3
}

/// Outline request. `regenerate_section_index` (with
/// `current_outline_text`) switches to single-section regeneration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutlineRequest {
    pub title: String,
    pub total_length: u32,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub reference_notes: Option<String>,
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default = "default_body_count")]
    pub desired_body_count: usize,
    #[serde(default)]
    pub explicit_plan: Option<ExplicitPlan>,
    #[serde(default)]
    pub regenerate_section_index: Option<usize>,
    #[serde(default)]
    pub current_outline_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineResponse {
    pub outline_text: String,
    pub section_budgets: Vec<u32>,
}

/// Builds a structured outline (or regenerates one section in place).
pub async fn generate_outline(
    llm: &dyn CompletionBackend,
    config: &Config,
    req: &OutlineRequest,
) -> Result<OutlineResponse, AppError> {
    if let (Some(k), Some(current)) = (req.regenerate_section_index, &req.current_outline_text) {
        return regenerate_section(llm, config, req, k, current).await;
    }

    let language = req.language;
    let title = guard::sanitize_field(&req.title);
    let tone = guard::sanitize_field(&req.tone);
    let subtitles: Vec<String> = req
        .explicit_plan
        .as_ref()
        .map(|p| p.body_subtitles.iter().map(|s| guard::sanitize_field(s)).collect())
        .unwrap_or_default();

    let desired_body = req.desired_body_count.max(1);
    let section_count = desired_body + 2;
    if req.total_length < minimum_total(section_count) {
        return Err(AppError::Validation(format!(
            "total_length {} cannot cover {section_count} sections; minimum is {}",
            req.total_length,
            minimum_total(section_count)
        )));
    }
    let prompt = outline_prompt(req, &title, &tone, section_count, language);
    let messages = [ChatMessage::system(OUTLINE_SYSTEM), ChatMessage::user(prompt)];

    let raw = call_with_fallback(llm, &messages, &outline_opts(config), &config.secondary_model)
        .await
        .map_err(|e| AppError::Service(format!("outline generation failed: {e}")))?;
    guard::ensure_clean_response(&raw)?;

    let sections = parse_sections(&normalize_headers(&raw, language), language);
    let sections = ensure_minimum_sections(sections, language);
    let sections = normalize_roles(sections, language);
    let sections = clip_body_sections(sections, desired_body, language);
    let sections = pad_body_sections(sections, desired_body, language);
    let sections = attach_subtitles(sections, &subtitles, language);
    let sections: Vec<OutlineSection> = sections
        .iter()
        .map(|s| sanitize_section_bullets(s, language))
        .collect();

    let mut enriched = Vec::with_capacity(sections.len());
    for section in sections {
        enriched.push(refine_section(llm, config, &title, section, language).await);
    }

    let budgets = allocate_budgets(enriched.len(), req.total_length, req.explicit_plan.as_ref())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let sections = apply_budgets(enriched, &budgets);
    let outline_text = render_outline(&sections, language);

    info!(
        sections = sections.len(),
        total = req.total_length,
        "outline generated"
    );
    Ok(OutlineResponse {
        outline_text,
        section_budgets: budgets,
    })
}

/// Regenerates section `k` in place: only that section's lines change;
/// every other section stays byte-identical (budgets are recomputed over
/// the spliced outline, which reproduces them for an unchanged request).
async fn regenerate_section(
    llm: &dyn CompletionBackend,
    config: &Config,
    req: &OutlineRequest,
    k: usize,
    current: &str,
) -> Result<OutlineResponse, AppError> {
    let language = req.language;
    let current = guard::sanitize_field(current);
    let mut sections = parse_sections(&current, language);
    if sections.is_empty() {
        return Err(AppError::Validation(
            "current_outline_text contains no recognizable sections".to_string(),
        ));
    }
    if k == 0 || k > sections.len() {
        return Err(AppError::Validation(format!(
            "regenerate_section_index {k} out of range 1..={}",
            sections.len()
        )));
    }
    if req.total_length < minimum_total(sections.len()) {
        return Err(AppError::Validation(format!(
            "total_length {} cannot cover {} sections; minimum is {}",
            req.total_length,
            sections.len(),
            minimum_total(sections.len())
        )));
    }

    let title = guard::sanitize_field(&req.title);
    let target_title = sections[k - 1].title.clone();
    let prompt = REGENERATE_SECTION_PROMPT_TEMPLATE
        .replace("{title}", &title)
        .replace("{section_index}", &k.to_string())
        .replace("{section_title}", &target_title)
        .replace("{current_outline}", &current);
    let messages = [ChatMessage::system(OUTLINE_SYSTEM), ChatMessage::user(prompt)];

    let raw = call_with_fallback(llm, &messages, &outline_opts(config), &config.secondary_model)
        .await
        .map_err(|e| AppError::Service(format!("section regeneration failed: {e}")))?;
    guard::ensure_clean_response(&raw)?;

    // Steps applied to the isolated section only: header normalization,
    // bullet sanitization, backfill, enrichment.
    let normalized = normalize_headers(&raw, language);
    let content: Vec<String> = normalized
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| is_bullet_line(l) || is_rationale_line(l))
        .collect();

    let role = positional_role(k, sections.len());
    let fresh = OutlineSection {
        index: k as u32,
        role,
        title: target_title,
        bullet_lines: content,
        word_budget: 0,
    };
    let fresh = sanitize_section_bullets(&fresh, language);
    let fresh = refine_section(llm, config, &title, fresh, language).await;
    sections[k - 1] = fresh;

    let budgets = allocate_budgets(sections.len(), req.total_length, req.explicit_plan.as_ref())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let sections = apply_budgets(sections, &budgets);
    let outline_text = render_outline(&sections, language);

    info!(section = k, "outline section regenerated");
    Ok(OutlineResponse {
        outline_text,
        section_budgets: budgets,
    })
}

/// Backfills a placeholder-only section or enriches a real one. Both are
/// single scoped model calls; failure keeps the incoming section untouched.
async fn refine_section(
    llm: &dyn CompletionBackend,
    config: &Config,
    title: &str,
    section: OutlineSection,
    language: Language,
) -> OutlineSection {
    if has_real_bullet(&section, language) {
        enrich_section(llm, config, title, section).await
    } else {
        backfill_section(llm, config, title, section, language).await
    }
}

async fn backfill_section(
    llm: &dyn CompletionBackend,
    config: &Config,
    title: &str,
    section: OutlineSection,
    language: Language,
) -> OutlineSection {
    let prompt = BACKFILL_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{section_title}", &section.title)
        .replace("{language}", language_name(language));
    let messages = [ChatMessage::system(OUTLINE_SYSTEM), ChatMessage::user(prompt)];

    match llm.complete(&messages, &aux_opts(config)).await {
        Ok(reply) if guard::is_ciphertext_token(&reply) => {
            warn!(section = section.index, "backfill reply was ciphertext-shaped, keeping placeholder");
            section
        }
        Ok(reply) => {
            let lines = extract_bullet_lines(&reply);
            if lines.is_empty() {
                warn!(section = section.index, "backfill reply had no bullets, keeping placeholder");
                return section;
            }
            let rationale: Vec<String> = section
                .bullet_lines
                .iter()
                .filter(|l| is_rationale_line(l))
                .cloned()
                .collect();
            let mut spliced = section;
            spliced.bullet_lines = lines;
            spliced.bullet_lines.extend(rationale);
            sanitize_section_bullets(&spliced, language)
        }
        Err(e) => {
            warn!(section = section.index, error = %e, "backfill failed, keeping placeholder");
            section
        }
    }
}

async fn enrich_section(
    llm: &dyn CompletionBackend,
    config: &Config,
    title: &str,
    section: OutlineSection,
) -> OutlineSection {
    let current_bullets = section
        .bullet_lines
        .iter()
        .filter(|l| !is_rationale_line(l))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = ENRICH_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{section_title}", &section.title)
        .replace("{bullets}", &current_bullets);
    let messages = [ChatMessage::system(OUTLINE_SYSTEM), ChatMessage::user(prompt)];

    match llm.complete(&messages, &enrich_opts(config)).await {
        Ok(reply) if guard::is_ciphertext_token(&reply) => {
            warn!(section = section.index, "enrichment reply was ciphertext-shaped, skipped");
            section
        }
        Ok(reply) => {
            // Only bullet/sub-point-shaped lines survive the rewrite.
            let lines = extract_bullet_lines(&reply);
            if lines.is_empty() {
                warn!(section = section.index, "enrichment reply had no bullets, skipped");
                return section;
            }
            let rationale: Vec<String> = section
                .bullet_lines
                .iter()
                .filter(|l| is_rationale_line(l))
                .cloned()
                .collect();
            let mut upgraded = section;
            upgraded.bullet_lines = lines;
            upgraded.bullet_lines.extend(rationale);
            upgraded
        }
        Err(e) => {
            warn!(section = section.index, error = %e, "enrichment failed, skipped");
            section
        }
    }
}

fn outline_prompt(
    req: &OutlineRequest,
    title: &str,
    tone: &str,
    section_count: usize,
    language: Language,
) -> String {
    let mut extras = String::new();
    for (label, value) in [
        ("DETAIL", &req.detail),
        ("REFERENCE NOTES", &req.reference_notes),
        ("RUBRIC", &req.rubric),
    ] {
        if let Some(v) = value {
            let v = guard::sanitize_field(v);
            if !v.trim().is_empty() {
                extras.push_str(&format!("{label}: {v}\n"));
            }
        }
    }
    let header_example = language.format_header_plain(1, match language {
        Language::English => "Introduction",
        Language::Chinese => "引言",
    });
    OUTLINE_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{language}", language_name(language))
        .replace("{tone}", if tone.is_empty() { "neutral academic" } else { tone })
        .replace("{section_count}", &section_count.to_string())
        .replace("{total_length}", &req.total_length.to_string())
        .replace("{header_example}", &header_example)
        .replace("{extras}", &extras)
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::English => "English",
        Language::Chinese => "Chinese",
    }
}

fn positional_role(k: usize, len: usize) -> SectionRole {
    if k == 1 {
        SectionRole::Introduction
    } else if k == len {
        SectionRole::Conclusion
    } else {
        SectionRole::Body
    }
}

fn apply_budgets(sections: Vec<OutlineSection>, budgets: &[u32]) -> Vec<OutlineSection> {
    sections
        .into_iter()
        .zip(budgets.iter())
        .map(|(mut s, &b)| {
            s.word_budget = b;
            s
        })
        .collect()
}

fn outline_opts(config: &Config) -> CallOptions {
    CallOptions {
        model: config.primary_model.clone(),
        temperature: OUTLINE_TEMPERATURE,
        max_tokens: OUTLINE_MAX_TOKENS,
        timeout: OUTLINE_TIMEOUT,
    }
}

fn aux_opts(config: &Config) -> CallOptions {
    CallOptions {
        model: config.primary_model.clone(),
        temperature: OUTLINE_TEMPERATURE,
        max_tokens: AUX_MAX_TOKENS,
        timeout: AUX_TIMEOUT,
    }
}

fn enrich_opts(config: &Config) -> CallOptions {
    CallOptions {
        model: config.primary_model.clone(),
        temperature: ENRICH_TEMPERATURE,
        max_tokens: AUX_MAX_TOKENS,
        timeout: AUX_TIMEOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{ScriptedBackend, ScriptedReply};
    use crate::llm_client::LlmError;

    fn test_config() -> Config {
        Config {
            completion_api_key: "test-key".to_string(),
            completion_base_url: "http://localhost:1".to_string(),
            primary_model: "primary-model".to_string(),
            secondary_model: "secondary-model".to_string(),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn base_request() -> OutlineRequest {
        OutlineRequest {
            title: "photosynthesis".to_string(),
            total_length: 900,
            language: Language::English,
            tone: String::new(),
            detail: None,
            reference_notes: None,
            rubric: None,
            desired_body_count: 3,
            explicit_plan: None,
            regenerate_section_index: None,
            current_outline_text: None,
        }
    }

    fn raw_outline_five_sections() -> &'static str {
        "Section 1: Opening\n\
         - the reach of photosynthesis across ecosystems\n\
         Rationale: sets the stage\n\
         Section 2: Light\n\
         - light reactions capture photon energy\n\
         Rationale: mechanism first\n\
         Section 3: Carbon\n\
         - the Calvin cycle fixes atmospheric carbon\n\
         Rationale: follows the energy\n\
         Section 4: Limits\n\
         - temperature and water constrain the process\n\
         Rationale: adds nuance\n\
         Section 5: Closing\n\
         - photosynthesis anchors the biosphere\n\
         Rationale: ties it together"
    }

    fn enrich_reply() -> &'static str {
        "- mechanism: a concrete upgraded sentence about this part\n\
         a. supporting sub-point with a keyword hint"
    }

    #[tokio::test]
    async fn test_scenario_a_plan_budgets_and_labels() {
        let backend = ScriptedBackend::with_texts(vec![
            raw_outline_five_sections(),
            enrich_reply(),
            enrich_reply(),
            enrich_reply(),
            enrich_reply(),
            enrich_reply(),
        ]);
        let mut req = base_request();
        req.explicit_plan = Some(ExplicitPlan {
            intro_length: Some(140),
            conclusion_length: Some(140),
            body_lengths: vec![240, 240, 240],
            body_subtitles: vec![],
        });

        let response = generate_outline(&backend, &test_config(), &req).await.unwrap();

        // The plan sums to 1000 against a 900 total; drift correction
        // pulls the excess off in index order, and the sum stays exact.
        assert_eq!(response.section_budgets.iter().sum::<u32>(), 900);
        assert_eq!(response.section_budgets, vec![120, 220, 220, 220, 120]);
        assert!(response.outline_text.contains("Section 1: Introduction (120 words)"));
        assert!(response.outline_text.contains("Section 2: Body Paragraph 1 (220 words)"));
        assert!(response.outline_text.contains("Section 3: Body Paragraph 2 (220 words)"));
        assert!(response.outline_text.contains("Section 4: Body Paragraph 3 (220 words)"));
        assert!(response.outline_text.contains("Section 5: Conclusion (120 words)"));
    }

    #[tokio::test]
    async fn test_body_count_floor_and_padding() {
        // Model returns a single section; floor + padding must still yield
        // desired_body_count + 2 sections, with placeholders backfilled.
        let backend = ScriptedBackend::with_texts(vec![
            "Section 1: Only\n- one lonely but adequate point\nRationale: thin outline",
            // refine calls, one per section (order: intro enrich, three body
            // backfills, conclusion backfill)
            enrich_reply(),
            "- backfilled concrete point one\n- backfilled concrete point two",
            "- backfilled concrete point one\n- backfilled concrete point two",
            "- backfilled concrete point one\n- backfilled concrete point two",
            "- backfilled concluding point of good length",
        ]);
        let req = base_request();
        let response = generate_outline(&backend, &test_config(), &req).await.unwrap();
        assert_eq!(response.section_budgets.len(), 5);
        assert!(response.outline_text.contains("Section 5: Conclusion"));
        assert!(response.outline_text.contains("backfilled concrete point one"));
    }

    #[tokio::test]
    async fn test_backfill_failure_is_non_fatal() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::Text(
                "Section 1: Only\n- one lonely but adequate point\nRationale: thin".to_string(),
            ),
            ScriptedReply::Text(enrich_reply().to_string()),
            ScriptedReply::Fail(LlmError::EmptyContent),
            ScriptedReply::Fail(LlmError::EmptyContent),
            ScriptedReply::Fail(LlmError::EmptyContent),
            ScriptedReply::Fail(LlmError::EmptyContent),
        ]);
        let req = base_request();
        let response = generate_outline(&backend, &test_config(), &req).await.unwrap();
        // Placeholders survive; the request still succeeds.
        assert!(response
            .outline_text
            .contains(Language::English.placeholder_bullet()));
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_then_service_error() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::Fail(LlmError::Transport {
                status: 500,
                body: "boom".to_string(),
            }),
            ScriptedReply::Fail(LlmError::Transport {
                status: 500,
                body: "boom again".to_string(),
            }),
        ]);
        let req = base_request();
        let err = generate_outline(&backend, &test_config(), &req).await.unwrap_err();
        assert!(matches!(err, AppError::Service(_)));
        assert_eq!(
            backend.models_called(),
            vec!["primary-model", "secondary-model"]
        );
    }

    #[tokio::test]
    async fn test_ciphertext_outline_response_rejected() {
        let token = crate::guard::tests_support::sample_token();
        let backend = ScriptedBackend::with_texts(vec![&token]);
        let req = base_request();
        let err = generate_outline(&backend, &test_config(), &req).await.unwrap_err();
        assert!(matches!(err, AppError::Ciphertext(_)));
        assert!(!format!("{err}").contains("aes-256-gcm:Ab3"));
    }

    #[tokio::test]
    async fn test_scenario_d_regeneration_touches_only_section_two() {
        // Build the canonical current outline the engine itself would emit
        // for total=900 without a plan: budgets 120/210/220/220/130.
        let current = "Section 1: Introduction (120 words)\n\
                       - opening sweep of the topic here\n\
                       Rationale: hooks the reader\n\n\
                       Section 2: Body Paragraph 1 (210 words)\n\
                       - stale point needing regeneration\n\
                       Rationale: old reasoning\n\n\
                       Section 3: Body Paragraph 2 (220 words)\n\
                       - untouched second body point\n\
                       Rationale: stays as is\n\n\
                       Section 4: Body Paragraph 3 (220 words)\n\
                       - untouched third body point\n\
                       Rationale: stays as is\n\n\
                       Section 5: Conclusion (130 words)\n\
                       - untouched closing point\n\
                       Rationale: stays as is";
        let backend = ScriptedBackend::with_texts(vec![
            "- fresh point about light capture\n- fresh point about electron flow\nRationale: sharper focus",
            "- light capture: a concrete upgraded sentence\n- electron flow: a concrete upgraded sentence",
        ]);
        let mut req = base_request();
        req.regenerate_section_index = Some(2);
        req.current_outline_text = Some(current.to_string());

        let response = generate_outline(&backend, &test_config(), &req).await.unwrap();

        let before: Vec<&str> = current.split("\n\n").collect();
        let after: Vec<&str> = response.outline_text.split("\n\n").collect();
        assert_eq!(after.len(), 5);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(after[3], before[3]);
        assert_eq!(after[4], before[4]);
        assert_ne!(after[1], before[1]);
        assert!(after[1].starts_with("Section 2: Body Paragraph 1 (210 words)"));
        assert!(after[1].contains("light capture"));
        assert_eq!(response.section_budgets, vec![120, 210, 220, 220, 130]);
    }

    #[tokio::test]
    async fn test_regeneration_index_out_of_range() {
        let backend = ScriptedBackend::with_texts(vec![]);
        let mut req = base_request();
        req.regenerate_section_index = Some(9);
        req.current_outline_text =
            Some("Section 1: Introduction (450 words)\n- a point\n\nSection 2: Conclusion (450 words)\n- b point".to_string());
        let err = generate_outline(&backend, &test_config(), &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_total_too_small_for_sections_rejected() {
        // 5 sections need at least 250; no model call is made.
        let backend = ScriptedBackend::with_texts(vec![]);
        let mut req = base_request();
        req.total_length = 150;
        let err = generate_outline(&backend, &test_config(), &req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(backend.call_count(), 0);
    }
}

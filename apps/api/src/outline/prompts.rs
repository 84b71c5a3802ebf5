// All prompt constants for the Outline Structuring Engine.
// Placeholders in {braces} are filled with `.replace` before sending.

/// System prompt for outline generation.
pub const OUTLINE_SYSTEM: &str = "You are an expert academic writing planner. \
    Produce outlines exactly in the requested plain-text format. \
    Do NOT include any commentary outside the outline itself. \
    Do NOT use markdown code fences.";

/// Outline request template.
/// Replace: {title}, {language}, {tone}, {section_count}, {total_length},
///          {header_example}, {extras}
pub const OUTLINE_PROMPT_TEMPLATE: &str = "Create an outline for a long-form academic essay.

TOPIC: {title}
LANGUAGE: {language}
TONE: {tone}
TOTAL LENGTH: about {total_length} units of prose
SECTIONS: exactly {section_count} sections — one introduction, the body sections, one conclusion
{extras}
FORMAT RULES (follow exactly):
1. One ordinal header per section on its own line, like: {header_example}
2. Under each header, 2 to 4 primary bullets, each starting with \"- \"
3. A primary bullet may carry up to 2 lettered sub-points on their own lines, like \"a. …\"
4. End each section with exactly one rationale line starting with \"Rationale: \" (or \"理由：\" in Chinese)
5. No text before the first header or after the last section";

/// Scoped backfill request for a section that lost all real bullets.
/// Replace: {title}, {section_title}, {language}
pub const BACKFILL_PROMPT_TEMPLATE: &str = "For an academic essay on \"{title}\" ({language}), \
write 3 to 5 concrete outline bullets for the section \"{section_title}\".

Return ONLY bullet lines, each starting with \"- \". No header, no commentary.";

/// Per-section enrichment rewrite.
/// Replace: {title}, {section_title}, {bullets}
pub const ENRICH_PROMPT_TEMPLATE: &str = "Rewrite the outline bullets below for the section \
\"{section_title}\" of an essay on \"{title}\".

Upgrade every bullet to the form \"short label: one concrete sentence\". \
A bullet may keep up to 2 lettered sub-points (\"a. …\"). \
You may add one bare source-keyword hint as a sub-point where a citation would help.

CURRENT BULLETS:
{bullets}

Return ONLY bullet and sub-point lines. No header, no commentary.";

/// Single-section regeneration request.
/// Replace: {title}, {section_index}, {section_title}, {current_outline}
pub const REGENERATE_SECTION_PROMPT_TEMPLATE: &str = "Below is the current outline of an academic \
essay on \"{title}\". Regenerate ONLY section {section_index} (\"{section_title}\") with fresh, \
more concrete bullets. Keep it consistent with the surrounding sections.

CURRENT OUTLINE:
{current_outline}

Return ONLY the new content lines for section {section_index}: 2 to 4 bullets starting with \
\"- \", optional lettered sub-points, and one final rationale line. No header, no other sections.";

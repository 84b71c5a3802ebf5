// All prompt constants for the Section Draft Synthesizer.
// Placeholders in {braces} are filled with `.replace` before sending.

/// System prompt shared by every draft call. Content only: the validator
/// rejects headings, bullets, and commentary, so the prompt forbids them
/// up front.
pub const DRAFT_SYSTEM: &str = "You are an expert academic writer. \
    Return ONLY the prose of the requested paragraph. \
    No heading, no title, no bullet points, no markdown, no commentary \
    about the task, no apologies. Just the paragraph text.";

/// Primary generation request.
/// Replace: {title}, {role_instructions}, {language}, {tone}, {target},
///          {unit}, {outline}, {sources}
pub const GENERATE_PROMPT_TEMPLATE: &str = "Write one section of an academic essay on \"{title}\".

{role_instructions}
LANGUAGE: {language}
TONE: {tone}
LENGTH: as close as possible to {target} {unit}
{sources}
OUTLINE NOTES FOR THIS SECTION:
{outline}

Write it as a single continuous paragraph with no line breaks.";

/// Role instructions spliced into the generate prompt.
pub const INTRO_ROLE_INSTRUCTIONS: &str = "This is the INTRODUCTION. \
Open with the hook, give the background context, and end on the thesis \
statement. Do not cite sources. Do not summarize the essay's conclusions.";

pub const BODY_ROLE_INSTRUCTIONS: &str = "This is a BODY paragraph. \
State the claim, support it with evidence, and analyze what the evidence \
shows. At most two brief examples.";

pub const CONCLUSION_ROLE_INSTRUCTIONS: &str = "This is the CONCLUSION. \
Restate the thesis in fresh words, synthesize the body's findings, and \
close. Do not introduce new evidence or citations. Do not open with a \
stock transition such as \"In conclusion\".";

/// Targeted repair request.
/// Replace: {violations}, {target}, {unit}, {text}
pub const REPAIR_PROMPT_TEMPLATE: &str = "The paragraph below breaks these rules:
{violations}

Rewrite it so every rule is satisfied. Keep the meaning, the language, and \
the tone. Aim for {target} {unit}. Return ONLY the rewritten paragraph.

PARAGRAPH:
{text}";

/// Length-only adjustment, used when everything but the length already
/// passes. Replace: {direction}, {measured}, {target}, {unit}, {text}
pub const LENGTH_ADJUST_PROMPT_TEMPLATE: &str = "The paragraph below is {measured} {unit}; \
it must be close to {target} {unit}. {direction} it to match, changing as \
little of the wording as possible. Return ONLY the adjusted paragraph.

PARAGRAPH:
{text}";

/// Legacy free-form generation, used when the strict path exhausts its
/// attempts. Replace: {title}, {role_instructions}, {language}, {tone},
/// {target}, {unit}, {outline}
pub const LEGACY_PROMPT_TEMPLATE: &str = "Write one section of an academic essay on \"{title}\".

{role_instructions}
LANGUAGE: {language}
TONE: {tone}
LENGTH: about {target} {unit}

OUTLINE NOTES FOR THIS SECTION:
{outline}

Return only the section's prose.";

/// Legacy under-length continuation.
/// Replace: {title}, {target}, {unit}, {text}
pub const CONTINUATION_PROMPT_TEMPLATE: &str = "The section below, from an essay on \"{title}\", \
stops short of its {target} {unit} length. Continue it from exactly where \
it ends. Return ONLY the new text, without repeating any existing text.

SECTION SO FAR:
{text}";

/// Legacy ±10% shorten/expand nudge for non-CJK introductions.
/// Replace: {direction}, {text}
pub const INTRO_NUDGE_PROMPT_TEMPLATE: &str = "{direction} the paragraph below by about ten \
percent without changing its meaning or its single-paragraph shape. \
Return ONLY the adjusted paragraph.

PARAGRAPH:
{text}";

//! Response-text extraction — one narrow, swappable interface over the
//! upstream response schema.
//!
//! The completion service is not guaranteed to keep a stable shape across
//! backend models, so extraction is tiered: conventional choice fields
//! first, then known alternate single-value fields, then a last-resort
//! depth-first scan for the longest plausible string leaf. Callers never
//! touch the decoded payload directly.

use serde_json::Value;

/// Minimum length for a string leaf to survive the tier-3 scan.
const MIN_LEAF_CHARS: usize = 8;

/// Keys whose values look diagnostic rather than generative.
const DIAGNOSTIC_KEY_FRAGMENTS: &[&str] = &["error", "trace", "stack", "warning"];

/// Alternate top-level fields some backends use for the completion text.
const ALTERNATE_FIELDS: &[&str] = &[
    "output_text",
    "result",
    "response",
    "message",
    "completion",
    "text",
];

/// Extracts the completion text from a decoded response payload.
/// Returns `None` when no tier yields a non-empty string.
pub fn extract_text(payload: &Value) -> Option<String> {
    from_choices(payload)
        .or_else(|| from_alternate_fields(payload))
        .or_else(|| longest_string_leaf(payload))
}

/// Tier 1: conventional `choices[*]` content, merged across all choices.
/// Delta fragments (streaming shape) are concatenated without separators;
/// whole-message choices are joined with newlines.
fn from_choices(payload: &Value) -> Option<String> {
    let choices = payload.get("choices")?.as_array()?;
    let mut parts: Vec<&str> = Vec::new();
    let mut any_delta = false;

    for choice in choices {
        if let Some(s) = choice.pointer("/message/content").and_then(Value::as_str) {
            parts.push(s);
        } else if let Some(s) = choice.pointer("/delta/content").and_then(Value::as_str) {
            parts.push(s);
            any_delta = true;
        } else if let Some(s) = choice.get("text").and_then(Value::as_str) {
            parts.push(s);
        }
    }

    let separator = if any_delta { "" } else { "\n" };
    let merged = parts.join(separator);
    let trimmed = merged.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tier 2: known alternate single-value fields. Accepts a bare string or an
/// object carrying a string `content`.
fn from_alternate_fields(payload: &Value) -> Option<String> {
    for key in ALTERNATE_FIELDS {
        match payload.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(s)) = obj.get("content") {
                    if !s.trim().is_empty() {
                        return Some(s.trim().to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Tier 3: depth-first scan collecting string leaves of at least
/// [`MIN_LEAF_CHARS`] characters, excluding values reached under a
/// diagnostic-looking key. The longest survivor wins.
fn longest_string_leaf(payload: &Value) -> Option<String> {
    let mut best: Option<&str> = None;
    scan(payload, false, &mut best);
    best.map(|s| s.trim().to_string())
}

fn scan<'a>(value: &'a Value, under_diagnostic_key: bool, best: &mut Option<&'a str>) {
    match value {
        Value::String(s) => {
            if under_diagnostic_key {
                return;
            }
            let trimmed = s.trim();
            if trimmed.chars().count() >= MIN_LEAF_CHARS {
                let longer = best
                    .map(|b| trimmed.chars().count() > b.chars().count())
                    .unwrap_or(true);
                if longer {
                    *best = Some(trimmed);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                scan(item, under_diagnostic_key, best);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let diagnostic = under_diagnostic_key || is_diagnostic_key(key);
                scan(item, diagnostic, best);
            }
        }
        _ => {}
    }
}

fn is_diagnostic_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    DIAGNOSTIC_KEY_FRAGMENTS
        .iter()
        .any(|frag| lower.contains(frag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tier1_message_content() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "A fine paragraph."}}]
        });
        assert_eq!(extract_text(&payload).unwrap(), "A fine paragraph.");
    }

    #[test]
    fn test_tier1_merges_all_choices() {
        let payload = json!({
            "choices": [
                {"message": {"content": "First choice."}},
                {"message": {"content": "Second choice."}}
            ]
        });
        assert_eq!(extract_text(&payload).unwrap(), "First choice.\nSecond choice.");
    }

    #[test]
    fn test_tier1_delta_fragments_concatenate() {
        let payload = json!({
            "choices": [
                {"delta": {"content": "Hel"}},
                {"delta": {"content": "lo there"}}
            ]
        });
        assert_eq!(extract_text(&payload).unwrap(), "Hello there");
    }

    #[test]
    fn test_tier1_legacy_text_field() {
        let payload = json!({"choices": [{"text": "Legacy completion text."}]});
        assert_eq!(extract_text(&payload).unwrap(), "Legacy completion text.");
    }

    #[test]
    fn test_tier2_output_text() {
        let payload = json!({"output_text": "Alternate shape output."});
        assert_eq!(extract_text(&payload).unwrap(), "Alternate shape output.");
    }

    #[test]
    fn test_tier2_message_object_content() {
        let payload = json!({"message": {"content": "Nested message content."}});
        assert_eq!(extract_text(&payload).unwrap(), "Nested message content.");
    }

    #[test]
    fn test_tier2_skips_empty_values() {
        let payload = json!({"result": "", "completion": "Actual completion here."});
        assert_eq!(extract_text(&payload).unwrap(), "Actual completion here.");
    }

    #[test]
    fn test_tier3_longest_leaf_wins() {
        let payload = json!({
            "data": {"inner": ["short", "a considerably longer candidate string"]},
            "meta": "metadata-ish"
        });
        assert_eq!(
            extract_text(&payload).unwrap(),
            "a considerably longer candidate string"
        );
    }

    #[test]
    fn test_tier3_excludes_diagnostic_keys() {
        let payload = json!({
            "error_detail": "this long diagnostic string must never be extracted",
            "payload": {"value": "the real generated sentence"}
        });
        assert_eq!(extract_text(&payload).unwrap(), "the real generated sentence");
    }

    #[test]
    fn test_tier3_diagnostic_nesting_is_inherited() {
        let payload = json!({
            "stacktrace": {"frames": ["a long frame description string here"]}
        });
        assert!(extract_text(&payload).is_none());
    }

    #[test]
    fn test_nothing_extractable() {
        let payload = json!({"ok": true, "count": 3, "tag": "tiny"});
        assert!(extract_text(&payload).is_none());
    }
}

//! Sensitive-Payload Guard — detects and neutralizes stray encrypted-looking
//! tokens at every text boundary.
//!
//! Persisted source summaries may, under an upstream bug, still be encrypted.
//! Such values must never reach a prompt or generated prose, so the guard is
//! applied to (a) every user-supplied free-text field before prompt
//! interpolation, (b) every model response, and (c) once more immediately
//! before any text is returned to a caller.

use thiserror::Error;

/// Marker substituted for a ciphertext-shaped token embedded in a field.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Algorithm prefixes that open an encrypted payload. Matching is
/// case-insensitive; the payload after the prefix must be long base64-url.
const ALGO_PREFIXES: &[&str] = &["aes-256-gcm:", "aes256:", "aesgcm:", "chacha20:", "enc:", "rsa:"];

/// Minimum payload length after the prefix for a string to count as
/// ciphertext-shaped. Real encrypted summaries are far longer.
const MIN_PAYLOAD_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("model returned a ciphertext-shaped payload instead of prose")]
    ModelReturnedCiphertext,
}

/// True if `s` matches the structural signature of an encrypted payload:
/// a known algorithm prefix followed by a long run of base64-url characters.
/// Whether the payload is actually decryptable is irrelevant.
pub fn is_ciphertext_token(s: &str) -> bool {
    let t = s.trim();
    for prefix in ALGO_PREFIXES {
        if t.len() <= prefix.len() {
            continue;
        }
        // `get` refuses a slice that would split a multi-byte character,
        // which non-ASCII input hits on almost every prefix length.
        if let Some(head) = t.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                let payload = &t[prefix.len()..];
                return payload.len() >= MIN_PAYLOAD_LEN && payload.bytes().all(is_base64_url_byte);
            }
        }
    }
    false
}

fn is_base64_url_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'='
}

/// Sanitizes a user-supplied free-text field before prompt interpolation.
///
/// A field that is wholly a ciphertext-shaped token is blanked. A field that
/// merely contains one has the token replaced with [`REDACTION_MARKER`].
/// Clean input is returned byte-identical; line structure is preserved.
pub fn sanitize_field(s: &str) -> String {
    if is_ciphertext_token(s) {
        return String::new();
    }
    if !s
        .split_whitespace()
        .any(is_ciphertext_token)
    {
        return s.to_string();
    }
    s.lines()
        .map(|line| {
            if line.split_whitespace().any(is_ciphertext_token) {
                line.split_whitespace()
                    .map(|tok| {
                        if is_ciphertext_token(tok) {
                            REDACTION_MARKER
                        } else {
                            tok
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rejects a model response that is, in its entirety, a ciphertext-shaped
/// token. Such a response must never be treated as valid prose.
pub fn ensure_clean_response(s: &str) -> Result<(), GuardError> {
    if is_ciphertext_token(s) {
        return Err(GuardError::ModelReturnedCiphertext);
    }
    Ok(())
}

#[cfg(test)]
pub mod tests_support {
    /// A canonical ciphertext-shaped token shared by tests across modules.
    pub fn sample_token() -> String {
        format!("aes-256-gcm:{}", "Ab3_-9xZ".repeat(12))
    }
}

//! Continuation assembly policy — how legacy-path continuations are joined
//! onto a draft, selected by section role.
//!
//! An introduction must stay a single paragraph, so continuations join with
//! a space; other roles may grow by appended paragraphs.

use crate::outline::SectionRole;

/// Upper bound on continuation calls for any role.
const MAX_CONTINUATIONS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyPolicy {
    pub separator: &'static str,
    pub max_continuations: u32,
}

impl AssemblyPolicy {
    pub fn for_role(role: Option<SectionRole>) -> AssemblyPolicy {
        match role {
            Some(SectionRole::Introduction) => AssemblyPolicy {
                separator: " ",
                max_continuations: MAX_CONTINUATIONS,
            },
            _ => AssemblyPolicy {
                separator: "\n",
                max_continuations: MAX_CONTINUATIONS,
            },
        }
    }

    /// Joins a continuation onto the draft, dropping empty fragments.
    pub fn append(&self, draft: &str, continuation: &str) -> String {
        let continuation = continuation.trim();
        if continuation.is_empty() {
            return draft.to_string();
        }
        format!("{}{}{}", draft.trim_end(), self.separator, continuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introduction_joins_with_space() {
        let policy = AssemblyPolicy::for_role(Some(SectionRole::Introduction));
        assert_eq!(policy.separator, " ");
        assert_eq!(policy.append("First half.", "Second half."), "First half. Second half.");
    }

    #[test]
    fn test_body_joins_with_newline() {
        let policy = AssemblyPolicy::for_role(Some(SectionRole::Body));
        assert_eq!(policy.append("Para one.", "Para two."), "Para one.\nPara two.");
    }

    #[test]
    fn test_unknown_role_defaults_to_newline() {
        assert_eq!(AssemblyPolicy::for_role(None).separator, "\n");
    }

    #[test]
    fn test_empty_continuation_is_dropped() {
        let policy = AssemblyPolicy::for_role(Some(SectionRole::Body));
        assert_eq!(policy.append("Draft.", "   "), "Draft.");
    }

    #[test]
    fn test_continuations_are_bounded() {
        assert_eq!(
            AssemblyPolicy::for_role(Some(SectionRole::Conclusion)).max_continuations,
            2
        );
    }
}

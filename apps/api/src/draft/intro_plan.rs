//! Introduction bullet classification — sorts an outline fragment's bullets
//! into hook / background / thesis slots for the introduction prompt.
//!
//! Keyword tagging is fuzzy, so it is modeled as a tagged classifier with a
//! positional fallback: the first untagged bullet opens (hook), the last
//! closes (thesis), the rest ground (background). Leftover ambiguous items
//! land in an explicit unclassified bucket and are redistributed by priority
//! (thesis, then background, then hook) — never silently dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulletTag {
    Hook,
    Background,
    Thesis,
    Unclassified,
}

const HOOK_KEYWORDS: &[&str] = &[
    "hook", "question", "anecdote", "statistic", "surprising", "开场", "提问", "悬念",
];
const BACKGROUND_KEYWORDS: &[&str] = &[
    "background", "context", "definition", "history", "背景", "语境", "定义", "历史",
];
const THESIS_KEYWORDS: &[&str] = &[
    "thesis", "argue", "argument", "claim", "position", "论点", "立场", "主张", "观点",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntroPlan {
    pub hook: Vec<String>,
    pub background: Vec<String>,
    pub thesis: Vec<String>,
}

/// Classifies introduction bullets. Every input bullet ends up in exactly
/// one slot.
pub fn classify_intro_bullets(bullets: &[String]) -> IntroPlan {
    let mut tags: Vec<BulletTag> = bullets.iter().map(|b| keyword_tag(b)).collect();

    // Positional fallback over the untagged items.
    let untagged: Vec<usize> = (0..tags.len())
        .filter(|&i| tags[i] == BulletTag::Unclassified)
        .collect();
    if !untagged.is_empty() {
        if !tags.contains(&BulletTag::Hook) {
            tags[untagged[0]] = BulletTag::Hook;
        }
        if let Some(&last) = untagged.last() {
            if tags[last] == BulletTag::Unclassified && !tags.contains(&BulletTag::Thesis) {
                tags[last] = BulletTag::Thesis;
            }
        }
    }

    let mut plan = IntroPlan::default();
    let mut leftovers: Vec<String> = Vec::new();
    for (bullet, tag) in bullets.iter().zip(&tags) {
        match tag {
            BulletTag::Hook => plan.hook.push(bullet.clone()),
            BulletTag::Background => plan.background.push(bullet.clone()),
            BulletTag::Thesis => plan.thesis.push(bullet.clone()),
            BulletTag::Unclassified => leftovers.push(bullet.clone()),
        }
    }

    // Redistribute the unclassified bucket by priority.
    for bullet in leftovers {
        if plan.thesis.is_empty() {
            plan.thesis.push(bullet);
        } else if !plan.background.is_empty() || !plan.hook.is_empty() {
            plan.background.push(bullet);
        } else {
            plan.hook.push(bullet);
        }
    }

    plan
}

fn keyword_tag(bullet: &str) -> BulletTag {
    let lower = bullet.to_lowercase();
    if matches_any(&lower, THESIS_KEYWORDS) {
        BulletTag::Thesis
    } else if matches_any(&lower, HOOK_KEYWORDS) {
        BulletTag::Hook
    } else if matches_any(&lower, BACKGROUND_KEYWORDS) {
        BulletTag::Background
    } else {
        BulletTag::Unclassified
    }
}

/// Latin keywords must open a word ("thesis" never matches inside
/// "photosynthesis", while "argue" still covers "argues"). CJK keywords
/// have no word boundaries and match as substrings.
fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| {
        if k.is_ascii() {
            text.split(|c: char| !c.is_alphanumeric())
                .any(|token| token.starts_with(k))
        } else {
            text.contains(k)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullets(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keyword_tagging_wins_over_position() {
        let plan = classify_intro_bullets(&bullets(&[
            "thesis: plants drive the carbon cycle",
            "hook: a single leaf processes millions of photons",
        ]));
        assert_eq!(plan.thesis.len(), 1);
        assert_eq!(plan.hook.len(), 1);
        assert!(plan.thesis[0].contains("carbon cycle"));
    }

    #[test]
    fn test_positional_fallback_first_hook_last_thesis() {
        let plan = classify_intro_bullets(&bullets(&[
            "leaves are everywhere",
            "chlorophyll absorbs light",
            "photosynthesis shapes our atmosphere",
        ]));
        assert_eq!(plan.hook, bullets(&["leaves are everywhere"]));
        assert_eq!(plan.thesis, bullets(&["photosynthesis shapes our atmosphere"]));
        assert_eq!(plan.background, bullets(&["chlorophyll absorbs light"]));
    }

    #[test]
    fn test_latin_keywords_match_whole_words_only() {
        let plan = classify_intro_bullets(&bullets(&[
            "a surprising statistic about chlorophyll",
            "historical context of photosynthesis research",
            "this essay argues that light drives the canopy",
        ]));
        assert_eq!(
            plan.background,
            bullets(&["historical context of photosynthesis research"])
        );
        assert_eq!(
            plan.thesis,
            bullets(&["this essay argues that light drives the canopy"])
        );
        assert_eq!(plan.hook.len(), 1);
    }

    #[test]
    fn test_no_bullet_dropped() {
        let input = bullets(&["a plain point", "background of the field", "another plain point"]);
        let plan = classify_intro_bullets(&input);
        let total = plan.hook.len() + plan.background.len() + plan.thesis.len();
        assert_eq!(total, input.len());
    }

    #[test]
    fn test_leftover_fills_empty_thesis_first() {
        // Both bullets keyword-tag as hook; the explicit fallback never runs
        // for them, so neither slot steals — but nothing may be lost either.
        let plan = classify_intro_bullets(&bullets(&[
            "hook: a striking statistic",
            "hook: an opening question",
        ]));
        assert_eq!(plan.hook.len(), 2);
        assert!(plan.thesis.is_empty());
    }

    #[test]
    fn test_single_bullet_becomes_hook() {
        let plan = classify_intro_bullets(&bullets(&["an unmarked single point"]));
        assert_eq!(plan.hook.len() + plan.thesis.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(classify_intro_bullets(&[]), IntroPlan::default());
    }
}

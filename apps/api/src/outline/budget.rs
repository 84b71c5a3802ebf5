//! Budget allocation — per-section length budgets that sum exactly to the
//! requested total, each a multiple of ten with a floor of 50. Totals too
//! small to fund every section at the floor are rejected; totals that are
//! not multiples of ten leave a sub-ten remainder on one section.
//!
//! Rounding drift is corrected in ±10 steps across sections in index order;
//! earlier sections absorb drift first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Budget floor and granularity.
const MIN_BUDGET: u32 = 50;
const STEP: u32 = 10;

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("total length {total} cannot cover {section_count} sections; minimum is {minimum}")]
    InfeasibleTotal {
        total: u32,
        section_count: usize,
        minimum: u32,
    },
}

/// Smallest total that can fund `section_count` sections at the floor.
pub fn minimum_total(section_count: usize) -> u32 {
    MIN_BUDGET * section_count as u32
}

/// Fixed weights used when no explicit plan is supplied.
const INTRO_WEIGHT: f32 = 0.14;
const CONCLUSION_WEIGHT: f32 = 0.14;
/// 2-section outlines split 40/60.
const TWO_SECTION_WEIGHTS: [f32; 2] = [0.40, 0.60];

/// Caller-supplied per-section plan. Incomplete plans fall back
/// proportionally for the missing entries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplicitPlan {
    pub intro_length: Option<u32>,
    pub conclusion_length: Option<u32>,
    pub body_lengths: Vec<u32>,
    pub body_subtitles: Vec<String>,
}

/// Allocates one budget per section. The result sums exactly to `total`,
/// every entry is a multiple of ten, and none is below 50. A total that
/// cannot fund every section at the floor is rejected.
pub fn allocate_budgets(
    section_count: usize,
    total: u32,
    plan: Option<&ExplicitPlan>,
) -> Result<Vec<u32>, BudgetError> {
    if section_count == 0 {
        return Ok(vec![]);
    }
    let minimum = minimum_total(section_count);
    if total < minimum {
        return Err(BudgetError::InfeasibleTotal {
            total,
            section_count,
            minimum,
        });
    }

    let raw: Vec<f32> = match plan {
        Some(plan) if section_count >= 3 => planned_allocation(section_count, total, plan),
        _ => weighted_allocation(section_count, total),
    };

    let mut budgets: Vec<u32> = raw.iter().map(|&x| round_to_step(x)).collect();
    redistribute_drift(&mut budgets, total);
    Ok(budgets)
}

/// Weight-based allocation: intro 14%, conclusion 14%, remainder split
/// evenly across body sections.
fn weighted_allocation(section_count: usize, total: u32) -> Vec<f32> {
    let total = total as f32;
    match section_count {
        1 => vec![total],
        2 => TWO_SECTION_WEIGHTS.iter().map(|w| w * total).collect(),
        n => {
            let body_count = n - 2;
            let body_share = (1.0 - INTRO_WEIGHT - CONCLUSION_WEIGHT) / body_count as f32;
            let mut weights = vec![INTRO_WEIGHT];
            weights.extend(std::iter::repeat(body_share).take(body_count));
            weights.push(CONCLUSION_WEIGHT);
            weights.into_iter().map(|w| w * total).collect()
        }
    }
}

/// Plan-based allocation for outlines with intro + bodies + conclusion.
/// Sections the plan does not cover split the remaining total evenly.
fn planned_allocation(section_count: usize, total: u32, plan: &ExplicitPlan) -> Vec<f32> {
    let body_count = section_count - 2;
    let mut assigned: Vec<Option<f32>> = Vec::with_capacity(section_count);
    assigned.push(plan.intro_length.map(|x| x as f32));
    for i in 0..body_count {
        assigned.push(plan.body_lengths.get(i).map(|&x| x as f32));
    }
    assigned.push(plan.conclusion_length.map(|x| x as f32));

    let known_sum: f32 = assigned.iter().flatten().sum();
    let unknown_count = assigned.iter().filter(|x| x.is_none()).count();
    let remainder = (total as f32 - known_sum).max(0.0);
    let fill = if unknown_count > 0 {
        remainder / unknown_count as f32
    } else {
        0.0
    };

    assigned.into_iter().map(|x| x.unwrap_or(fill)).collect()
}

fn round_to_step(x: f32) -> u32 {
    let rounded = ((x / STEP as f32).round() as u32) * STEP;
    rounded.max(MIN_BUDGET)
}

/// Walks sections in index order, adjusting ±10 per visit, until the sum
/// is within a step of `total`. Decrements respect the floor. The caller
/// guarantees `total >= minimum_total(len)`, so the walk always converges.
/// A total that is not itself a multiple of ten leaves a sub-step
/// remainder; the first section that can absorb it does.
fn redistribute_drift(budgets: &mut [u32], total: u32) {
    let mut sum: u32 = budgets.iter().sum();
    while sum.abs_diff(total) >= STEP {
        let need_more = sum < total;
        for b in budgets.iter_mut() {
            if need_more {
                *b += STEP;
                sum += STEP;
            } else if *b > MIN_BUDGET {
                *b -= STEP;
                sum -= STEP;
            } else {
                continue;
            }
            if sum.abs_diff(total) < STEP {
                break;
            }
        }
    }
    if sum < total {
        budgets[0] += total - sum;
    } else if sum > total {
        let excess = sum - total;
        for b in budgets.iter_mut() {
            if *b >= MIN_BUDGET + excess {
                *b -= excess;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(budgets: &[u32], total: u32) {
        assert_eq!(budgets.iter().sum::<u32>(), total, "budgets {budgets:?}");
        for &b in budgets {
            assert_eq!(b % 10, 0, "budget {b} not a multiple of ten");
            assert!(b >= 50, "budget {b} below floor");
        }
    }

    #[test]
    fn test_exact_plan_assigned_directly() {
        let plan = ExplicitPlan {
            intro_length: Some(140),
            conclusion_length: Some(140),
            body_lengths: vec![240, 240, 240],
            body_subtitles: vec![],
        };
        let budgets = allocate_budgets(5, 1000, Some(&plan)).unwrap();
        assert_eq!(budgets, vec![140, 240, 240, 240, 140]);
        assert_invariants(&budgets, 1000);
    }

    #[test]
    fn test_over_budget_plan_drifts_down_to_total() {
        // The plan sums to 1000 against a 900 total; the ±10 walk pulls
        // the excess off in index order until the sum is exact.
        let plan = ExplicitPlan {
            intro_length: Some(140),
            conclusion_length: Some(140),
            body_lengths: vec![240, 240, 240],
            body_subtitles: vec![],
        };
        let budgets = allocate_budgets(5, 900, Some(&plan)).unwrap();
        assert_eq!(budgets, vec![120, 220, 220, 220, 120]);
        assert_invariants(&budgets, 900);
    }

    #[test]
    fn test_weighted_five_sections() {
        let budgets = allocate_budgets(5, 900, None).unwrap();
        assert_invariants(&budgets, 900);
        // intro/conclusion near 14% of 900 = 126 → rounded to 130, minus
        // drift absorbed in index order.
        assert!(budgets[0] <= 130);
    }

    #[test]
    fn test_drift_absorbed_in_index_order() {
        // 14% of 900 = 126 → 130; bodies 216 → 220: sum 920, drift −20
        // comes off sections 1 then 2.
        let budgets = allocate_budgets(5, 900, None).unwrap();
        assert_eq!(budgets, vec![120, 210, 220, 220, 130]);
    }

    #[test]
    fn test_two_section_split_40_60() {
        let budgets = allocate_budgets(2, 500, None).unwrap();
        assert_eq!(budgets, vec![200, 300]);
    }

    #[test]
    fn test_single_section_takes_all() {
        assert_eq!(allocate_budgets(1, 700, None).unwrap(), vec![700]);
    }

    #[test]
    fn test_incomplete_plan_proportional_fallback() {
        let plan = ExplicitPlan {
            intro_length: Some(100),
            conclusion_length: Some(100),
            body_lengths: vec![300], // second body missing
            body_subtitles: vec![],
        };
        let budgets = allocate_budgets(4, 800, Some(&plan)).unwrap();
        assert_invariants(&budgets, 800);
        assert_eq!(budgets, vec![100, 300, 300, 100]);
    }

    #[test]
    fn test_floor_of_fifty_enforced() {
        let budgets = allocate_budgets(3, 180, None).unwrap();
        for &b in &budgets {
            assert!(b >= 50);
        }
        assert_eq!(budgets.iter().sum::<u32>(), 180);
    }

    #[test]
    fn test_various_totals_keep_invariants() {
        for total in [300, 600, 900, 1200, 2000, 5000] {
            for n in 3..=8 {
                if total < minimum_total(n) {
                    continue;
                }
                let budgets = allocate_budgets(n, total, None).unwrap();
                assert_invariants(&budgets, total);
            }
        }
    }

    #[test]
    fn test_infeasible_total_rejected() {
        let err = allocate_budgets(5, 150, None).unwrap_err();
        assert!(matches!(
            err,
            BudgetError::InfeasibleTotal {
                total: 150,
                section_count: 5,
                minimum: 250,
            }
        ));
    }

    #[test]
    fn test_non_decimal_total_still_sums_exactly() {
        let budgets = allocate_budgets(5, 905, None).unwrap();
        assert_eq!(budgets.iter().sum::<u32>(), 905);
        for &b in &budgets {
            assert!(b >= 50);
        }
    }
}

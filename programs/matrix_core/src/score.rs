// programs/matrix_core/src/score.rs
//
// Queue ranking score. A higher score means higher priority for
// selection into the next cycle. The score combines elapsed wait time
// with a reentry boost whose allowance grows progressively with wait
// time, so entries that cycle over and over cannot permanently outrank
// a patient first entrant, and priority inflation has a hard ceiling.

use std::cmp::Ordering;

use crate::state::QueueEntry;

/// Fixed-point scale factor to avoid decimal division.
pub const PRECISION: u64 = 10_000;

/// Seconds of wait-time credit granted per reentry.
pub const REENTRY_WEIGHT: u64 = 600 * PRECISION;

/// Reentries beyond this count earn no additional credit.
pub const MAX_COUNTED_REENTRIES: u16 = 20;

/// Boost allowance every entry starts with.
pub const BOOST_ALLOWANCE_BASE: u64 = 1_200 * PRECISION;

/// The boost allowance grows by one step per this many seconds waited.
pub const BOOST_GROWTH_SECS: u64 = 3_600;

/// Allowance growth per step.
pub const BOOST_GROWTH_STEP: u64 = 600 * PRECISION;

/// Hard ceiling on the reentry boost, regardless of wait time.
pub const BOOST_CEILING: u64 = 7_200 * PRECISION;

/// Compute the ranking score for a queue entry snapshot.
///
/// score = wait_secs * PRECISION + min(reentry_credit, allowance)
/// where allowance = min(BASE + (wait_secs / GROWTH_SECS) * STEP, CEILING)
///
/// Pure function of its inputs: recomputing over unchanged inputs
/// yields an identical score.
pub fn calculate_score(now: i64, entered_at: i64, reentries: u16) -> u64 {
    let wait_secs = now.saturating_sub(entered_at).max(0) as u64;
    let wait_component = wait_secs.saturating_mul(PRECISION);

    let credited = reentries.min(MAX_COUNTED_REENTRIES) as u64;
    let reentry_credit = credited.saturating_mul(REENTRY_WEIGHT);

    let allowance = BOOST_ALLOWANCE_BASE
        .saturating_add((wait_secs / BOOST_GROWTH_SECS).saturating_mul(BOOST_GROWTH_STEP))
        .min(BOOST_CEILING);

    wait_component.saturating_add(reentry_credit.min(allowance))
}

/// Total order over queue entries: highest score first, then earliest
/// entry time, then lowest entry id. The entry id is assigned once at
/// admission and never reused, so the ordering is fully deterministic
/// and ranking the same queue twice produces the same selection.
pub fn rank_order(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.entered_at.cmp(&b.entered_at))
        .then(a.entry_id.cmp(&b.entry_id))
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::prelude::Pubkey;

    fn entry(entry_id: u64, entered_at: i64, reentries: u16, score: u64) -> QueueEntry {
        QueueEntry {
            entry_id,
            user: Pubkey::default(),
            quota_number: 1,
            entered_at,
            reentries,
            score,
            cycles_completed: 0,
        }
    }

    // ==================== SCORE TESTS ====================

    #[test]
    fn test_score_grows_with_wait_time() {
        let early = calculate_score(10_000, 0, 0);
        let late = calculate_score(10_000, 5_000, 0);
        assert!(early > late);
    }

    #[test]
    fn test_score_zero_wait() {
        assert_eq!(calculate_score(1_000, 1_000, 0), 0);
    }

    #[test]
    fn test_score_negative_wait_clamped() {
        // Clock skew between admission and recompute must not underflow.
        assert_eq!(calculate_score(500, 1_000, 0), 0);
    }

    #[test]
    fn test_reentry_boost_applies() {
        let plain = calculate_score(10_000, 0, 0);
        let boosted = calculate_score(10_000, 0, 1);
        assert_eq!(boosted - plain, REENTRY_WEIGHT);
    }

    #[test]
    fn test_reentry_boost_capped_by_allowance() {
        // Fresh entry: allowance is BASE only, so 20 reentries worth of
        // credit (12000s) is clamped to 1200s.
        let score = calculate_score(0, 0, 20);
        assert_eq!(score, BOOST_ALLOWANCE_BASE);
    }

    #[test]
    fn test_allowance_grows_with_wait() {
        // After 2h of waiting the allowance is 1200 + 2*600 = 2400s.
        let score = calculate_score(7_200, 0, 20);
        let wait_component = 7_200 * PRECISION;
        assert_eq!(score - wait_component, 2_400 * PRECISION);
    }

    #[test]
    fn test_boost_hard_ceiling() {
        // A week of waiting unlocks the full ceiling but never more.
        let week = 7 * 24 * 3_600;
        let score = calculate_score(week, 0, MAX_COUNTED_REENTRIES);
        let wait_component = (week as u64) * PRECISION;
        assert!(score - wait_component <= BOOST_CEILING);
    }

    #[test]
    fn test_patient_entrant_eventually_outranks_recycler() {
        // A no-reentry entry that has waited longer than the boost
        // ceiling equivalent must outrank a heavily-cycled newer entry.
        let ceiling_secs = (BOOST_CEILING / PRECISION) as i64;
        let now = 1_000_000;
        let patient = calculate_score(now, now - ceiling_secs - 1, 0);
        let recycler = calculate_score(now, now, MAX_COUNTED_REENTRIES);
        assert!(patient > recycler);
    }

    #[test]
    fn test_score_idempotent() {
        for reentries in [0u16, 1, 3, 25] {
            let a = calculate_score(50_000, 1_234, reentries);
            let b = calculate_score(50_000, 1_234, reentries);
            assert_eq!(a, b);
        }
    }

    // ==================== RANK ORDER TESTS ====================

    #[test]
    fn test_rank_order_by_score_desc() {
        let hi = entry(1, 100, 0, 500);
        let lo = entry(2, 100, 0, 300);
        assert_eq!(rank_order(&hi, &lo), Ordering::Less);
        assert_eq!(rank_order(&lo, &hi), Ordering::Greater);
    }

    #[test]
    fn test_rank_order_tiebreak_entered_at() {
        let older = entry(5, 100, 0, 500);
        let newer = entry(4, 200, 0, 500);
        assert_eq!(rank_order(&older, &newer), Ordering::Less);
    }

    #[test]
    fn test_rank_order_tiebreak_entry_id() {
        let a = entry(7, 100, 0, 500);
        let b = entry(9, 100, 0, 500);
        assert_eq!(rank_order(&a, &b), Ordering::Less);
        assert_eq!(rank_order(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_rank_order_stable_sort_reproducible() {
        let mut q1 = vec![
            entry(3, 300, 0, 400),
            entry(1, 100, 2, 900),
            entry(2, 100, 0, 900),
        ];
        let mut q2 = q1.clone();
        q1.sort_by(rank_order);
        q2.sort_by(rank_order);
        let ids: Vec<u64> = q1.iter().map(|e| e.entry_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(
            ids,
            q2.iter().map(|e| e.entry_id).collect::<Vec<u64>>()
        );
    }
}

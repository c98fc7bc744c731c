//! Point values and accuracy.

use crate::models::stats::{HitStats, JudgeTier, NoteJudgment};

pub const DEFAULT_HOLD_BONUS: u32 = 50;

/// Maps judgements to points. Holds with any non-miss judgement earn a bonus.
///
/// Has no cross-note state, so totals do not depend on judgement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSystem {
    hold_bonus: u32,
}

impl ScoreSystem {
    pub fn new(hold_bonus: u32) -> Self {
        Self { hold_bonus }
    }

    pub fn base_points(tier: JudgeTier) -> u32 {
        match tier {
            JudgeTier::Perfect => 300,
            JudgeTier::Excellent => 200,
            JudgeTier::Good => 100,
            JudgeTier::Meh => 50,
            JudgeTier::Miss => 0,
        }
    }

    pub fn calculate_score(&self, judgment: NoteJudgment, is_hold_note: bool) -> u32 {
        let base = Self::base_points(judgment.tier());
        if is_hold_note && !judgment.is_miss() {
            base + self.hold_bonus
        } else {
            base
        }
    }

    /// Weighted accuracy in percent, rounded to two decimals. 0 with no judged notes.
    ///
    /// Weights: perfect 1.0, excellent 0.9, good 0.7, meh 0.4, miss 0.
    pub fn calculate_accuracy(stats: &HitStats) -> f64 {
        let total = stats.total();
        if total == 0 {
            return 0.0;
        }

        let weighted = stats.perfect as f64
            + stats.excellent as f64 * 0.9
            + stats.good as f64 * 0.7
            + stats.meh as f64 * 0.4;

        let percent = weighted / total as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }
}

impl Default for ScoreSystem {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_BONUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::Timing;

    #[test]
    fn base_table() {
        let score = ScoreSystem::default();
        assert_eq!(score.calculate_score(NoteJudgment::Perfect, false), 300);
        assert_eq!(score.calculate_score(NoteJudgment::Excellent(Timing::Early), false), 200);
        assert_eq!(score.calculate_score(NoteJudgment::Good(Timing::Late), false), 100);
        assert_eq!(score.calculate_score(NoteJudgment::Meh(Timing::Late), false), 50);
        assert_eq!(score.calculate_score(NoteJudgment::Miss, false), 0);
    }

    #[test]
    fn hold_bonus_only_on_non_miss() {
        let score = ScoreSystem::default();
        assert_eq!(score.calculate_score(NoteJudgment::Perfect, true), 350);
        assert_eq!(score.calculate_score(NoteJudgment::Miss, true), 0);
        assert_eq!(ScoreSystem::new(10).calculate_score(NoteJudgment::Meh(Timing::Early), true), 60);
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        let mut stats = HitStats::new();
        stats.record(NoteJudgment::Perfect);
        stats.record(NoteJudgment::Good(Timing::Late));
        stats.record(NoteJudgment::Miss);
        // (1.0 + 0.7 + 0.0) / 3 = 56.666...
        assert_eq!(ScoreSystem::calculate_accuracy(&stats), 56.67);
    }

    #[test]
    fn accuracy_of_nothing_is_zero() {
        assert_eq!(ScoreSystem::calculate_accuracy(&HitStats::new()), 0.0);
    }
}

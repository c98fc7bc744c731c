//! Combo and streak bookkeeping.

use crate::models::stats::NoteJudgment;
use serde::{Deserialize, Serialize};

/// Combo thresholds and the multiplier each one unlocks, highest first.
const MULTIPLIER_STEPS: [(u32, f64); 4] = [(100, 4.0), (50, 3.0), (25, 2.0), (10, 1.5)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTracker {
    combo: u32,
    max_combo: u32,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the streak, unless the judgement is a miss (hold breaks included).
    pub fn process_hit(&mut self, judgment: NoteJudgment) {
        if judgment.is_miss() {
            self.process_miss();
            return;
        }
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
    }

    pub fn process_miss(&mut self) {
        self.combo = 0;
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// Step multiplier for the current combo. Not applied by the base score table.
    pub fn multiplier(&self) -> f64 {
        MULTIPLIER_STEPS
            .iter()
            .find(|(threshold, _)| self.combo >= *threshold)
            .map_or(1.0, |(_, multiplier)| *multiplier)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::Timing;

    #[test]
    fn hits_extend_and_misses_break() {
        let mut tracker = ComboTracker::new();
        tracker.process_hit(NoteJudgment::Perfect);
        tracker.process_hit(NoteJudgment::Meh(Timing::Late));
        assert_eq!(tracker.combo(), 2);

        tracker.process_miss();
        assert_eq!(tracker.combo(), 0);
        assert_eq!(tracker.max_combo(), 2);
    }

    #[test]
    fn miss_shaped_hit_breaks_combo() {
        let mut tracker = ComboTracker::new();
        tracker.process_hit(NoteJudgment::Perfect);
        tracker.process_hit(NoteJudgment::Miss);
        assert_eq!(tracker.combo(), 0);
        assert_eq!(tracker.max_combo(), 1);
    }

    #[test]
    fn max_combo_never_decreases() {
        let mut tracker = ComboTracker::new();
        let mut last_max = 0;
        for i in 0..40 {
            if i % 7 == 0 {
                tracker.process_miss();
            } else {
                tracker.process_hit(NoteJudgment::Perfect);
            }
            assert!(tracker.max_combo() >= last_max);
            last_max = tracker.max_combo();
        }
    }

    #[test]
    fn multiplier_steps() {
        let mut tracker = ComboTracker::new();
        assert_eq!(tracker.multiplier(), 1.0);
        for _ in 0..10 {
            tracker.process_hit(NoteJudgment::Perfect);
        }
        assert_eq!(tracker.multiplier(), 1.5);
        for _ in 0..15 {
            tracker.process_hit(NoteJudgment::Perfect);
        }
        assert_eq!(tracker.multiplier(), 2.0);
        for _ in 0..75 {
            tracker.process_hit(NoteJudgment::Perfect);
        }
        assert_eq!(tracker.multiplier(), 4.0);
    }
}

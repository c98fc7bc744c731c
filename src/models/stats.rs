//! Judgement types and hit statistics.
//!
//! A [`NoteJudgment`] is the result of classifying a single timing offset.
//! [`HitStats`] accumulates them per player and derives accuracy.

use serde::{Deserialize, Serialize};

/// Which side of the nominal time an input landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timing {
    Early,
    Late,
}

impl Timing {
    /// Positive deltas (`note_time - now`) are early, negative are late.
    pub fn from_delta(delta_ms: f64) -> Self {
        if delta_ms >= 0.0 {
            Timing::Early
        } else {
            Timing::Late
        }
    }
}

/// Judgement tier with its early/late tag.
///
/// `Perfect` and `Miss` carry no timing: perfect is symmetric, a miss has no
/// input to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteJudgment {
    Perfect,
    Excellent(Timing),
    Good(Timing),
    Meh(Timing),
    Miss,
}

/// Judgement tier without the timing tag, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JudgeTier {
    Perfect,
    Excellent,
    Good,
    Meh,
    Miss,
}

impl NoteJudgment {
    pub fn tier(self) -> JudgeTier {
        match self {
            NoteJudgment::Perfect => JudgeTier::Perfect,
            NoteJudgment::Excellent(_) => JudgeTier::Excellent,
            NoteJudgment::Good(_) => JudgeTier::Good,
            NoteJudgment::Meh(_) => JudgeTier::Meh,
            NoteJudgment::Miss => JudgeTier::Miss,
        }
    }

    pub fn timing(self) -> Option<Timing> {
        match self {
            NoteJudgment::Excellent(t) | NoteJudgment::Good(t) | NoteJudgment::Meh(t) => Some(t),
            NoteJudgment::Perfect | NoteJudgment::Miss => None,
        }
    }

    pub fn is_miss(self) -> bool {
        matches!(self, NoteJudgment::Miss)
    }
}

/// Accumulated judgement counts for one player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HitStats {
    pub perfect: u32,
    pub excellent: u32,
    pub good: u32,
    pub meh: u32,
    pub miss: u32,
    pub early: u32,
    pub late: u32,
}

impl HitStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, judgment: NoteJudgment) {
        match judgment.tier() {
            JudgeTier::Perfect => self.perfect += 1,
            JudgeTier::Excellent => self.excellent += 1,
            JudgeTier::Good => self.good += 1,
            JudgeTier::Meh => self.meh += 1,
            JudgeTier::Miss => self.miss += 1,
        }
        match judgment.timing() {
            Some(Timing::Early) => self.early += 1,
            Some(Timing::Late) => self.late += 1,
            None => {}
        }
    }

    /// Number of judged notes (hits and misses).
    pub fn total(&self) -> u32 {
        self.hits() + self.miss
    }

    /// Number of non-miss judgements.
    pub fn hits(&self) -> u32 {
        self.perfect + self.excellent + self.good + self.meh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_sign_convention() {
        assert_eq!(Timing::from_delta(12.0), Timing::Early);
        assert_eq!(Timing::from_delta(-12.0), Timing::Late);
    }

    #[test]
    fn perfect_and_miss_have_no_timing() {
        assert_eq!(NoteJudgment::Perfect.timing(), None);
        assert_eq!(NoteJudgment::Miss.timing(), None);
        assert_eq!(
            NoteJudgment::Good(Timing::Late).timing(),
            Some(Timing::Late)
        );
    }

    #[test]
    fn record_counts_tiers_and_sides() {
        let mut stats = HitStats::new();
        stats.record(NoteJudgment::Perfect);
        stats.record(NoteJudgment::Excellent(Timing::Early));
        stats.record(NoteJudgment::Meh(Timing::Late));
        stats.record(NoteJudgment::Miss);

        assert_eq!(stats.hits(), 3);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.early, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.miss, 1);
    }
}

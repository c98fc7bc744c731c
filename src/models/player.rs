//! Per-player session state derived from judgements.

use crate::logic::combo::ComboTracker;
use crate::logic::score::ScoreSystem;
use crate::models::stats::{HitStats, NoteJudgment};
use serde::{Deserialize, Serialize};

pub type PlayerId = u32;

/// Most recent judgement and its signed offset, for hit-error displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastHit {
    pub judgment: NoteJudgment,
    pub offset_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub score: u32,
    pub streak: ComboTracker,
    pub hits: u32,
    pub misses: u32,
    pub accuracy: f64,
    pub stats: HitStats,
    pub last_hit: Option<LastHit>,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn combo(&self) -> u32 {
        self.streak.combo()
    }

    pub fn max_combo(&self) -> u32 {
        self.streak.max_combo()
    }

    /// Folds one settled note into the player's totals.
    pub fn apply(&mut self, judgment: NoteJudgment, points: u32, offset_ms: Option<f64>) {
        self.stats.record(judgment);
        if judgment.is_miss() {
            self.misses += 1;
            self.streak.process_miss();
        } else {
            self.hits += 1;
            self.score += points;
            self.streak.process_hit(judgment);
        }
        self.accuracy = ScoreSystem::calculate_accuracy(&self.stats);
        self.last_hit = Some(LastHit {
            judgment,
            offset_ms,
        });
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
    fn apply_tracks_everything() {
        let mut player = PlayerState::new();
        player.apply(NoteJudgment::Perfect, 300, Some(-4.0));
        player.apply(NoteJudgment::Good(Timing::Early), 100, Some(70.0));
        assert_eq!(player.score, 400);
        assert_eq!(player.combo(), 2);
        assert_eq!(player.hits, 2);
        assert_eq!(player.accuracy, 85.0);

        player.apply(NoteJudgment::Miss, 0, None);
        assert_eq!(player.combo(), 0);
        assert_eq!(player.max_combo(), 2);
        assert_eq!(player.misses, 1);
        assert_eq!(player.score, 400);
    }

    #[test]
    fn miss_never_scores() {
        let mut player = PlayerState::new();
        player.apply(NoteJudgment::Miss, 300, None);
        assert_eq!(player.score, 0);
    }
}

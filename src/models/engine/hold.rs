//! Start and release rules for hold notes.

use super::{GameplayNote, HitWindow};
use crate::models::stats::NoteJudgment;

/// Hold-specific judgement rules, measured against the same windows as taps.
#[derive(Debug, Clone, Copy)]
pub struct HoldNoteLogic {
    window: HitWindow,
}

impl HoldNoteLogic {
    pub fn new(window: HitWindow) -> Self {
        Self { window }
    }

    /// Head judgement if the hold may start at `now`. Same rule as a tap.
    pub fn can_start_hold(&self, note: &GameplayNote, now: f64) -> Option<NoteJudgment> {
        self.window.check_note_hit(note.time_ms(), now)
    }

    /// Release lands before the end window opens.
    pub fn should_break_hold_early(&self, note: &GameplayNote, release_time: f64) -> bool {
        release_time < note.end_time_ms() as f64 - self.window.meh_ms
    }

    /// Key is still down after the end window closed. Polled every tick.
    pub fn should_break_hold_late(&self, note: &GameplayNote, now: f64) -> bool {
        now > note.end_time_ms() as f64 + self.window.meh_ms
    }

    /// Release judgement against the hold end. `None` outside the end window.
    pub fn calculate_hold_release_judgment(
        &self,
        note: &GameplayNote,
        release_time: f64,
    ) -> Option<NoteJudgment> {
        self.window.check_note_hit(note.end_time_ms(), release_time)
    }
}

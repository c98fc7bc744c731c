//! Note judgement: what a press, a release or the passage of time means.
//!
//! Every operation here is a pure function of `(notes, time, lane)` that
//! returns the transitions to apply. Applying them (note state, score, combo)
//! is the session's job.

use crate::models::engine::{
    BreakReason, GameplayNote, HitWindow, HoldNoteLogic, HoldState, NoteId, NoteState, TapState,
};
use crate::models::stats::NoteJudgment;

/// A state change decided for one note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTransition {
    pub note_id: NoteId,
    pub next: NoteState,
    /// Settling judgement for terminal states, head judgement for a hold start.
    pub judgment: NoteJudgment,
    /// Signed offset (`target - input`) when an input produced the transition.
    pub offset_ms: Option<f64>,
}

impl NoteTransition {
    /// True when this transition settles the note for good.
    pub fn settles(&self) -> bool {
        self.next.is_terminal()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoteJudgmentSystem {
    window: HitWindow,
    holds: HoldNoteLogic,
}

impl NoteJudgmentSystem {
    pub fn new(window: HitWindow) -> Self {
        Self {
            window,
            holds: HoldNoteLogic::new(window),
        }
    }

    pub fn window(&self) -> &HitWindow {
        &self.window
    }

    /// Earliest waiting note in `lane` that an input at `now` can hit.
    ///
    /// Candidates are scanned in time order: notes already past their window
    /// are skipped, and the scan stops at the first note still too early since
    /// every later one is further away.
    pub fn find_best_hittable_note<'a>(
        &self,
        notes: &'a [GameplayNote],
        lane: usize,
        now: f64,
    ) -> Option<&'a GameplayNote> {
        let mut candidates: Vec<&GameplayNote> = notes
            .iter()
            .filter(|n| n.lane() == lane && n.state().is_waiting())
            .collect();
        candidates.sort_by_key(|n| (n.time_ms(), n.id()));

        for note in candidates {
            if self.window.check_note_hit(note.time_ms(), now).is_some() {
                return Some(note);
            }
            if self.window.is_note_missed(note.time_ms(), now) {
                continue;
            }
            break;
        }
        None
    }

    /// A key press: hits a tap, or starts a hold. `None` for a ghost tap.
    pub fn process_key_press(
        &self,
        notes: &[GameplayNote],
        lane: usize,
        now: f64,
    ) -> Option<NoteTransition> {
        let note = self.find_best_hittable_note(notes, lane, now)?;
        let offset = note.time_ms() as f64 - now;

        let (next, judgment) = match note.state() {
            NoteState::Tap(_) => {
                let judgment = self.window.check_note_hit(note.time_ms(), now)?;
                (NoteState::Tap(TapState::Hit { judgment }), judgment)
            }
            NoteState::Hold(_) => {
                let start = self.holds.can_start_hold(note, now)?;
                (NoteState::Hold(HoldState::Active { start }), start)
            }
        };

        log::debug!("JUDGE: Press lane {lane} -> note {} {:?}", note.id(), judgment);
        Some(NoteTransition {
            note_id: note.id(),
            next,
            judgment,
            offset_ms: Some(offset),
        })
    }

    /// A key release: completes or breaks the active hold in `lane`, if any.
    pub fn process_key_release(
        &self,
        notes: &[GameplayNote],
        lane: usize,
        now: f64,
    ) -> Option<NoteTransition> {
        let (note, start) = notes
            .iter()
            .filter(|n| n.lane() == lane)
            .filter_map(|n| match n.state() {
                NoteState::Hold(HoldState::Active { start }) => Some((n, *start)),
                _ => None,
            })
            .min_by_key(|(n, _)| (n.time_ms(), n.id()))?;

        let offset = note.end_time_ms() as f64 - now;
        let broken = |reason| NoteTransition {
            note_id: note.id(),
            next: NoteState::Hold(HoldState::Broken {
                start: Some(start),
                reason,
            }),
            judgment: NoteJudgment::Miss,
            offset_ms: Some(offset),
        };

        if self.holds.should_break_hold_early(note, now) {
            log::debug!("JUDGE: Hold {} released early", note.id());
            return Some(broken(BreakReason::ReleasedEarly));
        }

        // Only reachable past the end window when the release beats the sweep.
        let Some(end) = self.holds.calculate_hold_release_judgment(note, now) else {
            return Some(broken(BreakReason::HeldTooLong));
        };

        log::debug!("JUDGE: Hold {} completed {:?}", note.id(), end);
        Some(NoteTransition {
            note_id: note.id(),
            next: NoteState::Hold(HoldState::Completed { start, end }),
            judgment: end,
            offset_ms: Some(offset),
        })
    }

    /// Waiting notes that scrolled past their window: taps miss, holds break.
    pub fn find_missed_notes(&self, notes: &[GameplayNote], now: f64) -> Vec<NoteTransition> {
        notes
            .iter()
            .filter(|n| n.state().is_waiting() && self.window.is_note_missed(n.time_ms(), now))
            .map(|n| {
                let next = match n.state() {
                    NoteState::Tap(_) => NoteState::Tap(TapState::Missed),
                    NoteState::Hold(_) => NoteState::Hold(HoldState::Broken {
                        start: None,
                        reason: BreakReason::Missed,
                    }),
                };
                NoteTransition {
                    note_id: n.id(),
                    next,
                    judgment: NoteJudgment::Miss,
                    offset_ms: None,
                }
            })
            .collect()
    }

    /// Active holds whose key is still down after the end window closed.
    pub fn find_broken_hold_notes(&self, notes: &[GameplayNote], now: f64) -> Vec<NoteTransition> {
        notes
            .iter()
            .filter_map(|n| match n.state() {
                NoteState::Hold(HoldState::Active { start })
                    if self.holds.should_break_hold_late(n, now) =>
                {
                    Some(NoteTransition {
                        note_id: n.id(),
                        next: NoteState::Hold(HoldState::Broken {
                            start: Some(*start),
                            reason: BreakReason::HeldTooLong,
                        }),
                        judgment: NoteJudgment::Miss,
                        offset_ms: None,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

//! Runtime notes and their judgement state machines.
//!
//! Each note carries exactly one state tag for its kind. Taps go
//! `Waiting -> Hit | Missed`, holds go
//! `Waiting -> Active -> Completed | Broken` (or `Waiting -> Broken` when the
//! head is never hit). Terminal states are never left.

use crate::error::TransitionError;
use crate::models::chart::{HitObject, NoteInfo};
use crate::models::stats::NoteJudgment;
use serde::{Deserialize, Serialize};

/// Stable note index, assigned in chart load order.
pub type NoteId = usize;

/// Why a hold ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakReason {
    /// Head was never hit.
    Missed,
    /// Key released before the end window opened.
    ReleasedEarly,
    /// Key still down after the end window closed.
    HeldTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapState {
    Waiting,
    Hit { judgment: NoteJudgment },
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
    Waiting,
    Active {
        start: NoteJudgment,
    },
    Completed {
        start: NoteJudgment,
        end: NoteJudgment,
    },
    Broken {
        start: Option<NoteJudgment>,
        reason: BreakReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Tap(TapState),
    Hold(HoldState),
}

impl NoteState {
    /// Fresh state for a chart note of the given kind.
    pub fn initial(info: &NoteInfo) -> Self {
        match info {
            NoteInfo::Tap => NoteState::Tap(TapState::Waiting),
            NoteInfo::Hold { .. } => NoteState::Hold(HoldState::Waiting),
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            NoteState::Tap(TapState::Waiting) | NoteState::Hold(HoldState::Waiting)
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, NoteState::Hold(HoldState::Active { .. }))
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            NoteState::Tap(state) => !matches!(state, TapState::Waiting),
            NoteState::Hold(state) => matches!(
                state,
                HoldState::Completed { .. } | HoldState::Broken { .. }
            ),
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_become(&self, next: &NoteState) -> bool {
        match (self, next) {
            (NoteState::Tap(TapState::Waiting), NoteState::Tap(next)) => {
                !matches!(next, TapState::Waiting)
            }
            (NoteState::Hold(HoldState::Waiting), NoteState::Hold(next)) => matches!(
                next,
                HoldState::Active { .. } | HoldState::Broken { start: None, .. }
            ),
            (NoteState::Hold(HoldState::Active { .. }), NoteState::Hold(next)) => matches!(
                next,
                HoldState::Completed { .. } | HoldState::Broken { start: Some(_), .. }
            ),
            _ => false,
        }
    }

    /// The judgement this state settles the note with, once terminal.
    ///
    /// Breaks and misses settle as [`NoteJudgment::Miss`]; completed holds
    /// settle with their release judgement.
    pub fn final_judgment(&self) -> Option<NoteJudgment> {
        match self {
            NoteState::Tap(TapState::Hit { judgment }) => Some(*judgment),
            NoteState::Tap(TapState::Missed) => Some(NoteJudgment::Miss),
            NoteState::Hold(HoldState::Completed { end, .. }) => Some(*end),
            NoteState::Hold(HoldState::Broken { .. }) => Some(NoteJudgment::Miss),
            _ => None,
        }
    }
}

/// A chart note plus its id and judgement state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameplayNote {
    id: NoteId,
    object: HitObject,
    state: NoteState,
}

impl GameplayNote {
    pub fn new(id: NoteId, object: HitObject) -> Self {
        Self {
            id,
            state: NoteState::initial(&object.note_info),
            object,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn object(&self) -> &HitObject {
        &self.object
    }

    pub fn time_ms(&self) -> i64 {
        self.object.time_ms
    }

    pub fn lane(&self) -> usize {
        self.object.lane
    }

    pub fn end_time_ms(&self) -> i64 {
        self.object.end_time_ms()
    }

    pub fn is_hold(&self) -> bool {
        self.object.is_hold()
    }

    pub fn state(&self) -> &NoteState {
        &self.state
    }

    /// Moves to `next`, refusing to leave a terminal state or to skip steps.
    pub(crate) fn transition(&mut self, next: NoteState) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal { note_id: self.id });
        }
        if !self.state.can_become(&next) {
            return Err(TransitionError::Illegal {
                note_id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Back to `Waiting`, for a new attempt on the same chart.
    pub(crate) fn reset(&mut self) {
        self.state = NoteState::initial(&self.object.note_info);
    }
}

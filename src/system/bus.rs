//! Outgoing event surface of the gameplay core.
//!
//! Every component holds a clone of the same [`EventSink`], so the wiring is
//! declared once by whoever builds the engine. Events are sent synchronously
//! from inside the call that caused them; the host drains the receiver
//! whenever it likes (typically once per frame).

use crate::logic::engine::EnginePhase;
use crate::models::engine::{BreakReason, NoteId};
use crate::models::player::PlayerId;
use crate::models::stats::NoteJudgment;
use crate::state::game::GamePhase;
use crossbeam_channel::{Receiver, Sender, unbounded};

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Engine-level phase (chart/song/audio lifecycle).
    EnginePhaseChanged(EnginePhase),
    /// Gameplay-level phase (countdown/playing/paused/finished).
    PhaseChanged(GamePhase),
    PlayerUpdated {
        player: PlayerId,
        score: u32,
        combo: u32,
        accuracy: f64,
    },
    NoteHit {
        note_id: NoteId,
        judgment: NoteJudgment,
        score: u32,
    },
    HoldStarted {
        note_id: NoteId,
        judgment: NoteJudgment,
    },
    NoteMissed {
        note_id: NoteId,
    },
    HoldBroken {
        note_id: NoteId,
        reason: BreakReason,
    },
    CountdownTick(u32),
    AudioStartRequested,
    SongLoaded,
    SongLoadError(String),
    SongTime(f64),
    AllNotesJudged,
    PlaybackStarted,
    PlaybackEnded,
}

/// Cloneable sending half. A detached sink drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<GameEvent>>,
}

impl EventSink {
    /// A sink wired to a fresh unbounded channel.
    pub fn channel() -> (Self, Receiver<GameEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: GameEvent) {
        if let Some(tx) = &self.tx {
            // The receiver going away just means nobody listens any more.
            let _ = tx.send(event);
        }
    }
}

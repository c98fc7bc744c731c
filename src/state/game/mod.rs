//! Authoritative gameplay state: phase, players and the note arena.
//!
//! `GameStateManager` is the only owner of the notes. Everything else refers
//! to notes by [`NoteId`] (their index in the arena) and asks this manager to
//! apply transitions, which keeps the terminal-state invariant in one place.

mod snapshot;

pub use snapshot::GameplaySnapshot;

use crate::error::{ChartError, TransitionError};
use crate::logic::judge::NoteTransition;
use crate::logic::score::ScoreSystem;
use crate::models::chart::{Chart, SongMeta};
use crate::models::engine::{GameplayNote, HoldState, NoteId, NoteState};
use crate::models::player::{PlayerId, PlayerState};
use crate::system::bus::{EventSink, GameEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Loading,
    Countdown,
    Playing,
    Paused,
    Finished,
}

/// Which players a settled judgement is credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    One(PlayerId),
    All,
}

pub struct GameStateManager {
    phase: GamePhase,
    song: Option<Arc<SongMeta>>,
    players: BTreeMap<PlayerId, PlayerState>,
    notes: Vec<GameplayNote>,
    scroll_speed: f64,
    current_time: f64,
    start_time: Option<f64>,
    paused_time: Option<f64>,
    countdown_value: u32,
    score_system: ScoreSystem,
    sink: EventSink,
}

impl GameStateManager {
    pub fn new(score_system: ScoreSystem, sink: EventSink) -> Self {
        Self {
            phase: GamePhase::Loading,
            song: None,
            players: BTreeMap::new(),
            notes: Vec::new(),
            scroll_speed: 1.0,
            current_time: 0.0,
            start_time: None,
            paused_time: None,
            countdown_value: 0,
            score_system,
            sink,
        }
    }

    /// Builds the note arena from a chart. Ids follow chart order.
    pub fn load_chart(&mut self, chart: &Chart) -> Result<(), ChartError> {
        chart.validate()?;
        self.notes = chart
            .hit_objects
            .iter()
            .enumerate()
            .map(|(id, object)| GameplayNote::new(id, *object))
            .collect();
        self.scroll_speed = chart.scroll_speed;
        self.clear_timing();
        self.set_phase(GamePhase::Loading);
        log::info!(
            "STATE: Loaded {} notes over {} lanes",
            self.notes.len(),
            chart.lanes
        );
        Ok(())
    }

    /// Fresh state for each id. Replaces any previous player set.
    pub fn initialize_players(&mut self, ids: &[PlayerId]) {
        self.players = ids.iter().map(|id| (*id, PlayerState::new())).collect();
    }

    pub fn set_song(&mut self, song: Arc<SongMeta>) {
        self.song = Some(song);
    }

    pub fn song(&self) -> Option<&Arc<SongMeta>> {
        self.song.as_ref()
    }

    pub fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            log::info!("STATE: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.sink.emit(GameEvent::PhaseChanged(phase));
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn set_countdown(&mut self, value: u32) {
        self.countdown_value = value;
    }

    pub fn countdown_value(&self) -> u32 {
        self.countdown_value
    }

    pub fn start(&mut self, now: f64) {
        self.start_time = Some(now);
        self.current_time = now;
        self.set_phase(GamePhase::Playing);
    }

    pub fn set_time(&mut self, now: f64) {
        self.current_time = now;
    }

    pub fn pause(&mut self, now: f64) {
        if self.phase == GamePhase::Playing {
            self.paused_time = Some(now);
            self.set_phase(GamePhase::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.paused_time = None;
            self.set_phase(GamePhase::Playing);
        }
    }

    /// Applies a judged transition to its note and, when it settles the
    /// note, to the receiving players.
    pub fn apply_transition(
        &mut self,
        transition: &NoteTransition,
        recipients: Recipients,
    ) -> Result<(), TransitionError> {
        let note = self
            .notes
            .get_mut(transition.note_id)
            .ok_or(TransitionError::UnknownNote(transition.note_id))?;
        note.transition(transition.next)?;
        let is_hold = note.is_hold();
        let note_id = transition.note_id;

        if !transition.settles() {
            self.sink.emit(GameEvent::HoldStarted {
                note_id,
                judgment: transition.judgment,
            });
            return Ok(());
        }

        let points = self
            .score_system
            .calculate_score(transition.judgment, is_hold);
        self.credit(recipients, transition, points);

        let event = match transition.next {
            NoteState::Hold(HoldState::Broken { reason, .. }) => {
                GameEvent::HoldBroken { note_id, reason }
            }
            _ if transition.judgment.is_miss() => GameEvent::NoteMissed { note_id },
            _ => GameEvent::NoteHit {
                note_id,
                judgment: transition.judgment,
                score: points,
            },
        };
        self.sink.emit(event);
        Ok(())
    }

    fn credit(&mut self, recipients: Recipients, transition: &NoteTransition, points: u32) {
        let sink = &self.sink;
        let apply = |id: PlayerId, player: &mut PlayerState| {
            player.apply(transition.judgment, points, transition.offset_ms);
            sink.emit(GameEvent::PlayerUpdated {
                player: id,
                score: player.score,
                combo: player.combo(),
                accuracy: player.accuracy,
            });
        };

        match recipients {
            Recipients::All => {
                for (id, player) in self.players.iter_mut() {
                    apply(*id, player);
                }
            }
            Recipients::One(id) => match self.players.get_mut(&id) {
                Some(player) => apply(id, player),
                None => log::warn!("STATE: Judgement for unknown player {id} dropped"),
            },
        }
    }

    /// True when at least one note is loaded and every note is settled.
    pub fn all_notes_judged(&self) -> bool {
        !self.notes.is_empty() && self.notes.iter().all(|n| n.state().is_terminal())
    }

    pub fn notes_remaining(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| !n.state().is_terminal())
            .count()
    }

    pub fn notes(&self) -> &[GameplayNote] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&GameplayNote> {
        self.notes.get(id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, PlayerState> {
        &self.players
    }

    pub fn scroll_speed(&self) -> f64 {
        self.scroll_speed
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn paused_time(&self) -> Option<f64> {
        self.paused_time
    }

    /// New attempt on the same chart: every note waiting, every player zeroed.
    pub fn reset(&mut self) {
        for note in &mut self.notes {
            note.reset();
        }
        for player in self.players.values_mut() {
            player.reset();
        }
        self.clear_timing();
        self.set_phase(GamePhase::Loading);
    }

    fn clear_timing(&mut self) {
        self.current_time = 0.0;
        self.start_time = None;
        self.paused_time = None;
        self.countdown_value = 0;
    }
}

//! Render snapshot of the gameplay state.

use super::{GamePhase, GameStateManager};
use crate::models::engine::GameplayNote;
use crate::models::player::{PlayerId, PlayerState};
use std::collections::BTreeMap;

/// Immutable capture of what a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct GameplaySnapshot {
    pub phase: GamePhase,
    pub song_time: f64,
    pub scroll_speed: f64,
    pub countdown: u32,
    pub visible_notes: Vec<GameplayNote>,
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub notes_remaining: usize,
}

impl GameStateManager {
    /// Notes still worth drawing between `now` and `now + lookahead_ms`.
    ///
    /// Settled notes are dropped. Holds stay visible until their end passes.
    pub fn snapshot(&self, now: f64, lookahead_ms: f64) -> GameplaySnapshot {
        let max_visible_time = now + lookahead_ms;

        let visible_notes = self
            .notes()
            .iter()
            .filter(|n| (n.time_ms() as f64) <= max_visible_time)
            .filter(|n| !n.state().is_terminal())
            .filter(|n| !n.is_hold() || n.end_time_ms() as f64 >= now || n.state().is_waiting())
            .cloned()
            .collect();

        GameplaySnapshot {
            phase: self.phase(),
            song_time: now,
            scroll_speed: self.scroll_speed(),
            countdown: self.countdown_value(),
            visible_notes,
            players: self.players().clone(),
            notes_remaining: self.notes_remaining(),
        }
    }
}

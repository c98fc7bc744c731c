//! Error types for chart loading, configuration, audio and engine control.

use crate::logic::engine::EnginePhase;
use crate::models::engine::{NoteId, NoteState};
use std::path::PathBuf;
use thiserror::Error;

/// A chart that cannot be played as authored.
#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("Chart has no lanes")]
    NoLanes,

    #[error("Hold note #{index} has non-positive duration {duration_ms}ms")]
    InvalidHoldDuration { index: usize, duration_ms: i64 },

    #[error("Note #{index} uses lane {lane} but the chart only has {lanes} lanes")]
    LaneOutOfRange {
        index: usize,
        lane: usize,
        lanes: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(
        "Timing windows must be positive and ordered perfect <= excellent <= good <= meh (got {perfect}/{excellent}/{good}/{meh})"
    )]
    InvalidWindows {
        perfect: f64,
        excellent: f64,
        good: f64,
        meh: f64,
    },

    #[error("Unknown key name {key:?} in {lanes}K bindings")]
    UnknownKey { lanes: usize, key: String },
}

/// Reported by the audio collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("Failed to load audio: {0}")]
    Load(String),

    #[error("No playable audio instance: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No chart has been initialized")]
    NoChart,

    #[error("No song has been loaded")]
    NoSong,

    #[error("Cannot {operation} while engine is {phase:?}")]
    InvalidPhase {
        phase: EnginePhase,
        operation: &'static str,
    },
}

/// Rejected note state change.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Note {note_id} is already in a terminal state")]
    Terminal { note_id: NoteId },

    #[error("Note {0} does not exist")]
    UnknownNote(NoteId),

    #[error("Note {note_id} cannot move from {from:?} to {to:?}")]
    Illegal {
        note_id: NoteId,
        from: NoteState,
        to: NoteState,
    },
}

/// Error returned by an event queue handler. Logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

//! Gameplay core of a lane-based rhythm game.
//!
//! The crate judges key input against a chart of tap and hold notes,
//! keeps score and combo per player, and reconciles song time from audio
//! progress reports. Rendering, audio decoding and chart parsing belong to
//! the host; it talks to the core through [`logic::engine::GameEngine`] and
//! listens on the [`system::bus::GameEvent`] channel.

pub mod core;
pub mod error;
pub mod logic;
pub mod models;
pub mod state;
pub mod system;

pub use error::{AudioError, ChartError, ConfigError, EngineError, TransitionError};
pub use logic::engine::{EnginePhase, GameEngine};
pub use logic::gameplay::{GameplayManager, SessionStage};
pub use models::chart::{Chart, HitObject, NoteInfo, SongMeta};
pub use models::settings::GameplayConfig;
pub use system::bus::{EventSink, GameEvent};

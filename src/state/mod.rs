//! Session state owned by the gameplay manager.

pub mod game;

pub use game::{GamePhase, GameStateManager, GameplaySnapshot, Recipients};

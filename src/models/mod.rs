//! Plain data: charts, notes, players, statistics and configuration.

pub mod chart;
pub mod engine;
pub mod player;
pub mod settings;
pub mod stats;

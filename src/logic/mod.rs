//! Gameplay rules and orchestration.
//!
//! Pure judgement lives in [`judge`], scoring in [`combo`] and [`score`].
//! [`gameplay`] drives a session over those, and [`engine`] drives the
//! session from audio and the host's frame loop.

pub mod audio;
pub mod combo;
pub mod engine;
pub mod gameplay;
pub mod judge;
pub mod score;
pub mod timer;

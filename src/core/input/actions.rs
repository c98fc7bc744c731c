//! Input event shapes shared between the host and the gameplay session.

use winit::keyboard::KeyCode;

/// Edge of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Press,
    Release,
}

/// A raw key event stamped with the host's system time (ms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyInput {
    pub kind: InputKind,
    pub key: KeyCode,
    pub timestamp_ms: f64,
}

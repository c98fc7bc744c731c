use crate::error::ConfigError;
use crate::models::settings::GameplayConfig;
use std::collections::HashMap;
use winit::keyboard::KeyCode;

/// Key to lane table for one lane count.
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    lanes: HashMap<KeyCode, usize>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table for `lane_count` lanes from the configured key names.
    ///
    /// A lane count with no configured keys yields an empty table: every key
    /// is then unmapped and ignored.
    pub fn from_config(config: &GameplayConfig, lane_count: usize) -> Result<Self, ConfigError> {
        let mut bindings = Self::new();
        let Some(names) = config.keybinds.get(&lane_count.to_string()) else {
            log::warn!("CONFIG: No keybinds for {lane_count}K, all keys unmapped");
            return Ok(bindings);
        };

        for (lane, name) in names.iter().enumerate().take(lane_count) {
            let key = parse_keycode(name).ok_or_else(|| ConfigError::UnknownKey {
                lanes: lane_count,
                key: name.clone(),
            })?;
            // A key listed twice ends up on the later lane.
            bindings.bind(key, lane);
        }
        Ok(bindings)
    }

    pub fn bind(&mut self, key: KeyCode, lane: usize) {
        self.lanes.insert(key, lane);
    }

    pub fn lane_for(&self, key: KeyCode) -> Option<usize> {
        self.lanes.get(&key).copied()
    }

    /// Some key bound to `lane`. Used by autoplay.
    pub fn key_for(&self, lane: usize) -> Option<KeyCode> {
        self.lanes
            .iter()
            .find(|(_, l)| **l == lane)
            .map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

pub fn parse_keycode(s: &str) -> Option<KeyCode> {
    match s {
        "KeyA" => Some(KeyCode::KeyA), "KeyB" => Some(KeyCode::KeyB), "KeyC" => Some(KeyCode::KeyC),
        "KeyD" => Some(KeyCode::KeyD), "KeyE" => Some(KeyCode::KeyE), "KeyF" => Some(KeyCode::KeyF),
        "KeyG" => Some(KeyCode::KeyG), "KeyH" => Some(KeyCode::KeyH), "KeyI" => Some(KeyCode::KeyI),
        "KeyJ" => Some(KeyCode::KeyJ), "KeyK" => Some(KeyCode::KeyK), "KeyL" => Some(KeyCode::KeyL),
        "KeyM" => Some(KeyCode::KeyM), "KeyN" => Some(KeyCode::KeyN), "KeyO" => Some(KeyCode::KeyO),
        "KeyP" => Some(KeyCode::KeyP), "KeyQ" => Some(KeyCode::KeyQ), "KeyR" => Some(KeyCode::KeyR),
        "KeyS" => Some(KeyCode::KeyS), "KeyT" => Some(KeyCode::KeyT), "KeyU" => Some(KeyCode::KeyU),
        "KeyV" => Some(KeyCode::KeyV), "KeyW" => Some(KeyCode::KeyW), "KeyX" => Some(KeyCode::KeyX),
        "KeyY" => Some(KeyCode::KeyY), "KeyZ" => Some(KeyCode::KeyZ),
        "Digit0" => Some(KeyCode::Digit0), "Digit1" => Some(KeyCode::Digit1), "Digit2" => Some(KeyCode::Digit2),
        "Digit3" => Some(KeyCode::Digit3), "Digit4" => Some(KeyCode::Digit4), "Digit5" => Some(KeyCode::Digit5),
        "Digit6" => Some(KeyCode::Digit6), "Digit7" => Some(KeyCode::Digit7), "Digit8" => Some(KeyCode::Digit8),
        "Digit9" => Some(KeyCode::Digit9),
        "Space" => Some(KeyCode::Space), "Enter" => Some(KeyCode::Enter), "Tab" => Some(KeyCode::Tab),
        "ShiftLeft" => Some(KeyCode::ShiftLeft), "ShiftRight" => Some(KeyCode::ShiftRight),
        "ControlLeft" => Some(KeyCode::ControlLeft), "ControlRight" => Some(KeyCode::ControlRight),
        "AltLeft" => Some(KeyCode::AltLeft), "AltRight" => Some(KeyCode::AltRight),
        "ArrowLeft" => Some(KeyCode::ArrowLeft), "ArrowDown" => Some(KeyCode::ArrowDown),
        "ArrowUp" => Some(KeyCode::ArrowUp), "ArrowRight" => Some(KeyCode::ArrowRight),
        "Semicolon" => Some(KeyCode::Semicolon), "Quote" => Some(KeyCode::Quote),
        "Comma" => Some(KeyCode::Comma), "Period" => Some(KeyCode::Period), "Slash" => Some(KeyCode::Slash),
        "Backslash" => Some(KeyCode::Backslash), "BracketLeft" => Some(KeyCode::BracketLeft), "BracketRight" => Some(KeyCode::BracketRight),
        "Minus" => Some(KeyCode::Minus), "Equal" => Some(KeyCode::Equal),
        _ => None,
    }
}

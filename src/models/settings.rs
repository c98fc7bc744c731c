//! Gameplay configuration, loaded from TOML.

use crate::error::ConfigError;
use crate::logic::score::DEFAULT_HOLD_BONUS;
use crate::models::engine::HitWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    pub timing_windows: HitWindow,
    pub countdown_seconds: u32,
    pub hold_bonus: u32,
    /// Audio reports younger than this are trusted as-is.
    pub audio_sync_threshold_ms: f64,
    /// Visible lookahead at scroll multiplier 1.0.
    pub base_scroll_ms: f64,
    /// Lane count (as a string key) to key names, one per lane.
    pub keybinds: HashMap<String, Vec<String>>,
}

impl GameplayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("CONFIG: Loaded {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing_windows.validate()
    }

    fn default_keybinds() -> HashMap<String, Vec<String>> {
        let binds: [(usize, &[&str]); 4] = [
            (4, &["KeyD", "KeyF", "KeyJ", "KeyK"]),
            (5, &["KeyD", "KeyF", "Space", "KeyJ", "KeyK"]),
            (6, &["KeyS", "KeyD", "KeyF", "KeyJ", "KeyK", "KeyL"]),
            (7, &["KeyS", "KeyD", "KeyF", "Space", "KeyJ", "KeyK", "KeyL"]),
        ];
        binds
            .into_iter()
            .map(|(lanes, keys)| {
                (
                    lanes.to_string(),
                    keys.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect()
    }
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            timing_windows: HitWindow::new(),
            countdown_seconds: 3,
            hold_bonus: DEFAULT_HOLD_BONUS,
            audio_sync_threshold_ms: 100.0,
            base_scroll_ms: 1500.0,
            keybinds: Self::default_keybinds(),
        }
    }
}

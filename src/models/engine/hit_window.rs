//! Hit window timing thresholds and offset classification.

use crate::error::ConfigError;
use crate::models::stats::{NoteJudgment, Timing};
use serde::{Deserialize, Serialize};

/// Four nested symmetric windows, in milliseconds: perfect ⊂ excellent ⊂ good ⊂ meh.
///
/// Every boundary is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitWindow {
    pub perfect_ms: f64,
    pub excellent_ms: f64,
    pub good_ms: f64,
    pub meh_ms: f64,
}

impl HitWindow {
    /// Defaults used when no config overrides them.
    pub fn new() -> Self {
        Self {
            perfect_ms: 30.0,
            excellent_ms: 60.0,
            good_ms: 90.0,
            meh_ms: 150.0,
        }
    }

    /// Builds a window set, rejecting non-positive or unordered radii.
    pub fn from_custom(perfect: f64, excellent: f64, good: f64, meh: f64) -> Result<Self, ConfigError> {
        let window = Self {
            perfect_ms: perfect,
            excellent_ms: excellent,
            good_ms: good,
            meh_ms: meh,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.perfect_ms > 0.0
            && self.perfect_ms <= self.excellent_ms
            && self.excellent_ms <= self.good_ms
            && self.good_ms <= self.meh_ms;

        if ordered {
            Ok(())
        } else {
            Err(ConfigError::InvalidWindows {
                perfect: self.perfect_ms,
                excellent: self.excellent_ms,
                good: self.good_ms,
                meh: self.meh_ms,
            })
        }
    }

    /// Classifies a signed offset (`target - now`). `None` outside the meh window.
    pub fn classify(&self, delta_ms: f64) -> Option<NoteJudgment> {
        let abs_diff = delta_ms.abs();
        let timing = Timing::from_delta(delta_ms);

        if abs_diff <= self.perfect_ms {
            Some(NoteJudgment::Perfect)
        } else if abs_diff <= self.excellent_ms {
            Some(NoteJudgment::Excellent(timing))
        } else if abs_diff <= self.good_ms {
            Some(NoteJudgment::Good(timing))
        } else if abs_diff <= self.meh_ms {
            Some(NoteJudgment::Meh(timing))
        } else {
            None
        }
    }

    /// Judgement for an input at `now` against a target time, if it is hittable.
    pub fn check_note_hit(&self, target_ms: i64, now: f64) -> Option<NoteJudgment> {
        self.classify(target_ms as f64 - now)
    }

    /// True once the target has scrolled past the late edge of the meh window.
    pub fn is_note_missed(&self, target_ms: i64, now: f64) -> bool {
        (target_ms as f64 - now) < -self.meh_ms
    }

    /// True while the target is still beyond the early edge of the meh window.
    pub fn is_too_early(&self, target_ms: i64, now: f64) -> bool {
        (target_ms as f64 - now) > self.meh_ms
    }
}

impl Default for HitWindow {
    fn default() -> Self {
        Self::new()
    }
}

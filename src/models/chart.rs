//! Chart-authored note events and song metadata.
//!
//! Charts arrive already converted from their source format. The only check
//! performed here is the one judgement depends on: holds need a positive
//! duration and every note must sit in an existing lane.

use crate::error::ChartError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind-specific data of a chart note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteInfo {
    Tap,
    Hold {
        #[serde(default)]
        duration_ms: i64,
    },
}

/// A single timed note event, immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitObject {
    pub time_ms: i64,
    pub lane: usize,
    pub note_info: NoteInfo,
}

impl HitObject {
    pub fn tap(time_ms: i64, lane: usize) -> Self {
        Self {
            time_ms,
            lane,
            note_info: NoteInfo::Tap,
        }
    }

    pub fn hold(time_ms: i64, lane: usize, duration_ms: i64) -> Self {
        Self {
            time_ms,
            lane,
            note_info: NoteInfo::Hold { duration_ms },
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.note_info, NoteInfo::Hold { .. })
    }

    /// Hold end time; the head time for taps.
    pub fn end_time_ms(&self) -> i64 {
        match self.note_info {
            NoteInfo::Tap => self.time_ms,
            NoteInfo::Hold { duration_ms } => self.time_ms + duration_ms,
        }
    }
}

fn default_scroll_speed() -> f64 {
    1.0
}

/// One playable difficulty: notes plus lane and scroll metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub lanes: usize,
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: f64,
    pub hit_objects: Vec<HitObject>,
}

impl Chart {
    pub fn new(lanes: usize, hit_objects: Vec<HitObject>) -> Self {
        Self {
            lanes,
            scroll_speed: default_scroll_speed(),
            hit_objects,
        }
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.lanes == 0 {
            return Err(ChartError::NoLanes);
        }

        for (index, object) in self.hit_objects.iter().enumerate() {
            if object.lane >= self.lanes {
                return Err(ChartError::LaneOutOfRange {
                    index,
                    lane: object.lane,
                    lanes: self.lanes,
                });
            }
            if let NoteInfo::Hold { duration_ms } = object.note_info
                && duration_ms <= 0
            {
                return Err(ChartError::InvalidHoldDuration { index, duration_ms });
            }
        }
        Ok(())
    }

    /// Time of the last note end, or 0 for an empty chart.
    pub fn length_ms(&self) -> i64 {
        self.hit_objects
            .iter()
            .map(HitObject::end_time_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Song the chart belongs to. Shared by reference, never owned by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMeta {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub audio_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_length_hold() {
        let chart = Chart::new(4, vec![HitObject::tap(0, 0), HitObject::hold(500, 1, 0)]);
        assert_eq!(
            chart.validate(),
            Err(ChartError::InvalidHoldDuration {
                index: 1,
                duration_ms: 0
            })
        );
    }

    #[test]
    fn rejects_lane_outside_chart() {
        let chart = Chart::new(4, vec![HitObject::tap(0, 4)]);
        assert!(matches!(
            chart.validate(),
            Err(ChartError::LaneOutOfRange { lane: 4, .. })
        ));
    }

    #[test]
    fn hold_without_duration_parses_as_invalid() {
        let json = r#"{"lanes":4,"hit_objects":[{"time_ms":100,"lane":0,"note_info":{"type":"hold"}}]}"#;
        let chart: Chart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.scroll_speed, 1.0);
        assert!(chart.validate().is_err());
    }

    #[test]
    fn length_uses_hold_ends() {
        let chart = Chart::new(4, vec![HitObject::hold(1000, 0, 500), HitObject::tap(1200, 1)]);
        assert_eq!(chart.length_ms(), 1500);
    }
}

//! Audio collaborator surface and song-time reconciliation.
//!
//! The gameplay core never decodes audio. A host backend implements
//! [`AudioPlayer`] and pushes `(progress, duration)` reports to the engine,
//! which turns them into song time through an [`AudioClock`].

use crate::error::AudioError;
use crate::models::chart::SongMeta;

/// Control surface of an audio backend.
pub trait AudioPlayer {
    /// Prepares the track. Called again on retry after a failure.
    fn load(&mut self, song: &SongMeta) -> Result<(), AudioError>;
    /// Starts playback from the beginning of the loaded track.
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

/// Backend that plays nothing. Used by the headless runner, where the host
/// derives progress reports from its own clock.
#[derive(Debug, Default)]
pub struct SilentAudio {
    loaded: Option<String>,
    playing: bool,
}

impl SilentAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl AudioPlayer for SilentAudio {
    fn load(&mut self, song: &SongMeta) -> Result<(), AudioError> {
        log::info!("AUDIO: Silent backend loaded '{}'", song.title);
        self.loaded = Some(song.title.clone());
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if self.loaded.is_none() {
            return Err(AudioError::Unavailable("no track loaded".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn resume(&mut self) {
        if self.loaded.is_some() {
            self.playing = true;
        }
    }

    fn stop(&mut self) {
        self.playing = false;
    }
}

/// Hybrid song clock.
///
/// A report younger than `threshold_ms` (system time) is trusted as-is.
/// Once it gets older, time is extrapolated from the report with the system
/// clock. While paused the clock is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClock {
    threshold_ms: f64,
    audio_time_ms: f64,
    duration_ms: f64,
    reported_at: Option<f64>,
    paused: bool,
}

impl AudioClock {
    pub fn new(threshold_ms: f64) -> Self {
        Self {
            threshold_ms,
            audio_time_ms: 0.0,
            duration_ms: 0.0,
            reported_at: None,
            paused: false,
        }
    }

    /// Records a backend report. `progress` is clamped to `[0, 1]`.
    pub fn report(&mut self, progress: f64, duration_s: f64, system_now: f64) {
        let duration_ms = duration_s.max(0.0) * 1000.0;
        self.duration_ms = duration_ms;
        self.audio_time_ms = progress.clamp(0.0, 1.0) * duration_ms;
        self.reported_at = Some(system_now);
    }

    /// Playback began at `system_now`: song time 0, running.
    pub fn start(&mut self, system_now: f64) {
        self.audio_time_ms = 0.0;
        self.reported_at = Some(system_now);
        self.paused = false;
    }

    /// Song time at `system_now`.
    pub fn song_time(&self, system_now: f64) -> f64 {
        if self.paused {
            return self.audio_time_ms;
        }
        match self.reported_at {
            Some(at) => {
                let elapsed = system_now - at;
                if elapsed < 0.0 {
                    // Stamped before the report: measure back from it.
                    (self.audio_time_ms + elapsed).max(0.0)
                } else if elapsed < self.threshold_ms {
                    self.audio_time_ms
                } else {
                    self.audio_time_ms + elapsed
                }
            }
            None => self.audio_time_ms,
        }
    }

    /// Freezes at the current song time.
    pub fn pause(&mut self, system_now: f64) {
        if !self.paused {
            self.audio_time_ms = self.song_time(system_now);
            self.paused = true;
        }
    }

    /// Unfreezes. The frozen time counts as a fresh report.
    pub fn resume(&mut self, system_now: f64) {
        if self.paused {
            self.paused = false;
            self.reported_at = Some(system_now);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.threshold_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_trusted() {
        let mut clock = AudioClock::new(100.0);
        clock.report(0.5, 10.0, 2000.0);
        assert_eq!(clock.song_time(2000.0), 5000.0);
        assert_eq!(clock.song_time(2099.0), 5000.0);
    }

    #[test]
    fn stale_report_is_extrapolated() {
        let mut clock = AudioClock::new(100.0);
        clock.report(0.5, 10.0, 2000.0);
        assert_eq!(clock.song_time(2100.0), 5100.0);
        assert_eq!(clock.song_time(2250.0), 5250.0);
    }

    #[test]
    fn timestamps_before_the_report_count_back() {
        let mut clock = AudioClock::new(100.0);
        clock.report(0.1, 10.0, 2000.0);
        assert_eq!(clock.song_time(1960.0), 960.0);
        assert_eq!(clock.song_time(500.0), 0.0);
    }

    #[test]
    fn pause_freezes_time() {
        let mut clock = AudioClock::new(100.0);
        clock.report(0.1, 10.0, 0.0);
        clock.pause(300.0);
        assert_eq!(clock.song_time(300.0), 1300.0);
        assert_eq!(clock.song_time(5000.0), 1300.0);

        clock.resume(5000.0);
        assert_eq!(clock.song_time(5050.0), 1300.0);
        assert_eq!(clock.song_time(5200.0), 1500.0);
    }

    #[test]
    fn progress_is_clamped() {
        let mut clock = AudioClock::new(100.0);
        clock.report(1.7, 2.0, 0.0);
        assert_eq!(clock.song_time(0.0), 2000.0);
        clock.report(-0.2, 2.0, 0.0);
        assert_eq!(clock.song_time(0.0), 0.0);
    }

    #[test]
    fn silent_audio_needs_a_track() {
        let mut audio = SilentAudio::new();
        assert!(audio.play().is_err());
        let song = SongMeta {
            title: "Test".into(),
            artist: String::new(),
            audio_path: "test.ogg".into(),
        };
        audio.load(&song).unwrap();
        audio.play().unwrap();
        assert!(audio.is_playing());
        audio.pause();
        assert!(!audio.is_playing());
    }
}

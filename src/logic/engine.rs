//! Top-level orchestrator: chart and song lifecycle, audio control and the
//! per-frame pump.
//!
//! The engine owns the [`GameplayManager`] and an audio backend. Song time is
//! reconciled from audio progress reports with an [`AudioClock`]; every frame
//! the gameplay session is updated with that time.

use crate::core::input::{InputKind, KeyInput};
use crate::error::EngineError;
use crate::logic::audio::{AudioClock, AudioPlayer};
use crate::logic::gameplay::{CountdownStatus, GameplayManager};
use crate::logic::judge::NoteTransition;
use crate::logic::timer::{ClockTimer, SystemClock};
use crate::models::chart::{Chart, SongMeta};
use crate::models::player::PlayerId;
use crate::models::settings::GameplayConfig;
use crate::state::game::GameplaySnapshot;
use crate::system::bus::{EventSink, GameEvent};
use crate::system::event_queue::{EventQueue, QueuedEvent};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EnginePhase {
    Idle,
    LoadingChart,
    Ready,
    LoadingSong,
    AudioPlaying,
    AudioPaused,
    AudioEnded,
    SongLoadError,
    Error,
}

/// Deferred engine commands dispatched through the signal queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineSignal {
    Pause,
    Resume,
}

impl QueuedEvent for EngineSignal {
    type Kind = EngineSignal;

    fn kind(&self) -> EngineSignal {
        *self
    }
}

pub struct GameEngine<A: AudioPlayer, C: SystemClock> {
    phase: EnginePhase,
    gameplay: GameplayManager,
    audio: A,
    clock: C,
    audio_clock: AudioClock,
    chart_loaded: bool,
    song: Option<Arc<SongMeta>>,
    countdown_running: bool,
    signals: EventQueue<EngineSignal>,
    inbox: Rc<RefCell<Vec<EngineSignal>>>,
    sink: EventSink,
}

impl<A: AudioPlayer, C: SystemClock + Clone + 'static> GameEngine<A, C> {
    pub fn new(config: GameplayConfig, audio: A, clock: C, sink: EventSink) -> Self {
        let timer = Box::new(ClockTimer::new(clock.clone()));
        let audio_clock = AudioClock::new(config.audio_sync_threshold_ms);
        let gameplay = GameplayManager::new(config, timer, sink.clone());

        let inbox = Rc::new(RefCell::new(Vec::new()));
        let mut signals = EventQueue::new();
        let tx = inbox.clone();
        signals.on_any(move |signal: &EngineSignal| {
            tx.borrow_mut().push(*signal);
            Ok(())
        });

        Self {
            phase: EnginePhase::Idle,
            gameplay,
            audio,
            clock,
            audio_clock,
            chart_loaded: false,
            song: None,
            countdown_running: false,
            signals,
            inbox,
            sink,
        }
    }
}

impl<A: AudioPlayer, C: SystemClock> GameEngine<A, C> {
    /// Loads the chart and player set. The first player receives local input.
    pub fn initialize_chart(&mut self, chart: &Chart, players: &[PlayerId]) -> Result<(), EngineError> {
        if self.is_playing() {
            return Err(self.invalid("initialize a chart"));
        }
        let previous = self.phase;
        self.set_phase(EnginePhase::LoadingChart);

        if let Err(e) = self.gameplay.load_chart(chart) {
            log::error!("ENGINE: Chart rejected: {e}");
            self.set_phase(previous);
            return Err(e);
        }
        let players = if players.is_empty() { &[0][..] } else { players };
        self.gameplay.initialize_players(players);
        self.chart_loaded = true;
        self.countdown_running = false;
        self.set_phase(EnginePhase::Ready);
        log::info!("ENGINE: Chart ready ({} notes)", chart.hit_objects.len());
        Ok(())
    }

    /// Loads the song through the audio backend.
    ///
    /// On failure the engine moves to `SongLoadError`, the chart stays loaded
    /// and this can be called again.
    pub fn load_song(&mut self, song: Arc<SongMeta>) -> Result<(), EngineError> {
        if !self.chart_loaded {
            return Err(EngineError::NoChart);
        }
        if !matches!(self.phase, EnginePhase::Ready | EnginePhase::SongLoadError) {
            return Err(self.invalid("load a song"));
        }
        self.set_phase(EnginePhase::LoadingSong);

        match self.audio.load(&song) {
            Ok(()) => {
                log::info!("ENGINE: Song loaded: {}", song.title);
                self.gameplay.state_mut().set_song(song.clone());
                self.song = Some(song);
                self.sink.emit(GameEvent::SongLoaded);
                self.set_phase(EnginePhase::Ready);
                Ok(())
            }
            Err(e) => {
                log::error!("ENGINE: Song load failed: {e}");
                self.sink.emit(GameEvent::SongLoadError(e.to_string()));
                self.set_phase(EnginePhase::SongLoadError);
                Err(e.into())
            }
        }
    }

    /// Starts the pre-roll countdown. Audio starts when it reaches zero.
    pub fn start_countdown(&mut self) -> Result<(), EngineError> {
        if !self.chart_loaded {
            return Err(EngineError::NoChart);
        }
        if self.song.is_none() {
            return Err(EngineError::NoSong);
        }
        if self.phase != EnginePhase::Ready || self.countdown_running {
            return Err(self.invalid("start the countdown"));
        }

        match self.gameplay.start_preparation() {
            CountdownStatus::Finished => self.start_audio(),
            CountdownStatus::Running(_) => self.countdown_running = true,
        }
        Ok(())
    }

    /// One frame. Dispatches due signals, advances the countdown, and while
    /// audio plays runs the gameplay sweep at the reconciled song time.
    pub fn update(&mut self) {
        let now = self.clock.now_ms();
        self.dispatch_signals(now);

        if self.countdown_running {
            if self.gameplay.poll_countdown() {
                self.start_audio();
            }
            return;
        }

        if self.phase == EnginePhase::AudioPlaying {
            let song_time = self.audio_clock.song_time(now);
            self.gameplay.update(song_time);
            self.sink.emit(GameEvent::SongTime(song_time));
        }
    }

    fn start_audio(&mut self) {
        self.countdown_running = false;
        if let Err(e) = self.audio.play() {
            log::error!("ENGINE: Could not start audio: {e}");
            self.gameplay.cleanup();
            self.set_phase(EnginePhase::Error);
            return;
        }
        let now = self.clock.now_ms();
        self.audio_clock.start(now);
        self.gameplay.begin_playback(0.0);
        self.set_phase(EnginePhase::AudioPlaying);
        self.sink.emit(GameEvent::PlaybackStarted);
        log::info!("ENGINE: Playback started");
    }

    /// Periodic backend report: `progress` in `[0, 1]` of `duration_s`.
    /// Ignored unless audio is playing.
    pub fn on_audio_progress(&mut self, progress: f64, duration_s: f64) {
        if self.phase == EnginePhase::AudioPlaying {
            let now = self.clock.now_ms();
            self.audio_clock.report(progress, duration_s, now);
        }
    }

    /// The backend reached the end of the track.
    pub fn on_audio_ended(&mut self) {
        if !self.is_playing() {
            return;
        }
        let song_time = self.audio_clock.song_time(self.clock.now_ms());
        self.gameplay.resume();
        self.gameplay.update(song_time);
        self.set_phase(EnginePhase::AudioEnded);
        self.sink.emit(GameEvent::PlaybackEnded);
        log::info!("ENGINE: Playback ended at {song_time:.0}ms");
    }

    pub fn pause_audio(&mut self) -> Result<(), EngineError> {
        if self.phase != EnginePhase::AudioPlaying {
            return Err(self.invalid("pause"));
        }
        let now = self.clock.now_ms();
        self.audio.pause();
        self.audio_clock.pause(now);
        self.gameplay.pause(self.audio_clock.song_time(now));
        self.set_phase(EnginePhase::AudioPaused);
        Ok(())
    }

    pub fn resume_audio(&mut self) -> Result<(), EngineError> {
        if self.phase != EnginePhase::AudioPaused {
            return Err(self.invalid("resume"));
        }
        let now = self.clock.now_ms();
        self.audio.resume();
        self.audio_clock.resume(now);
        self.gameplay.resume();
        self.set_phase(EnginePhase::AudioPlaying);
        Ok(())
    }

    /// Pauses after `delay_ms` of system time. Due signals run at the start
    /// of [`GameEngine::update`], paused or not.
    pub fn schedule_pause(&mut self, delay_ms: f64) {
        let at = self.clock.now_ms() + delay_ms.max(0.0);
        self.signals.enqueue_at(EngineSignal::Pause, at);
    }

    pub fn schedule_resume(&mut self, delay_ms: f64) {
        let at = self.clock.now_ms() + delay_ms.max(0.0);
        self.signals.enqueue_at(EngineSignal::Resume, at);
    }

    fn dispatch_signals(&mut self, now: f64) {
        if self.signals.process_events(now) == 0 {
            return;
        }
        let due: Vec<EngineSignal> = self.inbox.borrow_mut().drain(..).collect();
        for signal in due {
            let result = match signal {
                EngineSignal::Pause => self.pause_audio(),
                EngineSignal::Resume => self.resume_audio(),
            };
            if let Err(e) = result {
                log::warn!("ENGINE: Scheduled {signal:?} skipped: {e}");
            }
        }
    }

    /// Stops playback and the countdown. No judgement happens afterwards
    /// until [`GameEngine::restart`].
    pub fn stop_audio(&mut self) {
        let was_playing = self.is_playing();
        self.audio.stop();
        self.countdown_running = false;
        self.signals.clear();
        self.inbox.borrow_mut().clear();
        self.gameplay.cleanup();
        if was_playing {
            self.set_phase(EnginePhase::AudioEnded);
            self.sink.emit(GameEvent::PlaybackEnded);
        }
    }

    /// Stops everything and forgets the chart and song.
    pub fn cleanup(&mut self) {
        self.stop_audio();
        self.chart_loaded = false;
        self.song = None;
        self.audio_clock.reset();
        self.set_phase(EnginePhase::Idle);
        log::info!("ENGINE: Cleaned up");
    }

    /// New attempt with the loaded chart and song.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        if !self.chart_loaded {
            return Err(EngineError::NoChart);
        }
        if self.song.is_none() {
            return Err(EngineError::NoSong);
        }
        self.stop_audio();
        self.gameplay.reset();
        self.audio_clock.reset();
        self.set_phase(EnginePhase::Ready);
        Ok(())
    }

    /// Routes a key event stamped with system time. Judged against the song
    /// time at `system_ts`. Ignored unless audio is playing.
    pub fn process_input(&mut self, kind: InputKind, key: KeyCode, system_ts: f64) -> Option<NoteTransition> {
        if self.phase != EnginePhase::AudioPlaying {
            return None;
        }
        let song_time = self.audio_clock.song_time(system_ts);
        self.gameplay.process_input(kind, key, song_time)
    }

    pub fn handle_key(&mut self, input: KeyInput) -> Option<NoteTransition> {
        self.process_input(input.kind, input.key, input.timestamp_ms)
    }

    /// Song time now. Frozen while paused.
    pub fn song_time(&self) -> f64 {
        self.audio_clock.song_time(self.clock.now_ms())
    }

    pub fn snapshot(&self) -> GameplaySnapshot {
        self.gameplay.snapshot(self.song_time())
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown_running
    }

    pub fn gameplay(&self) -> &GameplayManager {
        &self.gameplay
    }

    pub fn gameplay_mut(&mut self) -> &mut GameplayManager {
        &mut self.gameplay
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn song(&self) -> Option<&Arc<SongMeta>> {
        self.song.as_ref()
    }

    fn is_playing(&self) -> bool {
        matches!(
            self.phase,
            EnginePhase::AudioPlaying | EnginePhase::AudioPaused
        )
    }

    fn invalid(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidPhase {
            phase: self.phase,
            operation,
        }
    }

    fn set_phase(&mut self, phase: EnginePhase) {
        if self.phase != phase {
            log::info!("ENGINE: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.sink.emit(GameEvent::EnginePhaseChanged(phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use crate::logic::gameplay::SessionStage;
    use crate::logic::timer::VirtualClock;
    use crate::models::chart::HitObject;
    use crate::models::engine::{NoteState, TapState};
    use crate::models::stats::{NoteJudgment, Timing};
    use crossbeam_channel::Receiver;

    #[derive(Default)]
    struct ScriptedAudio {
        fail_load: bool,
        fail_play: bool,
        loads: u32,
        playing: bool,
    }

    impl AudioPlayer for ScriptedAudio {
        fn load(&mut self, _song: &SongMeta) -> Result<(), AudioError> {
            self.loads += 1;
            if self.fail_load {
                Err(AudioError::Load("corrupt file".into()))
            } else {
                Ok(())
            }
        }

        fn play(&mut self) -> Result<(), AudioError> {
            if self.fail_play {
                return Err(AudioError::Unavailable("device lost".into()));
            }
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn resume(&mut self) {
            self.playing = true;
        }

        fn stop(&mut self) {
            self.playing = false;
        }
    }

    type TestEngine = GameEngine<ScriptedAudio, VirtualClock>;

    fn song() -> Arc<SongMeta> {
        Arc::new(SongMeta {
            title: "Test".into(),
            artist: "Nobody".into(),
            audio_path: "test.ogg".into(),
        })
    }

    fn engine(audio: ScriptedAudio) -> (TestEngine, VirtualClock, Receiver<GameEvent>) {
        let clock = VirtualClock::new();
        let (sink, rx) = EventSink::channel();
        let mut engine = GameEngine::new(GameplayConfig::default(), audio, clock.clone(), sink);
        engine
            .initialize_chart(&Chart::new(4, vec![HitObject::tap(1000, 0)]), &[1])
            .unwrap();
        (engine, clock, rx)
    }

    /// Ready engine whose playback started at system time 3000.
    fn playing() -> (TestEngine, VirtualClock, Receiver<GameEvent>) {
        let (mut engine, clock, rx) = engine(ScriptedAudio::default());
        engine.load_song(song()).unwrap();
        engine.start_countdown().unwrap();
        clock.advance(3000.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::AudioPlaying);
        (engine, clock, rx)
    }

    #[test]
    fn countdown_then_playback() {
        let (mut engine, clock, rx) = engine(ScriptedAudio::default());
        engine.load_song(song()).unwrap();
        engine.start_countdown().unwrap();
        assert!(engine.is_counting_down());

        clock.advance(2999.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::Ready);
        clock.advance(1.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::AudioPlaying);
        assert!(engine.audio().playing);

        let events: Vec<GameEvent> = rx.try_iter().collect();
        assert!(events.contains(&GameEvent::SongLoaded));
        assert!(events.contains(&GameEvent::AudioStartRequested));
        assert!(events.contains(&GameEvent::PlaybackStarted));
    }

    #[test]
    fn input_is_judged_at_reconciled_song_time() {
        let (mut engine, clock, _rx) = playing();
        // System time says 900ms in, the backend says 1000ms. A fresh report wins.
        clock.advance(900.0);
        engine.on_audio_progress(0.1, 10.0);
        let t = engine
            .process_input(InputKind::Press, KeyCode::KeyD, clock.now_ms() + 15.0)
            .unwrap();
        assert_eq!(t.judgment, NoteJudgment::Perfect);
        assert_eq!(t.offset_ms, Some(0.0));
        assert_eq!(engine.gameplay().state().player(1).unwrap().score, 300);
    }

    #[test]
    fn input_stamped_before_a_fresh_report_keeps_its_offset() {
        let (mut engine, clock, _rx) = playing();
        clock.advance(1000.0);
        engine.on_audio_progress(0.1, 10.0);
        let t = engine
            .process_input(InputKind::Press, KeyCode::KeyD, clock.now_ms() - 50.0)
            .unwrap();
        assert_eq!(t.judgment, NoteJudgment::Excellent(Timing::Early));
        assert_eq!(t.offset_ms, Some(50.0));
    }

    #[test]
    fn sweep_runs_every_frame_and_reports_song_time() {
        let (mut engine, clock, rx) = playing();
        clock.advance(1151.0);
        engine.update();
        assert_eq!(
            engine.gameplay().state().note(0).unwrap().state(),
            &NoteState::Tap(TapState::Missed)
        );
        assert_eq!(engine.gameplay().stage(), SessionStage::AllNotesJudged);
        assert!(rx.try_iter().any(|e| e == GameEvent::SongTime(1151.0)));
    }

    #[test]
    fn song_load_failure_keeps_chart_and_allows_retry() {
        let audio = ScriptedAudio {
            fail_load: true,
            ..ScriptedAudio::default()
        };
        let (mut engine, _clock, rx) = engine(audio);
        assert!(matches!(
            engine.load_song(song()),
            Err(EngineError::Audio(AudioError::Load(_)))
        ));
        assert_eq!(engine.phase(), EnginePhase::SongLoadError);
        assert!(rx.try_iter().any(|e| matches!(e, GameEvent::SongLoadError(_))));
        assert_eq!(engine.gameplay().state().notes().len(), 1);

        engine.audio_mut().fail_load = false;
        engine.load_song(song()).unwrap();
        assert_eq!(engine.phase(), EnginePhase::Ready);
        assert_eq!(engine.audio().loads, 2);
    }

    #[test]
    fn play_failure_is_fatal() {
        let audio = ScriptedAudio {
            fail_play: true,
            ..ScriptedAudio::default()
        };
        let (mut engine, clock, _rx) = engine(audio);
        engine.load_song(song()).unwrap();
        engine.start_countdown().unwrap();
        clock.advance(3000.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::Error);

        clock.advance(5000.0);
        engine.update();
        assert!(engine.gameplay().state().note(0).unwrap().state().is_waiting());
    }

    #[test]
    fn pause_freezes_judgement() {
        let (mut engine, clock, _rx) = playing();
        clock.advance(500.0);
        engine.pause_audio().unwrap();
        assert!(!engine.audio().playing);

        clock.advance(10_000.0);
        engine.update();
        assert_eq!(engine.song_time(), 500.0);
        assert!(engine.gameplay().state().note(0).unwrap().state().is_waiting());
        assert!(engine.process_input(InputKind::Press, KeyCode::KeyD, clock.now_ms()).is_none());

        engine.resume_audio().unwrap();
        clock.advance(500.0);
        let t = engine
            .process_input(InputKind::Press, KeyCode::KeyD, clock.now_ms())
            .unwrap();
        assert_eq!(t.judgment, NoteJudgment::Perfect);
    }

    #[test]
    fn scheduled_signals_pause_and_resume() {
        let (mut engine, clock, _rx) = playing();
        engine.schedule_pause(200.0);
        engine.schedule_resume(1200.0);

        clock.advance(199.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::AudioPlaying);
        clock.advance(1.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::AudioPaused);
        clock.advance(1000.0);
        engine.update();
        assert_eq!(engine.phase(), EnginePhase::AudioPlaying);
        assert_eq!(engine.song_time(), 200.0);
    }

    #[test]
    fn stop_cancels_countdown() {
        let (mut engine, clock, rx) = engine(ScriptedAudio::default());
        engine.load_song(song()).unwrap();
        engine.start_countdown().unwrap();
        engine.stop_audio();
        clock.advance(10_000.0);
        engine.update();
        assert_ne!(engine.phase(), EnginePhase::AudioPlaying);
        assert!(!rx.try_iter().any(|e| e == GameEvent::PlaybackStarted));
    }

    #[test]
    fn end_of_track_settles_and_stops_the_pump() {
        let (mut engine, clock, rx) = playing();
        clock.advance(2000.0);
        engine.on_audio_ended();
        assert_eq!(engine.phase(), EnginePhase::AudioEnded);
        assert!(engine.gameplay().state().all_notes_judged());
        assert!(rx.try_iter().any(|e| e == GameEvent::PlaybackEnded));
    }

    #[test]
    fn restart_replays_the_chart() {
        let (mut engine, clock, _rx) = playing();
        clock.advance(2000.0);
        engine.update();
        engine.restart().unwrap();
        assert_eq!(engine.phase(), EnginePhase::Ready);
        assert!(engine.gameplay().state().note(0).unwrap().state().is_waiting());
        engine.start_countdown().unwrap();
    }

    #[test]
    fn preconditions_are_reported() {
        let clock = VirtualClock::new();
        let mut engine = GameEngine::new(
            GameplayConfig::default(),
            ScriptedAudio::default(),
            clock,
            EventSink::detached(),
        );
        assert!(matches!(engine.load_song(song()), Err(EngineError::NoChart)));
        engine
            .initialize_chart(&Chart::new(4, vec![HitObject::tap(1000, 0)]), &[])
            .unwrap();
        assert!(matches!(engine.start_countdown(), Err(EngineError::NoSong)));
        assert!(matches!(
            engine.pause_audio(),
            Err(EngineError::InvalidPhase { phase: EnginePhase::Ready, .. })
        ));
        assert!(engine.gameplay().state().player(0).is_some());
    }

    #[test]
    fn bad_chart_is_rejected() {
        let clock = VirtualClock::new();
        let mut engine = GameEngine::new(
            GameplayConfig::default(),
            ScriptedAudio::default(),
            clock,
            EventSink::detached(),
        );
        let chart = Chart::new(4, vec![HitObject::hold(1000, 0, -5)]);
        assert!(matches!(
            engine.initialize_chart(&chart, &[1]),
            Err(EngineError::Chart(_))
        ));
        assert_eq!(engine.phase(), EnginePhase::Idle);
    }
}

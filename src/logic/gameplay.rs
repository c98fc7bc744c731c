//! Gameplay session: countdown, per-tick sweeps and input routing.
//!
//! Lifecycle: `Idle -> Countdown -> Active -> AllNotesJudged -> Cleanup`.
//! The session never starts audio itself; when the countdown reaches zero it
//! reports that audio should start and waits for [`GameplayManager::begin_playback`].

use crate::core::input::{InputKind, KeyBindings};
use crate::error::EngineError;
use crate::logic::judge::{NoteJudgmentSystem, NoteTransition};
use crate::logic::score::ScoreSystem;
use crate::logic::timer::Timer;
use crate::models::chart::Chart;
use crate::models::player::PlayerId;
use crate::models::settings::GameplayConfig;
use crate::state::game::{GamePhase, GameStateManager, GameplaySnapshot, Recipients};
use crate::system::bus::{EventSink, GameEvent};
use winit::keyboard::KeyCode;

const COUNTDOWN_INTERVAL_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Idle,
    Countdown,
    Active,
    /// Every note is settled. Audio may still be playing.
    AllNotesJudged,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    Running(u32),
    /// Reached zero: audio should start now.
    Finished,
}

pub struct GameplayManager {
    stage: SessionStage,
    state: GameStateManager,
    judge: NoteJudgmentSystem,
    bindings: KeyBindings,
    timer: Box<dyn Timer>,
    config: GameplayConfig,
    local_player: PlayerId,
    sink: EventSink,
}

impl GameplayManager {
    pub fn new(config: GameplayConfig, timer: Box<dyn Timer>, sink: EventSink) -> Self {
        let score = ScoreSystem::new(config.hold_bonus);
        Self {
            stage: SessionStage::Idle,
            state: GameStateManager::new(score, sink.clone()),
            judge: NoteJudgmentSystem::new(config.timing_windows),
            bindings: KeyBindings::new(),
            timer,
            config,
            local_player: 0,
            sink,
        }
    }

    /// Loads a chart and the keybindings for its lane count.
    pub fn load_chart(&mut self, chart: &Chart) -> Result<(), EngineError> {
        let bindings = KeyBindings::from_config(&self.config, chart.lanes)?;
        self.state.load_chart(chart)?;
        self.bindings = bindings;
        self.timer.disarm();
        self.stage = SessionStage::Idle;
        Ok(())
    }

    /// Creates player states. The first id receives local input.
    pub fn initialize_players(&mut self, ids: &[PlayerId]) {
        self.state.initialize_players(ids);
        if let Some(first) = ids.first() {
            self.local_player = *first;
        }
    }

    pub fn set_local_player(&mut self, id: PlayerId) {
        self.local_player = id;
    }

    /// Starts the countdown, ticking once per second.
    pub fn start_preparation(&mut self) -> CountdownStatus {
        let seconds = self.config.countdown_seconds;
        log::info!("GAMEPLAY: Countdown from {seconds}");
        self.stage = SessionStage::Countdown;
        self.state.set_phase(GamePhase::Countdown);
        self.state.set_countdown(seconds);

        if seconds == 0 {
            return self.finish_countdown();
        }
        self.sink.emit(GameEvent::CountdownTick(seconds));
        self.timer.arm(COUNTDOWN_INTERVAL_MS);
        CountdownStatus::Running(seconds)
    }

    /// One countdown step. `None` when no countdown is running.
    pub fn countdown_tick(&mut self) -> Option<CountdownStatus> {
        if self.stage != SessionStage::Countdown || !self.timer.is_armed() {
            return None;
        }
        let value = self.state.countdown_value().saturating_sub(1);
        self.state.set_countdown(value);
        if value == 0 {
            return Some(self.finish_countdown());
        }
        self.sink.emit(GameEvent::CountdownTick(value));
        Some(CountdownStatus::Running(value))
    }

    /// Runs the ticks the injected timer has accumulated. True once audio
    /// should start.
    pub fn poll_countdown(&mut self) -> bool {
        for _ in 0..self.timer.poll() {
            if self.countdown_tick() == Some(CountdownStatus::Finished) {
                return true;
            }
        }
        false
    }

    fn finish_countdown(&mut self) -> CountdownStatus {
        self.timer.disarm();
        self.sink.emit(GameEvent::CountdownTick(0));
        self.sink.emit(GameEvent::AudioStartRequested);
        log::info!("GAMEPLAY: Countdown finished, requesting audio start");
        CountdownStatus::Finished
    }

    /// Audio is running; judgement starts at song time `now`.
    pub fn begin_playback(&mut self, now: f64) {
        if matches!(self.stage, SessionStage::Cleanup) {
            return;
        }
        self.timer.disarm();
        self.stage = SessionStage::Active;
        self.state.start(now);
    }

    /// Per-tick sweep: misses, then held-too-long breaks, then completion.
    pub fn update(&mut self, now: f64) {
        if !self.is_judging() || self.state.phase() == GamePhase::Paused {
            return;
        }
        self.state.set_time(now);

        let mut timeouts = self.judge.find_missed_notes(self.state.notes(), now);
        timeouts.extend(self.judge.find_broken_hold_notes(self.state.notes(), now));
        for transition in &timeouts {
            self.apply(transition, Recipients::All);
        }

        if self.stage == SessionStage::Active && self.state.all_notes_judged() {
            self.stage = SessionStage::AllNotesJudged;
            self.state.set_phase(GamePhase::Finished);
            self.sink.emit(GameEvent::AllNotesJudged);
            log::info!("GAMEPLAY: All notes judged");
        }
    }

    /// Routes a raw key event. Unmapped keys are ignored.
    pub fn process_input(&mut self, kind: InputKind, key: KeyCode, now: f64) -> Option<NoteTransition> {
        let lane = self.bindings.lane_for(key)?;
        match kind {
            InputKind::Press => self.press_lane(lane, now),
            InputKind::Release => self.release_lane(lane, now),
        }
    }

    pub fn press_lane(&mut self, lane: usize, now: f64) -> Option<NoteTransition> {
        self.press_lane_for(self.local_player, lane, now)
    }

    pub fn release_lane(&mut self, lane: usize, now: f64) -> Option<NoteTransition> {
        self.release_lane_for(self.local_player, lane, now)
    }

    pub fn press_lane_for(&mut self, player: PlayerId, lane: usize, now: f64) -> Option<NoteTransition> {
        if !self.accepts_input() {
            return None;
        }
        let transition = self.judge.process_key_press(self.state.notes(), lane, now)?;
        self.apply(&transition, Recipients::One(player));
        Some(transition)
    }

    pub fn release_lane_for(&mut self, player: PlayerId, lane: usize, now: f64) -> Option<NoteTransition> {
        if !self.accepts_input() {
            return None;
        }
        let transition = self.judge.process_key_release(self.state.notes(), lane, now)?;
        self.apply(&transition, Recipients::One(player));
        Some(transition)
    }

    fn apply(&mut self, transition: &NoteTransition, recipients: Recipients) {
        if let Err(e) = self.state.apply_transition(transition, recipients) {
            log::warn!("GAMEPLAY: Dropped transition: {e}");
        }
    }

    pub fn pause(&mut self, now: f64) {
        if self.is_judging() {
            self.state.pause(now);
        }
    }

    pub fn resume(&mut self) {
        self.state.resume();
    }

    /// Stops everything. No judgement happens after this.
    pub fn cleanup(&mut self) {
        self.timer.disarm();
        if self.stage != SessionStage::Cleanup {
            log::info!("GAMEPLAY: Cleanup");
            self.stage = SessionStage::Cleanup;
        }
    }

    /// New attempt on the loaded chart.
    pub fn reset(&mut self) {
        self.timer.disarm();
        self.state.reset();
        self.stage = SessionStage::Idle;
    }

    pub fn snapshot(&self, now: f64) -> GameplaySnapshot {
        let lookahead = self.config.base_scroll_ms / self.state.scroll_speed().max(f64::EPSILON);
        self.state.snapshot(now, lookahead)
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    pub fn state(&self) -> &GameStateManager {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut GameStateManager {
        &mut self.state
    }

    pub fn judge(&self) -> &NoteJudgmentSystem {
        &self.judge
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    fn is_judging(&self) -> bool {
        matches!(
            self.stage,
            SessionStage::Active | SessionStage::AllNotesJudged
        )
    }

    fn accepts_input(&self) -> bool {
        self.is_judging() && self.state.phase() != GamePhase::Paused
    }
}

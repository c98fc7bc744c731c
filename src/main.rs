//! Headless runner: plays a chart on a virtual clock with autoplay input.

use clap::Parser;
use keyfall::core::input::{InputKind, KeyBindings, KeyInput};
use keyfall::logic::audio::SilentAudio;
use keyfall::logic::engine::{EnginePhase, GameEngine};
use keyfall::logic::timer::{SystemClock, VirtualClock};
use keyfall::models::chart::{Chart, SongMeta};
use keyfall::models::settings::GameplayConfig;
use keyfall::system::bus::{EventSink, GameEvent};
use rand::Rng;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use winit::keyboard::KeyCode;

/// Silence after the last note before the track ends.
const TAIL_MS: f64 = 1000.0;
/// How long autoplay holds a tap.
const TAP_HOLD_MS: f64 = 40.0;

#[derive(Parser, Debug)]
#[command(name = "keyfall", about = "Plays a chart headlessly with autoplay input")]
struct Args {
    /// Chart file (JSON: song metadata plus chart).
    chart: PathBuf,

    /// Gameplay config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Max random offset added to each autoplay input, in ms.
    #[arg(long, default_value_t = 0.0)]
    jitter_ms: f64,

    /// Fraction of notes autoplay leaves alone, in [0, 1].
    #[arg(long, default_value_t = 0.0)]
    skip_rate: f64,

    /// Simulated frame length in ms.
    #[arg(long, default_value_t = 4.0)]
    tick_ms: f64,
}

#[derive(Debug, Deserialize)]
struct ChartFile {
    song: SongMeta,
    chart: Chart,
}

/// One autoplay key event, in song time.
#[derive(Debug, Clone, Copy)]
struct ScriptedInput {
    at_ms: f64,
    kind: InputKind,
    key: KeyCode,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("MAIN: Loading {:?}", args.chart);
    let file: ChartFile = serde_json::from_str(&fs::read_to_string(&args.chart)?)?;
    let config = match &args.config {
        Some(path) => GameplayConfig::load(path)?,
        None => GameplayConfig::default(),
    };

    let bindings = KeyBindings::from_config(&config, file.chart.lanes)?;
    let script = autoplay(&file.chart, &bindings, args.jitter_ms, args.skip_rate);
    let duration_ms = file.chart.length_ms() as f64 + TAIL_MS;

    let clock = VirtualClock::new();
    let (sink, events) = EventSink::channel();
    let mut engine = GameEngine::new(config, SilentAudio::new(), clock.clone(), sink);
    engine.initialize_chart(&file.chart, &[0])?;
    engine.load_song(Arc::new(file.song))?;
    engine.start_countdown()?;

    let tick = args.tick_ms.max(0.1);
    let mut playback_start: Option<f64> = None;
    let mut next_input = 0;

    loop {
        clock.advance(tick);
        let now = clock.now_ms();

        if let Some(start) = playback_start {
            let elapsed = now - start;
            if elapsed >= duration_ms {
                engine.on_audio_ended();
            } else {
                engine.on_audio_progress(elapsed / duration_ms, duration_ms / 1000.0);
            }
            while let Some(input) = script.get(next_input).filter(|i| i.at_ms <= elapsed) {
                engine.handle_key(KeyInput {
                    kind: input.kind,
                    key: input.key,
                    timestamp_ms: start + input.at_ms,
                });
                next_input += 1;
            }
        }

        engine.update();
        if playback_start.is_none() && engine.phase() == EnginePhase::AudioPlaying {
            playback_start = Some(now);
        }

        for event in events.try_iter() {
            match event {
                GameEvent::SongTime(_) | GameEvent::PlayerUpdated { .. } => {}
                other => log::debug!("MAIN: {other:?}"),
            }
        }

        if matches!(engine.phase(), EnginePhase::AudioEnded | EnginePhase::Error) {
            break;
        }
    }

    for (id, player) in engine.gameplay().state().players() {
        log::info!(
            "MAIN: Player {id}: score {} | max combo {} | accuracy {:.2}% | {} hits, {} misses",
            player.score,
            player.max_combo(),
            player.accuracy,
            player.hits,
            player.misses
        );
        println!("{}", serde_json::to_string_pretty(player)?);
    }
    engine.cleanup();
    Ok(())
}

/// Press and release events for every note, sorted by time.
fn autoplay(chart: &Chart, bindings: &KeyBindings, jitter_ms: f64, skip_rate: f64) -> Vec<ScriptedInput> {
    let mut rng = rand::rng();
    let skip_rate = skip_rate.clamp(0.0, 1.0);
    let jitter_ms = jitter_ms.abs();
    let mut script = Vec::with_capacity(chart.hit_objects.len() * 2);

    for object in &chart.hit_objects {
        let Some(key) = bindings.key_for(object.lane) else {
            log::warn!("MAIN: Lane {} has no key, autoplay skips it", object.lane);
            continue;
        };
        if rng.random_bool(skip_rate) {
            continue;
        }
        let mut offset = || {
            if jitter_ms > 0.0 {
                rng.random_range(-jitter_ms..=jitter_ms)
            } else {
                0.0
            }
        };

        let press = object.time_ms as f64 + offset();
        let release = if object.is_hold() {
            object.end_time_ms() as f64 + offset()
        } else {
            press + TAP_HOLD_MS
        };
        script.push(ScriptedInput {
            at_ms: press,
            kind: InputKind::Press,
            key,
        });
        script.push(ScriptedInput {
            at_ms: release.max(press),
            kind: InputKind::Release,
            key,
        });
    }

    script.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
    script
}

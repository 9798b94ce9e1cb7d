/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use error::GameResult;
use sim::director::{abandon_session, start_session, step};
use sim::event::GameEvent;
use sim::highscore::HighScoreLedger;
use sim::level::load_stages;
use sim::pause::PauseCoordinator;
use sim::store::{save_dir, FileStore, Store};
use sim::world::{GameOverSummary, Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::hud::Hud;
use ui::input::{frame_input, FocusChange, InputState};
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "dashrunner starting");

    if let Err(e) = run(config) {
        error!("fatal: {e}");
        eprintln!("dashrunner: {e}");
        std::process::exit(1);
    }
}

/// Plain-text log file in the save directory; the terminal is in raw mode.
fn init_logging(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let path = save_dir().join(&config.log_file);
    match File::create(&path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(e) => eprintln!("dashrunner: logging disabled ({}): {e}", path.display()),
    }
}

fn run(config: GameConfig) -> GameResult<()> {
    config.validate()?;
    let stages = load_stages(&config)?;
    info!(count = stages.len(), "stages loaded");

    let mut ledger = HighScoreLedger::new(FileStore::new(save_dir()), config.speed.base_speed);
    info!(dir = %ledger.store().dir().display(), "save directory");
    let mut world = WorldState::new(config, stages);
    world.high_scores = ledger.entries().unwrap_or_else(|e| {
        warn!("high scores unavailable: {e}");
        vec![]
    });

    let mut pause = PauseCoordinator::new();
    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init(pause.register()) {
        let _ = renderer.cleanup();
        return Err(e.into());
    }

    let mut sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_mut(), &pause, &mut ledger);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing dashrunner!");
    if let Some(best) = world.high_scores.first() {
        println!("Best: {} points at speed {}", best.score, best.speed);
    }
    Ok(())
}

fn game_loop<S: Store>(
    world: &mut WorldState,
    renderer: &mut Renderer,
    mut sound: Option<&mut SoundEngine>,
    pause: &PauseCoordinator,
    ledger: &mut HighScoreLedger<S>,
) -> GameResult<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&world.config.gamepad);
    let mut hud = Hud::new();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(world.config.speed.tick_rate_ms);

    // A tap that starts and ends between two ticks still counts once.
    let mut pending_tap = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let mut events = vec![];
        for change in &kb.focus_changes {
            events.extend(match change {
                FocusChange::Lost => pause.suspend(world),
                FocusChange::Gained => pause.resume(world),
            });
        }

        match handle_meta(world, &kb, &gp, pause) {
            Meta::Quit => break,
            Meta::Events(ev) => events.extend(ev),
        }

        if world.phase == Phase::Playing && !world.paused && (kb.pointer_pressed() || kb.jump_pressed()) {
            pending_tap = true;
        }

        if last_tick.elapsed() >= tick_rate {
            if world.phase == Phase::Playing {
                let now = Instant::now();
                let tap = pending_tap.then_some(now);
                let input = frame_input(&[kb.jump_held_since(), gp.jump_held_since(), tap], now);
                events.extend(step(world, input));
                pending_tap = false;
            }
            last_tick = Instant::now();
        }

        if !events.is_empty() {
            handle_events(world, &events, &mut hud, sound.as_deref_mut(), ledger);
        }

        renderer.render(world, &hud)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Fan simulation events out to the HUD, audio and the high-score ledger.
fn handle_events<S: Store>(
    world: &mut WorldState,
    events: &[GameEvent],
    hud: &mut Hud,
    mut sound: Option<&mut SoundEngine>,
    ledger: &mut HighScoreLedger<S>,
) {
    hud.apply_all(events);
    for event in events {
        if let Some(sfx) = sound.as_deref_mut() {
            sound::dispatch(sfx, event);
        }
        if let GameEvent::GameOver { score } = *event {
            record_game_over(world, ledger, score);
        }
    }
}

fn record_game_over<S: Store>(world: &mut WorldState, ledger: &mut HighScoreLedger<S>, score: u32) {
    let speed = world.stage.speed;
    let record = match ledger.record(score, speed) {
        Ok(rec) => {
            world.high_scores = rec.entries.clone();
            Some(rec)
        }
        Err(e) => {
            warn!("could not record high score: {e}");
            None
        }
    };
    debug!(score, speed, ranked = record.as_ref().map_or(false, |r| r.is_new_high_score()), "game over recorded");
    world.summary = Some(GameOverSummary { score, speed, record });
}

// ── Key Constants ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

enum Meta {
    Quit,
    Events(Vec<GameEvent>),
}

fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState, pause: &PauseCoordinator) -> Meta {
    let start = kb.jump_pressed()
        || kb.any_pressed(KEYS_CONFIRM)
        || gp.jump_pressed()
        || gp.confirm_pressed();
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    let events = match world.phase {
        // ── Title Screen ──
        Phase::Title => {
            if kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed() {
                return Meta::Quit;
            }
            if start {
                start_session(world)
            } else {
                vec![]
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc {
                let mut events = pause.resume(world);
                events.extend(abandon_session(world));
                events
            } else if kb.any_pressed(KEYS_PAUSE) || gp.confirm_pressed() {
                pause.toggle(world)
            } else {
                vec![]
            }
        }

        // ── Game Over ──
        Phase::GameOverScreen => {
            if esc {
                world.phase = Phase::Title;
                vec![]
            } else if start {
                start_session(world)
            } else {
                vec![]
            }
        }
    };

    Meta::Events(events)
}

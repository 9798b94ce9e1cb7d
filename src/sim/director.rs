/// The stage director: advances the world by one simulation tick.
///
/// ```text
///   Initializing → CountingDown → Running → EndingStage → AwardingBonus
///        ▲                           │                        │
///        └──── TransitioningStage ◀──┼────────────────────────┘
///                                    └→ Exploding → GameOver → (screen)
/// ```
///
/// Processing order per tick:
///   1. Effects (explosions, tween, fade) advance and report completions
///   2. The current phase's timer advances
///   3. Player movement (drive → physics → settle)
///   4. Pursuer steering
///   5. Coin pickup
///   6. Stage checks: exit threshold, then pursuer contact, then fall death
///   7. Effect completions are applied (stale epochs dropped)
///
/// Nothing advances while the world is suspended.

use tracing::{debug, info};

use crate::domain::entity::{Facing, FrameInput};
use crate::domain::{movement, physics, pursuer};

use super::event::{Cue, CueKind, GameEvent, MusicCommand};
use super::fx::{FadeDir, FxDone};
use super::timer::Timer;
use super::world::{BonusStep, EndStep, Phase, StagePhase, StageState, WorldState};

/// The player tweens this far past the right edge of the map.
const EXIT_OVERSHOOT_PX: f32 = 64.0;

// ══════════════════════════════════════════════════════════════
// Main entry points
// ══════════════════════════════════════════════════════════════

/// Begin a fresh session at level 1, base speed, score 0.
pub fn start_session(world: &mut WorldState) -> Vec<GameEvent> {
    let mut events = vec![];

    let epoch = world.stage.epoch;
    world.stage = StageState { epoch, ..StageState::new(world.config.speed.base_speed) };
    world.score.reset();
    world.summary = None;
    world.fx.clear();
    world.load_stage(1);
    world.phase = Phase::Playing;

    events.push(GameEvent::ScoreChanged(0));
    events.push(GameEvent::SpeedChanged(world.stage.speed));
    events.push(GameEvent::Music(MusicCommand::Play));
    initialize_stage(world, &mut events);

    info!(speed = world.stage.speed, "session started");
    events
}

/// Leave the current session without a game-over (back to the title).
pub fn abandon_session(world: &mut WorldState) -> Vec<GameEvent> {
    world.fx.clear();
    world.phase = Phase::Title;
    world.stage_phase = StagePhase::Initializing;
    info!(score = world.score.count(), "session abandoned");
    vec![GameEvent::Music(MusicCommand::Stop)]
}

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused {
        return vec![];
    }

    let dt = world.config.speed.tick_rate_ms as u32;
    let mut events = vec![];
    world.tick += 1;
    world.clock_ms += dt as u64;

    let done = world.fx.tick(dt);
    advance_phase_timer(world, dt, &mut events);
    resolve_player(world, input, dt, &mut events);
    resolve_pursuer(world, dt);
    resolve_coins(world, &mut events);
    resolve_stage_checks(world, &mut events);
    for signal in done {
        handle_fx_done(world, signal, &mut events);
    }

    let width = world.current_stage().width_px();
    world.camera.follow(world.player.body.x, width);

    events
}

/// End-of-stage bonus: `round(coins / 4 + speed / 2 × level)`.
pub fn compute_bonus(stage_coins: u32, speed: u32, level: u32) -> u32 {
    let bonus = stage_coins as f64 / 4.0 + (speed as f64 / 2.0) * level as f64;
    bonus.round() as u32
}

// ══════════════════════════════════════════════════════════════
// Stage start / countdown
// ══════════════════════════════════════════════════════════════

fn initialize_stage(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.stage_phase = StagePhase::Initializing;
    world.stage.stage_coins = 0;
    world.player.paused = true;
    world.pursuer.paused = true;
    world.fx.fade(FadeDir::In, world.config.timing.fade_ms);
    begin_countdown(world, events);
}

fn begin_countdown(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let ticks = world.config.timing.countdown_ticks.max(1);
    let timer = Timer::repeating(world.config.timing.countdown_period_ms, ticks - 1);
    let count = ticks.min(u8::MAX as u32) as u8;
    world.stage_phase = StagePhase::CountingDown { timer, count };

    events.push(GameEvent::StageStarted { level: world.stage.level, speed: world.stage.speed });
    events.push(GameEvent::Countdown(count));
    debug!(level = world.stage.level, "countdown started");
}

/// Final countdown tick: release the player and the pursuer.
fn launch(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.player.paused = false;
    world.pursuer.paused = false;
    world.pursuer.launched = true;
    world.stage_phase = StagePhase::Running;
    events.push(GameEvent::Countdown(0));
    events.push(GameEvent::Cue(Cue::new(CueKind::Go)));
    info!(level = world.stage.level, speed = world.stage.speed, "stage running");
}

// ══════════════════════════════════════════════════════════════
// Phase timers
// ══════════════════════════════════════════════════════════════

fn advance_phase_timer(world: &mut WorldState, dt: u32, events: &mut Vec<GameEvent>) {
    let fires = match world.stage_phase.timer_mut() {
        Some(timer) => timer.tick(dt),
        None => 0,
    };
    for _ in 0..fires {
        on_phase_timer(world, events);
    }
}

fn on_phase_timer(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    match &mut world.stage_phase {
        StagePhase::CountingDown { timer, count } => {
            let remaining = timer.repeat_count();
            if remaining > 0 {
                *count = remaining.min(u8::MAX as u32) as u8;
                events.push(GameEvent::Countdown(*count));
            } else {
                launch(world, events);
            }
        }
        StagePhase::AwardingBonus(BonusStep::Display { bonus, .. }) => {
            let bonus = *bonus;
            world.score.add_bonus(bonus, events);
            events.push(GameEvent::BonusAwarded(bonus));
            world.stage_phase = StagePhase::AwardingBonus(BonusStep::Settle {
                timer: Timer::once(world.config.timing.bonus_settle_ms),
            });
        }
        StagePhase::AwardingBonus(BonusStep::Settle { .. }) => {
            world.fx.fade(FadeDir::Out, world.config.timing.fade_ms);
            world.stage_phase = StagePhase::TransitioningStage;
        }
        StagePhase::GameOver { .. } => {
            let score = world.score.count();
            world.phase = Phase::GameOverScreen;
            events.push(GameEvent::GameOver { score });
            info!(score, speed = world.stage.speed, "game over");
        }
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Entities
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut WorldState, input: FrameInput, dt: u32, events: &mut Vec<GameEvent>) {
    let speed = world.stage.speed as f32;
    let outcome = movement::drive(&mut world.player, input, speed, &world.config.jump, dt);
    if outcome.jumped {
        events.push(GameEvent::Cue(Cue::new(CueKind::Jump)));
    }

    if world.stage_phase == StagePhase::EndingStage(EndStep::Exiting) {
        if let Some(x) = world.fx.tween_value() {
            world.player.body.x = x;
        }
    }

    let tiles = &world.stages[world.stage_index].tiles;
    physics::step_body(&mut world.player.body, tiles, world.config.jump.gravity, dt as f32 / 1000.0);
    movement::settle(&mut world.player);
}

fn resolve_pursuer(world: &mut WorldState, dt: u32) {
    let target = world.player.body.center();
    let speed = world.stage.speed as f32;
    pursuer::steer(&mut world.pursuer, target, speed, world.config.speed.pursuer_offset);

    let stage = &world.stages[world.stage_index];
    physics::step_free_body(&mut world.pursuer.body, stage.width_px(), stage.height_px(), dt as f32 / 1000.0);
}

fn resolve_coins(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.player.body.enabled || world.player.is_dead() {
        return;
    }
    let collected = world.coins.collect_overlapping(&world.player.body.rect());
    for _ in 0..collected {
        world.score.increment(events);
        world.stage.stage_coins += 1;
        events.push(GameEvent::CoinCollected);
    }
}

// ══════════════════════════════════════════════════════════════
// Stage checks
// ══════════════════════════════════════════════════════════════

fn resolve_stage_checks(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.stage_phase != StagePhase::Running {
        return;
    }

    if world.player.body.x > world.current_stage().exit_x {
        begin_end_stage(world, events);
        return;
    }

    let contact = world.player.body.enabled
        && world.pursuer.body.enabled
        && world.player.body.rect().overlaps(&world.pursuer.body.rect());
    if contact {
        begin_explosion(world, events);
        return;
    }

    if movement::fell_out(&world.player, world.config.jump.death_y) {
        player_die(world, events);
    }
}

/// Start the end-of-stage sequence. A no-op if one is already in flight
/// or the player is already dying.
pub(crate) fn begin_end_stage(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.stage.end_of_stage || world.stage.game_over {
        debug!("end of stage ignored: sequence already in flight");
        return;
    }
    world.stage.end_of_stage = true;

    let (x, y) = world.pursuer.body.center();
    let anim_id = world.fx.explode(x, y, world.config.timing.explosion_ms, world.stage.epoch);

    world.pursuer.body.stop();
    world.pursuer.body.enabled = false;
    world.pursuer.visible = false;

    world.player.body.stop();
    world.player.body.enabled = false;
    world.player.paused = true;
    world.player.facing = Facing::Left;

    world.stage_phase = StagePhase::EndingStage(EndStep::Exploding { anim_id });
    events.push(GameEvent::Cue(Cue::new(CueKind::Explosion)));
    events.push(GameEvent::Music(MusicCommand::Pause));
    events.push(GameEvent::StageCleared { level: world.stage.level });
    info!(level = world.stage.level, coins = world.stage.stage_coins, "stage cleared");
}

/// The pursuer caught the player. A no-op once a game over is in flight.
pub(crate) fn begin_explosion(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.stage.game_over || world.stage.end_of_stage {
        debug!("explosion ignored: game over already in flight");
        return;
    }
    world.stage.game_over = true;

    let (x, y) = world.player.body.center();
    let anim_id = world.fx.explode(x, y, world.config.timing.explosion_ms, world.stage.epoch);

    world.player.body.stop();
    world.player.body.enabled = false;
    world.player.visible = false;

    world.pursuer.body.stop();
    world.pursuer.body.enabled = false;
    world.pursuer.visible = false;

    world.stage_phase = StagePhase::Exploding { anim_id };
    events.push(GameEvent::Cue(Cue::new(CueKind::Explosion)));
}

/// Kill the player and start the game-over delay. Idempotent.
pub(crate) fn player_die(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !movement::kill(&mut world.player) {
        debug!("death ignored: player already dead");
        return;
    }
    world.stage.game_over = true;
    world.pursuer.paused = true;

    world.stage_phase = StagePhase::GameOver {
        timer: Timer::once(world.config.timing.game_over_delay_ms),
    };
    events.push(GameEvent::PlayerKilled);
    events.push(GameEvent::Music(MusicCommand::Stop));
    events.push(GameEvent::Cue(Cue::new(CueKind::GameOver)));
    info!(level = world.stage.level, score = world.score.count(), "player killed");
}

// ══════════════════════════════════════════════════════════════
// Effect completions
// ══════════════════════════════════════════════════════════════

pub(crate) fn handle_fx_done(world: &mut WorldState, signal: FxDone, events: &mut Vec<GameEvent>) {
    match signal {
        FxDone::Animation { id, epoch } => {
            if epoch != world.stage.epoch {
                debug!(epoch, current = world.stage.epoch, "stale animation completion dropped");
                return;
            }
            match world.stage_phase {
                StagePhase::Exploding { anim_id } if anim_id == id => {
                    player_die(world, events);
                }
                StagePhase::EndingStage(EndStep::Exploding { anim_id }) if anim_id == id => {
                    begin_exit(world, events);
                }
                _ => {}
            }
        }
        FxDone::Tween { epoch, value } => {
            if epoch != world.stage.epoch {
                debug!(epoch, current = world.stage.epoch, "stale tween completion dropped");
                return;
            }
            if world.stage_phase == StagePhase::EndingStage(EndStep::Exiting) {
                world.player.body.x = value;
                award_bonus(world, events);
            }
        }
        FxDone::Fade { dir: FadeDir::Out } => {
            if world.stage_phase == StagePhase::TransitioningStage {
                next_stage(world, events);
            }
        }
        FxDone::Fade { dir: FadeDir::In } => {}
    }
}

/// Pursuer explosion finished: turn around and run off the map.
fn begin_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.player.facing = Facing::Right;
    let from = world.player.body.x;
    let to = world.current_stage().width_px() + EXIT_OVERSHOOT_PX;
    world.fx.tween(from, to, world.config.timing.exit_tween_ms, world.stage.epoch);
    world.stage_phase = StagePhase::EndingStage(EndStep::Exiting);
    events.push(GameEvent::Cue(Cue::new(CueKind::Victory)));
}

/// Player left the map: progress the level, then price the bonus at the
/// new level and speed.
fn award_bonus(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let cleared = world.stage.level;
    world.stage.level += 1;
    if world.stage.level >= world.config.speed.levels_per_world + 1 {
        world.stage.level = 1;
        world.stage.speed += world.config.speed.speed_step;
        events.push(GameEvent::SpeedChanged(world.stage.speed));
        info!(speed = world.stage.speed, "world complete, speed up");
    }

    let bonus = compute_bonus(world.stage.stage_coins, world.stage.speed, world.stage.level);
    world.stage.stage_coins = 0;

    world.stage_phase = StagePhase::AwardingBonus(BonusStep::Display {
        timer: Timer::once(world.config.timing.bonus_display_ms),
        bonus,
    });
    events.push(GameEvent::BonusShown(bonus));
    debug!(cleared, bonus, "bonus shown");
}

/// Faded out: swap in the next stage, then count down again.
fn next_stage(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let level = world.stage.level;
    world.fx.clear();
    world.load_stage(level);
    initialize_stage(world, events);
    events.push(GameEvent::Music(MusicCommand::Resume));
    world.stage.end_of_stage = false;
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

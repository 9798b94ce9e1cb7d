/// WorldState: the complete snapshot of a running game.
///
/// ## Stage data
///
/// Stages are loaded once per session into `stages` and never mutated.
/// `stage_index` selects the live one; `load_stage` tears down the
/// previous stage's coins and entities and lays out the next in place.
///
/// ## Guards and epochs
///
/// `StageState::end_of_stage` and `StageState::game_over` are re-entrancy
/// guards. Each is checked and set in the same synchronous call.
/// `StageState::epoch` increments on every stage reset; effect completions
/// carry the epoch that started them and stale ones are ignored.
///
/// ## Camera / Viewport
///
/// World coordinates are pixels. The renderer sets the viewport width and
/// the camera follows the player's x, clamped to the map.

use tracing::debug;

use crate::config::GameConfig;
use crate::domain::entity::{Player, Pursuer};
use crate::domain::tile::Tile;

use super::fx::Effects;
use super::highscore::{HighScoreEntry, HighScoreRecord};
use super::level::StageDef;
use super::pool::CoinPool;
use super::score::ScoreTracker;
use super::timer::Timer;

/// Top-level screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    GameOverScreen,
}

/// Sub-steps of the end-of-stage sequence.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndStep {
    /// Pursuer explosion playing; the player faces backward.
    Exploding { anim_id: u32 },
    /// Player tweening off the right edge.
    Exiting,
}

/// Sub-steps of the bonus award.
#[derive(Clone, Debug, PartialEq)]
pub enum BonusStep {
    Display { timer: Timer, bonus: u32 },
    Settle { timer: Timer },
}

/// Stage director state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum StagePhase {
    Initializing,
    CountingDown { timer: Timer, count: u8 },
    Running,
    /// Player hit by the pursuer; explosion playing.
    Exploding { anim_id: u32 },
    /// Player dead; waiting before the game-over screen.
    GameOver { timer: Timer },
    EndingStage(EndStep),
    AwardingBonus(BonusStep),
    /// Fading out before the next stage is loaded.
    TransitioningStage,
}

impl StagePhase {
    /// The timer owned by the current phase, if any.
    pub fn timer_mut(&mut self) -> Option<&mut Timer> {
        match self {
            StagePhase::CountingDown { timer, .. }
            | StagePhase::GameOver { timer }
            | StagePhase::AwardingBonus(BonusStep::Display { timer, .. })
            | StagePhase::AwardingBonus(BonusStep::Settle { timer }) => Some(timer),
            _ => None,
        }
    }

    /// Visible countdown value, while counting down.
    pub fn countdown(&self) -> Option<u8> {
        match self {
            StagePhase::CountingDown { count, .. } => Some(*count),
            _ => None,
        }
    }
}

/// Per-session progression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageState {
    /// 1-based level within the current world.
    pub level: u32,
    /// Global speed in px/s; only ever increases within a session.
    pub speed: u32,
    /// Coins collected on the current stage.
    pub stage_coins: u32,
    pub end_of_stage: bool,
    pub game_over: bool,
    pub epoch: u64,
}

impl StageState {
    pub fn new(base_speed: u32) -> Self {
        StageState {
            level: 1,
            speed: base_speed,
            stage_coins: 0,
            end_of_stage: false,
            game_over: false,
            epoch: 0,
        }
    }
}

/// What the game-over screen shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOverSummary {
    pub score: u32,
    pub speed: u32,
    /// `None` if the table could not be read or written.
    pub record: Option<HighScoreRecord>,
}

/// Camera: a horizontal viewport into the world, in px.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// World x of the left edge of the viewport.
    pub x: f32,
    /// Viewport width in world px (set by the renderer).
    pub view_w: f32,
}

impl Camera {
    /// Keep `target_x` centered, clamped to `[0, world_w]`.
    pub fn follow(&mut self, target_x: f32, world_w: f32) {
        if self.view_w <= 0.0 {
            return;
        }
        if world_w <= self.view_w {
            self.x = 0.0;
            return;
        }
        self.x = (target_x - self.view_w / 2.0).clamp(0.0, world_w - self.view_w);
    }
}

pub struct WorldState {
    pub config: GameConfig,

    // ── Stages ──
    pub stages: Vec<StageDef>,
    pub stage_index: usize,

    // ── Entities ──
    pub player: Player,
    pub pursuer: Pursuer,
    pub coins: CoinPool,

    // ── Progression ──
    pub score: ScoreTracker,
    pub stage: StageState,
    pub stage_phase: StagePhase,
    pub fx: Effects,

    // ── Meta ──
    pub phase: Phase,
    /// Suspended by the pause coordinator. Nothing advances while set.
    pub paused: bool,
    pub tick: u64,
    /// Simulation clock; advances only inside an unsuspended step.
    pub clock_ms: u64,

    // ── Screens ──
    pub camera: Camera,
    pub high_scores: Vec<HighScoreEntry>,
    pub summary: Option<GameOverSummary>,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: GameConfig, stages: Vec<StageDef>) -> Self {
        let base_speed = config.speed.base_speed;
        WorldState {
            config,
            stages,
            stage_index: 0,
            player: Player::new(0.0, 0.0),
            pursuer: Pursuer::new(0.0, 0.0),
            coins: CoinPool::new(),
            score: ScoreTracker::new(),
            stage: StageState::new(base_speed),
            stage_phase: StagePhase::Initializing,
            fx: Effects::new(),
            phase: Phase::Title,
            paused: false,
            tick: 0,
            clock_ms: 0,
            camera: Camera::default(),
            high_scores: vec![],
            summary: None,
        }
    }

    pub fn current_stage(&self) -> &StageDef {
        &self.stages[self.stage_index]
    }

    /// Effective terrain of the live stage.
    pub fn tiles(&self) -> &[Vec<Tile>] {
        &self.current_stage().tiles
    }

    /// Tear down the live stage and lay out the stage for `level`
    /// (1-based). Entities are reset in place: enabled, visible, paused.
    pub fn load_stage(&mut self, level: u32) {
        let count = self.stages.len().max(1);
        self.stage_index = (level.max(1) as usize - 1) % count;

        let (player_spawn, pursuer_spawn, markers) = {
            let stage = self.current_stage();
            (stage.player_spawn, stage.pursuer_spawn, stage.coins.clone())
        };

        self.coins.layout(&markers);
        self.player.respawn(player_spawn.0, player_spawn.1);
        self.pursuer.respawn(pursuer_spawn.0, pursuer_spawn.1);
        self.stage.stage_coins = 0;
        self.stage.epoch += 1;
        debug!(
            stage = %self.current_stage().name,
            coins = self.coins.active_count(),
            epoch = self.stage.epoch,
            "stage laid out"
        );

        let width = self.current_stage().width_px();
        self.camera.x = 0.0;
        self.camera.follow(self.player.body.x, width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_centers_and_clamps() {
        let mut cam = Camera { x: 0.0, view_w: 320.0 };
        cam.follow(100.0, 4000.0);
        assert_eq!(cam.x, 0.0);
        cam.follow(1000.0, 4000.0);
        assert_eq!(cam.x, 840.0);
        cam.follow(3990.0, 4000.0);
        assert_eq!(cam.x, 3680.0);
    }

    #[test]
    fn small_map_pins_camera() {
        let mut cam = Camera { x: 50.0, view_w: 320.0 };
        cam.follow(100.0, 200.0);
        assert_eq!(cam.x, 0.0);
    }

    #[test]
    fn phase_timer_is_reachable() {
        let mut phase = StagePhase::CountingDown { timer: Timer::repeating(1000, 3), count: 4 };
        assert!(phase.timer_mut().is_some());
        assert_eq!(phase.countdown(), Some(4));
        assert!(StagePhase::Running.timer_mut().is_none());
    }
}

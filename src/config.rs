/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{GameError, GameResult};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub jump: JumpConfig,
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_level: String,
    pub log_file: String,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub base_speed: u32,       // px/s at world 1
    pub speed_step: u32,       // added once per completed world
    pub levels_per_world: u32,
    pub pursuer_offset: f32,   // px/s added on both axes of the pursuer
}

#[derive(Clone, Debug)]
pub struct JumpConfig {
    pub gravity: f32,             // px/s²
    pub impulse: f32,             // upward px/s
    pub hold_ms: u32,             // max rise time while held
    pub float_ms: u32,            // reduced-gravity window at the apex
    pub float_gravity_scale: f32,
    pub landing_ms: u32,
    pub window_ms: u32,           // a press older than this no longer jumps
    pub death_y: f32,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub countdown_ticks: u32,
    pub countdown_period_ms: u32,
    pub fade_ms: u32,
    pub explosion_ms: u32,
    pub exit_tween_ms: u32,
    pub bonus_display_ms: u32,
    pub bonus_settle_ms: u32,
    pub game_over_delay_ms: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    jump: TomlJump,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    logging: TomlLogging,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_base_speed")]
    base_speed: u32,
    #[serde(default = "default_speed_step")]
    speed_step: u32,
    #[serde(default = "default_levels_per_world")]
    levels_per_world: u32,
    #[serde(default = "default_pursuer_offset")]
    pursuer_offset: f32,
}

#[derive(Deserialize, Debug)]
struct TomlJump {
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_impulse")]
    impulse: f32,
    #[serde(default = "default_hold_ms")]
    hold_ms: u32,
    #[serde(default = "default_float_ms")]
    float_ms: u32,
    #[serde(default = "default_float_scale")]
    float_gravity_scale: f32,
    #[serde(default = "default_landing_ms")]
    landing_ms: u32,
    #[serde(default = "default_window_ms")]
    window_ms: u32,
    #[serde(default = "default_death_y")]
    death_y: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_countdown_ticks")]
    countdown_ticks: u32,
    #[serde(default = "default_countdown_period")]
    countdown_period_ms: u32,
    #[serde(default = "default_fade")]
    fade_ms: u32,
    #[serde(default = "default_explosion")]
    explosion_ms: u32,
    #[serde(default = "default_exit_tween")]
    exit_tween_ms: u32,
    #[serde(default = "default_bonus_display")]
    bonus_display_ms: u32,
    #[serde(default = "default_bonus_settle")]
    bonus_settle_ms: u32,
    #[serde(default = "default_game_over_delay")]
    game_over_delay_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

#[derive(Deserialize, Debug)]
struct TomlLogging {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_base_speed() -> u32 { 90 }
fn default_speed_step() -> u32 { 10 }
fn default_levels_per_world() -> u32 { 4 }
fn default_pursuer_offset() -> f32 { 2.0 }

fn default_gravity() -> f32 { 1000.0 }
fn default_impulse() -> f32 { 400.0 }
fn default_hold_ms() -> u32 { 300 }
fn default_float_ms() -> u32 { 120 }
fn default_float_scale() -> f32 { 0.3 }
fn default_landing_ms() -> u32 { 100 }
fn default_window_ms() -> u32 { 250 }
fn default_death_y() -> f32 { 230.0 }

fn default_countdown_ticks() -> u32 { 4 }
fn default_countdown_period() -> u32 { 1000 }
fn default_fade() -> u32 { 500 }
fn default_explosion() -> u32 { 600 }
fn default_exit_tween() -> u32 { 1000 }
fn default_bonus_display() -> u32 { 1500 }
fn default_bonus_settle() -> u32 { 1000 }
fn default_game_over_delay() -> u32 { 1000 }

fn default_pad_jump() -> Vec<String> { vec!["A".into(), "B".into(), "R1".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "stages".into() }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "dashrunner.log".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            base_speed: default_base_speed(),
            speed_step: default_speed_step(),
            levels_per_world: default_levels_per_world(),
            pursuer_offset: default_pursuer_offset(),
        }
    }
}

impl Default for TomlJump {
    fn default() -> Self {
        TomlJump {
            gravity: default_gravity(),
            impulse: default_impulse(),
            hold_ms: default_hold_ms(),
            float_ms: default_float_ms(),
            float_gravity_scale: default_float_scale(),
            landing_ms: default_landing_ms(),
            window_ms: default_window_ms(),
            death_y: default_death_y(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            countdown_ticks: default_countdown_ticks(),
            countdown_period_ms: default_countdown_period(),
            fade_ms: default_fade(),
            explosion_ms: default_explosion(),
            exit_tween_ms: default_exit_tween(),
            bonus_display_ms: default_bonus_display(),
            bonus_settle_ms: default_bonus_settle(),
            game_over_delay_ms: default_game_over_delay(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
        }
    }
}

impl Default for TomlLogging {
    fn default() -> Self {
        TomlLogging {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(toml_cfg: TomlConfig) -> Self {
        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms,
                base_speed: toml_cfg.speed.base_speed,
                speed_step: toml_cfg.speed.speed_step,
                levels_per_world: toml_cfg.speed.levels_per_world,
                pursuer_offset: toml_cfg.speed.pursuer_offset,
            },
            jump: JumpConfig {
                gravity: toml_cfg.jump.gravity,
                impulse: toml_cfg.jump.impulse,
                hold_ms: toml_cfg.jump.hold_ms,
                float_ms: toml_cfg.jump.float_ms,
                float_gravity_scale: toml_cfg.jump.float_gravity_scale,
                landing_ms: toml_cfg.jump.landing_ms,
                window_ms: toml_cfg.jump.window_ms,
                death_y: toml_cfg.jump.death_y,
            },
            timing: TimingConfig {
                countdown_ticks: toml_cfg.timing.countdown_ticks,
                countdown_period_ms: toml_cfg.timing.countdown_period_ms,
                fade_ms: toml_cfg.timing.fade_ms,
                explosion_ms: toml_cfg.timing.explosion_ms,
                exit_tween_ms: toml_cfg.timing.exit_tween_ms,
                bonus_display_ms: toml_cfg.timing.bonus_display_ms,
                bonus_settle_ms: toml_cfg.timing.bonus_settle_ms,
                game_over_delay_ms: toml_cfg.timing.game_over_delay_ms,
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels_dir: PathBuf::from(toml_cfg.general.levels_dir),
            log_level: toml_cfg.logging.level,
            log_file: toml_cfg.logging.file,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from(TomlConfig::default())
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        let mut config = GameConfig::from(toml_cfg);

        // Resolve the stages directory against the search dirs
        if !config.levels_dir.is_absolute() {
            if let Some(found) = search_dirs.iter()
                .map(|d| d.join(&config.levels_dir))
                .find(|p| p.is_dir())
            {
                config.levels_dir = found;
            }
        }

        config
    }

    /// Parse a config document. Used by `load` and by tests.
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(GameConfig::from(toml_cfg))
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> GameResult<()> {
        if self.speed.tick_rate_ms == 0 {
            return Err(GameError::config("tick_rate_ms must be greater than 0"));
        }
        if self.speed.levels_per_world == 0 {
            return Err(GameError::config("levels_per_world must be greater than 0"));
        }
        if self.speed.base_speed == 0 {
            return Err(GameError::config("base_speed must be greater than 0"));
        }
        if self.jump.gravity <= 0.0 {
            return Err(GameError::config("gravity must be positive"));
        }
        if self.jump.impulse <= 0.0 {
            return Err(GameError::config("jump impulse must be positive"));
        }
        if self.timing.countdown_ticks == 0 || self.timing.countdown_period_ms == 0 {
            return Err(GameError::config("countdown needs at least one tick and a non-zero period"));
        }
        match self.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => return Err(GameError::config(format!("invalid logging level '{other}'"))),
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/dashrunner)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/dashrunner");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.speed.base_speed, 90);
        assert_eq!(cfg.speed.levels_per_world, 4);
        assert_eq!(cfg.timing.countdown_ticks, 4);
        assert_eq!(cfg.jump.window_ms, 250);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GameConfig::from_toml_str("[speed]\nbase_speed = 120\n").unwrap();
        assert_eq!(cfg.speed.base_speed, 120);
        assert_eq!(cfg.speed.speed_step, 10);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let cfg = GameConfig::from_toml_str(include_str!("../config.toml")).unwrap();
        let def = GameConfig::default();
        assert_eq!(cfg.speed.base_speed, def.speed.base_speed);
        assert_eq!(cfg.jump.hold_ms, def.jump.hold_ms);
        assert_eq!(cfg.timing.bonus_display_ms, def.timing.bonus_display_ms);
        assert_eq!(cfg.gamepad.jump, def.gamepad.jump);
        assert_eq!(cfg.levels_dir, def.levels_dir);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = GameConfig::from_toml_str("[speed\nbase_speed = ").unwrap_err();
        assert!(matches!(err, GameError::Toml(_)));
    }

    #[test]
    fn validate_rejects_zero_world_size() {
        let mut cfg = GameConfig::default();
        cfg.speed.levels_per_world = 0;
        assert!(matches!(cfg.validate(), Err(GameError::Config { .. })));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut cfg = GameConfig::default();
        cfg.log_level = "loud".into();
        assert!(cfg.validate().is_err());
    }
}

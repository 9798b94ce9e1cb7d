/// Player movement controller: the jump/fall/land state machine.
///
/// ```text
///   Grounded ──press──▶ Rising ──release / hold timeout / ceiling──▶ Falling
///      ▲                                                               │
///      └──── landing_ms ──── Landing ◀──────── grounded ───────────────┘
///
///   any ──kill──▶ Dead   (absorbing)
/// ```
///
/// The controller runs in two halves around the physics step:
///   - `drive` : before physics: input, timers, velocity commands
///   - `settle`: after physics: react to the grounded signal
///
/// A jump needs a fresh press: held for less than `window_ms`, and not
/// already spent on an earlier jump (the press flag clears on release).

use crate::config::JumpConfig;

use super::entity::{FrameInput, JumpState, Player};

/// What happened during `drive`, for cue dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementOutcome {
    pub jumped: bool,
}

/// Before physics: apply input and timers, command velocity.
pub fn drive(
    player: &mut Player,
    input: FrameInput,
    speed: f32,
    cfg: &JumpConfig,
    dt_ms: u32,
) -> MovementOutcome {
    let mut outcome = MovementOutcome::default();

    if player.is_dead() {
        player.body.stop();
        return outcome;
    }
    if player.paused {
        player.body.stop();
        return outcome;
    }

    player.state_ms += dt_ms;
    if !input.jump_held {
        player.jump_consumed = false;
    }

    match player.state {
        JumpState::Landing => {
            if player.state_ms >= cfg.landing_ms {
                enter(player, JumpState::Grounded);
                outcome.jumped = try_jump(player, input, cfg);
            }
        }
        JumpState::Grounded => {
            outcome.jumped = try_jump(player, input, cfg);
        }
        JumpState::Rising => {
            let timed_out = player.state_ms >= cfg.hold_ms;
            if !input.jump_held || timed_out || player.body.blocked.up {
                begin_float(player, cfg);
            }
        }
        JumpState::Falling => {
            if player.floating && player.state_ms >= cfg.float_ms {
                player.floating = false;
                player.body.gravity_scale = 1.0;
            }
        }
        JumpState::Dead => {}
    }

    player.body.vx = speed;
    outcome
}

/// After physics: landing and walking off ledges.
pub fn settle(player: &mut Player) {
    if player.is_dead() || player.paused {
        return;
    }

    let grounded = player.body.blocked.down;
    match player.state {
        JumpState::Falling if grounded => {
            player.floating = false;
            player.body.gravity_scale = 1.0;
            enter(player, JumpState::Landing);
        }
        JumpState::Grounded | JumpState::Landing if !grounded => {
            enter(player, JumpState::Falling);
        }
        _ => {}
    }

    if player.body.blocked.up {
        player.body.vy = 0.0;
    }
}

/// Death trigger. Returns false if the player was already dead.
pub fn kill(player: &mut Player) -> bool {
    if player.is_dead() {
        return false;
    }
    player.state = JumpState::Dead;
    player.state_ms = 0;
    player.alive = false;
    player.floating = false;
    player.body.stop();
    player.body.allow_gravity = false;
    true
}

/// Has the bottom of the player's body crossed the death line?
pub fn fell_out(player: &Player, death_y: f32) -> bool {
    player.body.bottom() > death_y
}

/// Only a grounded player may jump, and only on a fresh press.
fn try_jump(player: &mut Player, input: FrameInput, cfg: &JumpConfig) -> bool {
    let fresh_press = input.jump_held
        && !player.jump_consumed
        && input.jump_held_ms < cfg.window_ms;
    if !fresh_press || !player.body.blocked.down {
        return false;
    }
    player.body.vy = -cfg.impulse;
    player.body.gravity_scale = 1.0;
    player.jump_consumed = true;
    enter(player, JumpState::Rising);
    true
}

fn begin_float(player: &mut Player, cfg: &JumpConfig) {
    player.body.vy = 0.0;
    player.body.gravity_scale = cfg.float_gravity_scale;
    player.floating = true;
    enter(player, JumpState::Falling);
}

fn enter(player: &mut Player, state: JumpState) {
    player.state = state;
    player.state_ms = 0;
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::physics::step_body;
    use crate::domain::tile::Tile;

    const DT_MS: u32 = 16;
    const DT: f32 = 0.016;

    fn flat_ground() -> Vec<Vec<Tile>> {
        let mut rows = vec![vec![Tile::Empty; 40]; 12];
        rows[11] = vec![Tile::Ground; 40];
        rows
    }

    fn grounded_player() -> Player {
        // Flush with the ground row (row 11 starts at y = 176).
        let mut p = Player::new(32.0, 161.0);
        p.paused = false;
        p
    }

    fn held(ms: u32) -> FrameInput {
        FrameInput { jump_held: true, jump_held_ms: ms }
    }

    /// One full tick: drive, physics, settle.
    fn tick(p: &mut Player, tiles: &[Vec<Tile>], input: FrameInput, cfg: &JumpConfig) -> MovementOutcome {
        let out = drive(p, input, 0.0, cfg, DT_MS);
        step_body(&mut p.body, tiles, cfg.gravity, DT);
        settle(p);
        out
    }

    #[test]
    fn fresh_press_jumps_from_ground() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        assert_eq!(p.state, JumpState::Grounded);
        assert!(p.body.blocked.down);

        let out = tick(&mut p, &tiles, held(0), &cfg);
        assert!(out.jumped);
        assert_eq!(p.state, JumpState::Rising);
        assert!(p.body.vy < 0.0);
    }

    #[test]
    fn stale_press_does_not_jump() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        let out = tick(&mut p, &tiles, held(cfg.window_ms), &cfg);
        assert!(!out.jumped);
        assert_eq!(p.state, JumpState::Grounded);
    }

    #[test]
    fn held_press_jumps_only_once() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);

        let mut jumps = 0;
        for i in 0..200 {
            // Press stays within the window by reporting a small duration.
            if tick(&mut p, &tiles, held(i % 10), &cfg).jumped {
                jumps += 1;
            }
        }
        assert_eq!(jumps, 1);
    }

    #[test]
    fn release_while_rising_starts_float() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        tick(&mut p, &tiles, held(0), &cfg);
        tick(&mut p, &tiles, held(16), &cfg);
        assert_eq!(p.state, JumpState::Rising);

        drive(&mut p, FrameInput::default(), 0.0, &cfg, DT_MS);
        assert_eq!(p.state, JumpState::Falling);
        assert!(p.floating);
        assert_eq!(p.body.vy, 0.0);
        assert_eq!(p.body.gravity_scale, cfg.float_gravity_scale);
    }

    #[test]
    fn hold_timeout_ends_rise() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        tick(&mut p, &tiles, held(0), &cfg);

        let mut ms = 0;
        while p.state == JumpState::Rising {
            ms += DT_MS;
            tick(&mut p, &tiles, held(ms), &cfg);
            assert!(ms <= cfg.hold_ms + DT_MS);
        }
        assert_eq!(p.state, JumpState::Falling);
    }

    #[test]
    fn float_window_restores_full_gravity() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        tick(&mut p, &tiles, held(0), &cfg);
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        assert!(p.floating);

        let ticks = cfg.float_ms / DT_MS + 1;
        for _ in 0..ticks {
            tick(&mut p, &tiles, FrameInput::default(), &cfg);
        }
        assert!(!p.floating);
        assert_eq!(p.body.gravity_scale, 1.0);
    }

    #[test]
    fn jump_cycle_lands_then_grounds() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        tick(&mut p, &tiles, held(0), &cfg);

        let mut seen_landing = false;
        for _ in 0..200 {
            tick(&mut p, &tiles, FrameInput::default(), &cfg);
            if p.state == JumpState::Landing {
                seen_landing = true;
            }
        }
        assert!(seen_landing);
        assert_eq!(p.state, JumpState::Grounded);
    }

    #[test]
    fn press_while_landing_waits_for_ground() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        tick(&mut p, &tiles, held(0), &cfg);
        while p.state != JumpState::Landing {
            tick(&mut p, &tiles, FrameInput::default(), &cfg);
        }

        // Fresh press on the first landing tick is ignored.
        let out = tick(&mut p, &tiles, held(0), &cfg);
        assert!(!out.jumped);
        assert_eq!(p.state, JumpState::Landing);
        assert_eq!(p.body.vy, 0.0);

        // Once landing_ms has run out the same tick promotes and may jump.
        p.state_ms = cfg.landing_ms;
        let out = tick(&mut p, &tiles, held(0), &cfg);
        assert!(out.jumped);
        assert_eq!(p.state, JumpState::Rising);
    }

    #[test]
    fn walking_off_a_ledge_falls() {
        let cfg = GameConfig::default().jump;
        let mut tiles = flat_ground();
        for x in 4..40 {
            tiles[11][x] = Tile::Empty;
        }
        let mut p = grounded_player();
        p.body.x = 40.0;
        tick(&mut p, &tiles, FrameInput::default(), &cfg);

        for _ in 0..30 {
            drive(&mut p, FrameInput::default(), 90.0, &cfg, DT_MS);
            step_body(&mut p.body, &tiles, cfg.gravity, DT);
            settle(&mut p);
        }
        assert_eq!(p.state, JumpState::Falling);
        assert!(!p.floating);
    }

    #[test]
    fn dead_is_absorbing() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);

        assert!(kill(&mut p));
        assert!(!kill(&mut p));
        for i in 0..50 {
            let input = if i % 2 == 0 { held(0) } else { FrameInput::default() };
            let out = tick(&mut p, &tiles, input, &cfg);
            assert!(!out.jumped);
            assert_eq!(p.state, JumpState::Dead);
        }
        assert!(!p.alive);
        assert!(!p.body.allow_gravity);
    }

    #[test]
    fn paused_player_holds_still_and_keeps_state() {
        let cfg = GameConfig::default().jump;
        let tiles = flat_ground();
        let mut p = grounded_player();
        tick(&mut p, &tiles, FrameInput::default(), &cfg);
        p.paused = true;
        let x = p.body.x;
        let out = drive(&mut p, held(0), 90.0, &cfg, DT_MS);
        assert!(!out.jumped);
        assert_eq!(p.body.vx, 0.0);
        assert_eq!(p.body.x, x);
        assert_eq!(p.state, JumpState::Grounded);
    }

    #[test]
    fn runs_at_stage_speed() {
        let cfg = GameConfig::default().jump;
        let mut p = grounded_player();
        drive(&mut p, FrameInput::default(), 90.0, &cfg, DT_MS);
        assert_eq!(p.body.vx, 90.0);
    }

    #[test]
    fn death_line_is_body_bottom() {
        let mut p = grounded_player();
        p.body.y = 215.0;
        assert!(!fell_out(&p, 230.0));
        p.body.y = 215.5;
        assert!(fell_out(&p, 230.0));
    }
}

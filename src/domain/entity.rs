/// Entities: Player, Pursuer, Coin.
/// Each entity owns a physics body plus its own state; controllers in
/// `movement` and `pursuer` operate on these structs.

use super::physics::Body;

/// Player body size in px.
pub const PLAYER_SIZE: f32 = 15.0;
/// Pursuer and coin body size in px.
pub const PURSUER_SIZE: f32 = 16.0;
pub const COIN_SIZE: f32 = 16.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Player jump state machine. `Dead` is absorbing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpState {
    Grounded,
    Rising,
    Falling,
    Landing,
    Dead,
}

/// Frame input for the player: jump is a held action with a duration,
/// so the controller can tell a fresh press from a stale one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub jump_held: bool,
    /// How long the current press has been held, in ms (0 when released).
    pub jump_held_ms: u32,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub state: JumpState,
    pub facing: Facing,
    pub alive: bool,
    pub paused: bool,
    pub visible: bool,
    /// Time spent in the current state, in ms of simulation time.
    pub state_ms: u32,
    /// The reduced-gravity window after a rise is active.
    pub floating: bool,
    /// The current press already produced a jump; cleared on release.
    pub jump_consumed: bool,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Player {
            body: Body::new(x, y, PLAYER_SIZE, PLAYER_SIZE),
            state: JumpState::Grounded,
            facing: Facing::Right,
            alive: true,
            paused: true,
            visible: true,
            state_ms: 0,
            floating: false,
            jump_consumed: false,
        }
    }

    /// Reset in place at a spawn point, paused and alive.
    pub fn respawn(&mut self, x: f32, y: f32) {
        *self = Player::new(x, y);
    }

    pub fn is_dead(&self) -> bool {
        self.state == JumpState::Dead
    }
}

#[derive(Clone, Debug)]
pub struct Pursuer {
    pub body: Body,
    pub paused: bool,
    pub visible: bool,
    /// Heading in radians, for drawing.
    pub angle: f32,
    /// The launch animation has been triggered for this stage.
    pub launched: bool,
}

impl Pursuer {
    pub fn new(x: f32, y: f32) -> Self {
        let mut body = Body::new(x, y, PURSUER_SIZE, PURSUER_SIZE);
        body.allow_gravity = false;
        Pursuer {
            body,
            paused: true,
            visible: true,
            angle: 0.0,
            launched: false,
        }
    }

    /// Reset in place: re-enabled, visible, paused.
    pub fn respawn(&mut self, x: f32, y: f32) {
        self.body.reset(x, y);
        self.paused = true;
        self.visible = true;
        self.angle = 0.0;
        self.launched = false;
    }
}

/// A pooled coin. Inactive coins are neither drawn nor collectable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coin {
    pub x: f32,
    pub y: f32,
    pub active: bool,
    pub collected: bool,
}

impl Coin {
    pub fn inactive() -> Self {
        Coin { x: 0.0, y: 0.0, active: false, collected: false }
    }
}

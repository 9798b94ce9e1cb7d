/// Arcade physics: axis-aligned bodies moving through a tile grid.
///
/// Two kinds of motion:
///   - `step_body`     : gravity + tile collision (the player)
///   - `step_free_body`: straight-line motion clamped to world bounds
///                        (the pursuer), no gravity and no tiles
///
/// Tile collision rules:
///   - Left, right and top outside the map are solid.
///   - Below the map is open, so a body can fall into a pit.
///
/// Horizontal motion is resolved before vertical motion, and each axis
/// snaps the body flush against the blocking tile edge.

use super::tile::{Tile, TILE_PX};

/// Terminal fall speed in px/s. Keeps per-tick displacement under one tile.
pub const MAX_FALL_SPEED: f32 = 600.0;

const EPS: f32 = 0.001;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Which sides touched solid geometry during the last step.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Blocked {
    pub down: bool,
    pub up: bool,
    pub right: bool,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub vx: f32,
    pub vy: f32,
    pub enabled: bool,
    pub allow_gravity: bool,
    pub gravity_scale: f32,
    pub blocked: Blocked,
}

impl Body {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Body {
            x, y, w, h,
            vx: 0.0,
            vy: 0.0,
            enabled: true,
            allow_gravity: true,
            gravity_scale: 1.0,
            blocked: Blocked::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Zero both velocity components.
    pub fn stop(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
    }

    /// Move to a position, stop, re-enable and forget contact flags.
    pub fn reset(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.stop();
        self.enabled = true;
        self.blocked = Blocked::default();
    }
}

// ══════════════════════════════════════════════════════════════
// Tile queries
// ══════════════════════════════════════════════════════════════

/// Is the tile at grid cell (tx, ty) solid? Out-of-map rules apply.
pub fn solid_at(tiles: &[Vec<Tile>], tx: i32, ty: i32) -> bool {
    let height = tiles.len() as i32;
    let width = tiles.first().map_or(0, |row| row.len()) as i32;
    if tx < 0 || tx >= width || ty < 0 {
        return true;
    }
    if ty >= height {
        return false;
    }
    tiles[ty as usize][tx as usize].is_solid()
}

fn cell(coord: f32) -> i32 {
    (coord / TILE_PX).floor() as i32
}

/// Any solid tile in column `tx` across the vertical span [y, y+h)?
fn column_blocked(tiles: &[Vec<Tile>], tx: i32, y: f32, h: f32) -> bool {
    (cell(y)..=cell(y + h - EPS)).any(|ty| solid_at(tiles, tx, ty))
}

/// Any solid tile in row `ty` across the horizontal span [x, x+w)?
fn row_blocked(tiles: &[Vec<Tile>], ty: i32, x: f32, w: f32) -> bool {
    (cell(x)..=cell(x + w - EPS)).any(|tx| solid_at(tiles, tx, ty))
}

// ══════════════════════════════════════════════════════════════
// Integration
// ══════════════════════════════════════════════════════════════

/// Advance a gravity body by `dt` seconds through the tile grid.
pub fn step_body(body: &mut Body, tiles: &[Vec<Tile>], gravity: f32, dt: f32) {
    body.blocked = Blocked::default();
    if !body.enabled {
        return;
    }

    if body.allow_gravity {
        body.vy = (body.vy + gravity * body.gravity_scale * dt).min(MAX_FALL_SPEED);
    }

    // ── Horizontal ──
    let dx = body.vx * dt;
    if dx > 0.0 {
        let target = body.x + dx;
        let tx = cell(target + body.w - EPS);
        if column_blocked(tiles, tx, body.y, body.h) {
            body.x = tx as f32 * TILE_PX - body.w;
            body.vx = 0.0;
            body.blocked.right = true;
        } else {
            body.x = target;
        }
    } else if dx < 0.0 {
        let target = body.x + dx;
        let tx = cell(target);
        if column_blocked(tiles, tx, body.y, body.h) {
            body.x = (tx + 1) as f32 * TILE_PX;
            body.vx = 0.0;
        } else {
            body.x = target;
        }
    }

    // ── Vertical ──
    let dy = body.vy * dt;
    if dy > 0.0 {
        let target = body.y + dy;
        let ty = cell(target + body.h - EPS);
        if row_blocked(tiles, ty, body.x, body.w) {
            body.y = ty as f32 * TILE_PX - body.h;
            body.vy = 0.0;
            body.blocked.down = true;
        } else {
            body.y = target;
        }
    } else if dy < 0.0 {
        let target = body.y + dy;
        let ty = cell(target);
        if row_blocked(tiles, ty, body.x, body.w) {
            body.y = (ty + 1) as f32 * TILE_PX;
            body.vy = 0.0;
            body.blocked.up = true;
        } else {
            body.y = target;
        }
    }
}

/// Advance a body in a straight line, clamped to `[0, bounds_w] × [0, bounds_h]`.
pub fn step_free_body(body: &mut Body, bounds_w: f32, bounds_h: f32, dt: f32) {
    body.blocked = Blocked::default();
    if !body.enabled {
        return;
    }
    body.x = (body.x + body.vx * dt).clamp(0.0, (bounds_w - body.w).max(0.0));
    body.y = (body.y + body.vy * dt).clamp(0.0, (bounds_h - body.h).max(0.0));
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.016;

    fn tiles_from(rows: &[&str]) -> Vec<Vec<Tile>> {
        rows.iter()
            .map(|row| row.chars().map(|ch| Tile::from_char(ch).unwrap_or(Tile::Empty)).collect())
            .collect()
    }

    // ── Rect ──

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 16.0, 16.0);
        let b = Rect::new(16.0, 0.0, 16.0, 16.0);
        assert!(!a.overlaps(&b));
        let c = Rect::new(15.0, 15.0, 16.0, 16.0);
        assert!(a.overlaps(&c));
    }

    // ── solid_at ──

    #[test]
    fn outside_map_sides_are_solid_below_is_open() {
        let t = tiles_from(&["  ", "##"]);
        assert!(solid_at(&t, -1, 0));
        assert!(solid_at(&t, 2, 0));
        assert!(solid_at(&t, 0, -1));
        assert!(!solid_at(&t, 0, 5));
        assert!(solid_at(&t, 1, 1));
        assert!(!solid_at(&t, 1, 0));
    }

    // ── step_body ──

    #[test]
    fn body_lands_on_ground() {
        let t = tiles_from(&["    ", "    ", "####"]);
        let mut b = Body::new(8.0, 10.0, 15.0, 15.0);
        for _ in 0..60 {
            step_body(&mut b, &t, 1000.0, DT);
        }
        assert!(b.blocked.down);
        assert_eq!(b.bottom(), 32.0);
        assert_eq!(b.vy, 0.0);
    }

    #[test]
    fn body_falls_through_water_and_pits() {
        let t = tiles_from(&["    ", "    ", "#~ #"]);
        let mut b = Body::new(17.0, 10.0, 14.0, 14.0);
        for _ in 0..60 {
            step_body(&mut b, &t, 1000.0, DT);
        }
        assert!(!b.blocked.down);
        assert!(b.y > 48.0);
    }

    #[test]
    fn wall_blocks_right_movement() {
        let t = tiles_from(&["   #", "   #", "####"]);
        let mut b = Body::new(10.0, 17.0, 15.0, 15.0);
        b.vx = 90.0;
        for _ in 0..60 {
            b.vx = 90.0;
            step_body(&mut b, &t, 1000.0, DT);
        }
        assert!(b.blocked.right);
        assert_eq!(b.x + b.w, 48.0);
    }

    #[test]
    fn ceiling_sets_blocked_up() {
        let t = tiles_from(&["####", "    ", "    "]);
        let mut b = Body::new(8.0, 20.0, 15.0, 15.0);
        b.vy = -400.0;
        step_body(&mut b, &t, 1000.0, DT);
        assert!(b.blocked.up);
        assert_eq!(b.y, 16.0);
        assert_eq!(b.vy, 0.0);
    }

    #[test]
    fn disabled_body_does_not_move() {
        let t = tiles_from(&["    ", "####"]);
        let mut b = Body::new(0.0, 0.0, 15.0, 15.0);
        b.enabled = false;
        b.vx = 100.0;
        step_body(&mut b, &t, 1000.0, DT);
        assert_eq!((b.x, b.y), (0.0, 0.0));
    }

    // ── step_free_body ──

    #[test]
    fn free_body_ignores_gravity_and_clamps() {
        let mut b = Body::new(0.0, 0.0, 16.0, 16.0);
        b.allow_gravity = false;
        b.vx = -50.0;
        b.vy = 10_000.0;
        step_free_body(&mut b, 100.0, 100.0, DT);
        assert_eq!(b.x, 0.0);
        assert_eq!(b.y, 84.0);
    }
}

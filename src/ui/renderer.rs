/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.
///
/// The world is drawn at tile resolution: one 16 px tile is one terminal
/// row high and two columns wide. Entities snap to the tile under their
/// center.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Facing, JumpState};
use crate::domain::tile::{Tile, TILE_PX};
use crate::sim::highscore::HighScoreEntry;
use crate::sim::level::STAGE_ROWS;
use crate::sim::world::{Phase, WorldState};

use super::hud::Hud;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same explicit RGB for `Clear(ClearType::All)` and every
    /// cell's background keeps the inter-row gap color identical to the
    /// cell color on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            Some(&mut self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Write a string horizontally centered on row y.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    /// Paint a whole row with a background color.
    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Each map tile = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MSG_ROW: usize = MAP_ROW + STAGE_ROWS + 1;
const HELP_ROW: usize = MSG_ROW + 2;

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const GROUND: Color = Color::Rgb { r: 150, g: 90, b: 40 };
const BRICK: Color = Color::Rgb { r: 190, g: 70, b: 50 };
const WATER: Color = Color::Rgb { r: 40, g: 90, b: 200 };
const SKY: Color = Color::Rgb { r: 30, g: 30, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    /// Enter raw mode and the alternate screen. Focus reporting is only
    /// requested when `focus_reporting` is set, so it is enabled once.
    pub fn init(&mut self, focus_reporting: bool) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        if focus_reporting {
            execute!(self.writer, EnableFocusChange)?;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            DisableFocusChange,
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState, hud: &Hud) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing => {
                // Viewport = terminal cols / CELL_W tiles wide.
                world.camera.view_w = (self.term_w / CELL_W) as f32 * TILE_PX;
                let width = world.current_stage().width_px();
                let target = world.player.body.center().0;
                world.camera.follow(target, width);
                self.compose_game(world, hud);
            }
            Phase::GameOverScreen => self.compose_game_over(world),
        }

        // Pause overlay (drawn on top of game)
        if world.phase == Phase::Playing && world.paused {
            self.compose_pause_overlay();
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame.
        // Do NOT use ResetColor here: the terminal default may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set colors only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState, hud: &Hud) {
        // ── HUD row ──
        let status = format!(
            " {:<14} {:<10} {} ",
            hud.score_label(),
            hud.stage_label(),
            hud.speed_label(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &status, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        let first_tile = (w.camera.x / TILE_PX).floor() as i32;
        let view_tiles = self.front.width / CELL_W;
        let tiles = w.tiles();
        for (ty, row) in tiles.iter().enumerate() {
            for vx in 0..view_tiles {
                let tx = first_tile + vx as i32;
                let tile = if tx < 0 {
                    Tile::Empty
                } else {
                    row.get(tx as usize).copied().unwrap_or_default()
                };
                let (ch, fg, bg) = tile_glyph(tile);
                let col = vx * CELL_W;
                self.front.set(col, MAP_ROW + ty, Cell::new(ch, fg, bg));
                self.front.set(col + 1, MAP_ROW + ty, Cell::new(ch, fg, bg));
            }
        }

        // ── Entities ──
        for coin in w.coins.active() {
            self.put_sprite(first_tile, coin.x + TILE_PX / 2.0, coin.y + TILE_PX / 2.0, '●', GOLD);
        }
        if w.pursuer.visible {
            let (cx, cy) = w.pursuer.body.center();
            let glyph = if w.pursuer.launched { heading_glyph(w.pursuer.angle) } else { '◉' };
            self.put_sprite(first_tile, cx, cy, glyph, RED);
        }
        if w.player.visible {
            let (cx, cy) = w.player.body.center();
            self.put_sprite(first_tile, cx, cy, player_glyph(w.player.state, w.player.facing), GREEN);
        }
        for anim in &w.fx.animations {
            self.put_sprite(first_tile, anim.x, anim.y, explosion_glyph(anim.frame()), GOLD);
        }

        // ── Fade ──
        let level = w.fx.fade_level();
        if level > 0.0 {
            for y in MAP_ROW..MAP_ROW + STAGE_ROWS {
                for x in 0..self.front.width {
                    if let Some(cell) = self.front.get_mut(x, y) {
                        cell.fg = dim(cell.fg, level);
                        cell.bg = dim(cell.bg, level);
                    }
                }
            }
        }

        // ── Message bar ──
        if let Some((header, start)) = hud.countdown_labels() {
            self.front.put_centered(MSG_ROW, &header, GOLD, Color::Reset);
            self.front.put_centered(MSG_ROW + 1, &start, Color::White, Color::Reset);
        } else if let Some(bonus) = hud.bonus_label() {
            self.front.put_centered(MSG_ROW, &bonus, GREEN, Color::Reset);
        }

        // ── Help bar ──
        let help = " ↑/Space/Click:Jump  P/F1:Pause  Esc:Title  │  Pad: A/B/R1 Jump";
        self.front.put_str(0, HELP_ROW, help, Color::DarkGrey, Color::Reset);
    }

    /// Draw a one-tile sprite whose center is at world (x, y).
    fn put_sprite(&mut self, first_tile: i32, x: f32, y: f32, ch: char, fg: Color) {
        let tx = (x / TILE_PX).floor() as i32 - first_tile;
        let ty = (y / TILE_PX).floor() as i32;
        if tx < 0 || ty < 0 || ty as usize >= STAGE_ROWS {
            return;
        }
        let col = tx as usize * CELL_W;
        let row = MAP_ROW + ty as usize;
        let bg = self.front.get(col, row).bg;
        self.front.set(col, row, Cell::new(ch, fg, bg));
        self.front.set(col + 1, row, Cell::new(' ', fg, bg));
    }

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r" ___          _      ___                          ",
            r"|   \ __ _ __| |_   | _ \_  _ _ _  _ _  ___ _ _  ",
            r"| |) / _` (_-< ' \  |   / || | ' \| ' \/ -_) '_| ",
            r"|___/\__,_/__/_||_| |_|_\\_,_|_||_|_||_\___|_|   ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_centered(2 + i, line, GOLD, Color::Reset);
        }

        self.front.put_centered(8, "outrun the missile, grab the coins", GREEN, Color::Reset);

        self.front.put_centered(10, "high scores", GOLD, Color::Reset);
        let rows = high_score_rows(&w.high_scores);
        if rows.is_empty() {
            self.front.put_centered(12, "no scores yet", Color::DarkGrey, Color::Reset);
        }
        for (i, row) in rows.iter().enumerate() {
            self.front.put_centered(12 + i, row, Color::White, Color::Reset);
        }

        self.front.put_centered(19, "press jump to start", GREEN, Color::Reset);
        self.front.put_centered(21, "↑ / Space / W / click : jump     p / F1 : pause     q / Esc : quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        self.front.put_centered(3, "game over", RED, Color::Reset);

        let Some(summary) = &w.summary else {
            self.front.put_centered(10, "press jump to retry", GREEN, Color::Reset);
            return;
        };

        let (headline, entries, rank) = match &summary.record {
            Some(rec) if rec.is_new_high_score() => (
                format!("new high score : {} points", summary.score),
                rec.entries.as_slice(),
                rec.rank,
            ),
            Some(rec) => (format!("score : {} points", summary.score), rec.entries.as_slice(), None),
            None => (format!("score : {} points", summary.score), w.high_scores.as_slice(), None),
        };
        let headline_fg = if rank.is_some() { GOLD } else { Color::White };
        self.front.put_centered(5, &headline, headline_fg, Color::Reset);

        self.front.put_centered(8, "high scores", GOLD, Color::Reset);
        for (i, row) in high_score_rows(entries).iter().enumerate() {
            let fg = if rank == Some(i) { GREEN } else { Color::White };
            self.front.put_centered(10 + i, row, fg, Color::Reset);
        }

        self.front.put_centered(17, "press jump to retry", GREEN, Color::Reset);
        self.front.put_centered(18, "Esc : back to title", Color::DarkGrey, Color::Reset);
    }

    fn compose_pause_overlay(&mut self) {
        let dim_bg = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_w = 24_usize.min(self.front.width);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + 3;

        for y in box_y..box_y + 5 {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, dim_bg));
            }
        }
        self.front.put_centered(box_y + 1, "pause", GOLD, dim_bg);
        self.front.put_centered(box_y + 3, "p / F1 : resume", Color::Rgb { r: 100, g: 200, b: 255 }, dim_bg);
    }
}

// ── Glyphs ──

fn tile_glyph(tile: Tile) -> (char, Color, Color) {
    match tile {
        Tile::Empty => (' ', Color::White, SKY),
        Tile::Ground => ('█', GROUND, GROUND),
        Tile::Brick => ('▓', BRICK, Color::Rgb { r: 90, g: 30, b: 20 }),
        Tile::Water => ('≈', Color::Rgb { r: 150, g: 200, b: 255 }, WATER),
    }
}

fn player_glyph(state: JumpState, facing: Facing) -> char {
    match (state, facing) {
        (JumpState::Dead, _) => '✕',
        (JumpState::Rising, _) => '▲',
        (JumpState::Falling, _) => '▼',
        (_, Facing::Right) => '▶',
        (_, Facing::Left) => '◀',
    }
}

/// Arrow nearest to a heading in radians (y grows downward).
fn heading_glyph(angle: f32) -> char {
    const ARROWS: [char; 8] = ['→', '↘', '↓', '↙', '←', '↖', '↑', '↗'];
    let octant = (angle / std::f32::consts::FRAC_PI_4).round() as i32;
    ARROWS[octant.rem_euclid(8) as usize]
}

fn explosion_glyph(frame: u32) -> char {
    const FRAMES: [char; 6] = ['·', '*', '✶', '✹', '✺', '·'];
    FRAMES[(frame as usize).min(FRAMES.len() - 1)]
}

/// Darken an RGB color toward black; `level` 1.0 is fully black.
fn dim(color: Color, level: f32) -> Color {
    let keep = (1.0 - level).clamp(0.0, 1.0);
    match color {
        Color::Rgb { r, g, b } => Color::Rgb {
            r: (r as f32 * keep) as u8,
            g: (g as f32 * keep) as u8,
            b: (b as f32 * keep) as u8,
        },
        _ if keep < 0.5 => Color::Black,
        other => other,
    }
}

/// Ranked table lines: `1 : 120 points  speed 90`.
fn high_score_rows(entries: &[HighScoreEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{} : {} points  speed {}", i + 1, e.score, e.speed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::director::start_session;
    use crate::sim::level::parse_stage;
    use pretty_assertions::assert_eq;

    fn row_text(buf: &FrameBuffer, y: usize) -> String {
        (0..buf.width).map(|x| buf.get(x, y).ch).collect()
    }

    #[test]
    fn high_score_rows_are_ranked_from_one() {
        let rows = high_score_rows(&[
            HighScoreEntry { score: 120, speed: 90 },
            HighScoreEntry { score: 95, speed: 100 },
        ]);
        assert_eq!(rows, vec!["1 : 120 points  speed 90", "2 : 95 points  speed 100"]);
    }

    #[test]
    fn heading_glyph_snaps_to_octants() {
        assert_eq!(heading_glyph(0.0), '→');
        assert_eq!(heading_glyph(std::f32::consts::FRAC_PI_2), '↓');
        assert_eq!(heading_glyph(std::f32::consts::PI), '←');
        assert_eq!(heading_glyph(-std::f32::consts::FRAC_PI_2), '↑');
    }

    #[test]
    fn dim_scales_rgb() {
        assert_eq!(dim(Color::Rgb { r: 200, g: 100, b: 50 }, 0.5), Color::Rgb { r: 100, g: 50, b: 25 });
        assert_eq!(dim(Color::Rgb { r: 200, g: 100, b: 50 }, 1.0), Color::Rgb { r: 0, g: 0, b: 0 });
        assert_eq!(dim(Color::White, 0.9), Color::Black);
    }

    #[test]
    fn put_centered_clips_to_width() {
        let mut buf = FrameBuffer::new(10, 1);
        buf.put_centered(0, "pause", Color::White, Color::Reset);
        assert_eq!(row_text(&buf, 0), "  pause   ");
        buf.put_centered(0, "a very long line", Color::White, Color::Reset);
        assert_eq!(row_text(&buf, 0), "a very lon");
    }

    #[test]
    fn game_frame_shows_hud_and_countdown() {
        let mut text = String::from("# Flat\n");
        for _ in 0..11 {
            text.push('\n');
        }
        text.push_str(&"#".repeat(40));
        text.push('\n');
        let stage = parse_stage(&text, "flat").unwrap();
        let mut world = WorldState::new(GameConfig::default(), vec![stage; 4]);
        let mut hud = Hud::new();
        hud.apply_all(&start_session(&mut world));

        let mut r = Renderer::new();
        r.front.resize(80, 24);
        r.compose_game(&world, &hud);

        assert!(row_text(&r.front, HUD_ROW).contains("0 points"));
        assert!(row_text(&r.front, HUD_ROW).contains("stage 1"));
        assert!(row_text(&r.front, HUD_ROW).contains("speed : 90"));
        assert!(row_text(&r.front, MSG_ROW).contains("stage : 1 speed : 90"));
        assert!(row_text(&r.front, MSG_ROW + 1).contains("start in 4"));
        // Ground row is solid across the view.
        assert_eq!(r.front.get(0, MAP_ROW + 11).ch, '█');
    }
}

/// Stage loader.
///
/// ## Sources (priority order):
///   1. `levels_dir/stage*.txt` (individual files, sorted by name)
///   2. Built-in embedded stages
///
/// ## Stage format (`.txt`):
///   ```
///   # Stage Name
///   @ exit=3900
///   <12 map rows>
///   ```
///
/// The `@ exit=<px>` line is optional; without it the exit threshold sits
/// 100 px before the right edge of the map.
///
/// ## Tile legend:
///   '#' = Ground (solid)         '=' = Brick platform (solid)
///   '~' = Water (falls through)  'o' = Coin
///   'P' = Player spawn           'B' = Pursuer spawn
///   ' ' = Empty
///
/// Malformed stages are configuration errors: loading fails with
/// `GameError::Stage` rather than substituting another stage.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::tile::{Tile, TILE_PX};
use crate::error::{GameError, GameResult};

/// Every stage is exactly this many rows tall.
pub const STAGE_ROWS: usize = 12;
/// Default exit margin from the right edge of the map, in px.
const DEFAULT_EXIT_MARGIN: f32 = 100.0;

pub const DEFAULT_PLAYER_SPAWN: (f32, f32) = (160.0, 160.0);
pub const DEFAULT_PURSUER_SPAWN: (f32, f32) = (10.0, 160.0);

/// A parsed, validated stage.
#[derive(Clone, Debug)]
pub struct StageDef {
    pub name: String,
    pub tiles: Vec<Vec<Tile>>,
    /// Coin markers, top-left corner in px.
    pub coins: Vec<(f32, f32)>,
    pub player_spawn: (f32, f32),
    pub pursuer_spawn: (f32, f32),
    /// The stage ends once the player's x passes this line.
    pub exit_x: f32,
}

impl StageDef {
    pub fn width(&self) -> usize {
        self.tiles.first().map_or(0, |row| row.len())
    }

    pub fn height(&self) -> usize {
        self.tiles.len()
    }

    pub fn width_px(&self) -> f32 {
        self.width() as f32 * TILE_PX
    }

    pub fn height_px(&self) -> f32 {
        self.height() as f32 * TILE_PX
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load every stage for the session. Needs at least one stage per
/// level of a world.
pub fn load_stages(config: &GameConfig) -> GameResult<Vec<StageDef>> {
    let dir = &config.levels_dir;
    let stages = if dir.is_dir() && has_stage_files(dir) {
        info!(dir = %dir.display(), "loading stages from directory");
        load_from_directory(dir)?
    } else {
        debug!("using embedded stages");
        embedded_stages()?
    };

    let needed = config.speed.levels_per_world as usize;
    if stages.len() < needed {
        return Err(GameError::stage(format!(
            "found {} stages but a world needs {}",
            stages.len(),
            needed
        )));
    }
    Ok(stages)
}

/// Parse a single stage. `label` names the source in diagnostics.
pub fn parse_stage(content: &str, label: &str) -> GameResult<StageDef> {
    let mut name = String::new();
    let mut exit_x: Option<f32> = None;
    let mut rows: Vec<&str> = vec![];

    for line in content.lines() {
        if name.is_empty() && rows.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(meta) = line.strip_prefix("@ ") {
            exit_x = parse_meta(meta, label)?.or(exit_x);
        } else {
            rows.push(line);
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(GameError::stage(format!("{label}: empty map")));
    }
    if rows.len() != STAGE_ROWS {
        return Err(GameError::stage(format!(
            "{label}: map has {} rows, expected {STAGE_ROWS}",
            rows.len()
        )));
    }

    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut tiles = vec![vec![Tile::Empty; width]; STAGE_ROWS];
    let mut coins = vec![];
    let mut player_spawn = DEFAULT_PLAYER_SPAWN;
    let mut pursuer_spawn = DEFAULT_PURSUER_SPAWN;

    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let tile = Tile::from_char(ch).ok_or_else(|| {
                GameError::stage(format!(
                    "{label}: unknown tile '{ch}' at row {}, column {}",
                    y + 1,
                    x + 1
                ))
            })?;
            tiles[y][x] = tile;

            let px = (x as f32 * TILE_PX, y as f32 * TILE_PX);
            match ch {
                'o' => coins.push(px),
                'P' => player_spawn = px,
                'B' => pursuer_spawn = px,
                _ => {}
            }
        }
    }

    let width_px = width as f32 * TILE_PX;
    let exit_x = exit_x.unwrap_or(width_px - DEFAULT_EXIT_MARGIN);
    if exit_x <= player_spawn.0 || exit_x >= width_px {
        return Err(GameError::stage(format!(
            "{label}: exit threshold {exit_x} is not inside the map (spawn {}, width {width_px})",
            player_spawn.0
        )));
    }

    if name.is_empty() {
        name = label.to_string();
    }

    Ok(StageDef { name, tiles, coins, player_spawn, pursuer_spawn, exit_x })
}

// ══════════════════════════════════════════════════════════════
// Parsing helpers
// ══════════════════════════════════════════════════════════════

/// Distinguish `# Stage Name` from a map row that starts with ground.
/// A name line has a letter that is not a marker character.
fn is_name_line(line: &str) -> bool {
    match line.strip_prefix('#') {
        Some(rest) => rest
            .chars()
            .any(|c| c.is_alphabetic() && !matches!(c, 'o' | 'P' | 'B')),
        None => false,
    }
}

/// Parse `key=value` pairs of an `@` line. Returns the exit threshold if set.
fn parse_meta(meta: &str, label: &str) -> GameResult<Option<f32>> {
    let mut exit = None;
    for pair in meta.split_whitespace() {
        match pair.split_once('=') {
            Some(("exit", value)) => {
                let px = value.parse::<f32>().map_err(|_| {
                    GameError::stage(format!("{label}: bad exit value '{value}'"))
                })?;
                exit = Some(px);
            }
            Some((key, _)) => warn!("{label}: ignoring unknown stage key '{key}'"),
            None => warn!("{label}: ignoring malformed metadata '{pair}'"),
        }
    }
    Ok(exit)
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn is_stage_file(path: &Path) -> bool {
    let stem_ok = path
        .file_name()
        .map_or(false, |n| n.to_string_lossy().starts_with("stage"));
    stem_ok && path.extension().map_or(false, |e| e == "txt")
}

fn has_stage_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().any(|e| is_stage_file(&e.path())))
        .unwrap_or(false)
}

fn load_from_directory(dir: &Path) -> GameResult<Vec<StageDef>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_stage_file(p))
        .collect();
    paths.sort();

    let mut stages = vec![];
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        let label = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        stages.push(parse_stage(&content, &label)?);
    }
    Ok(stages)
}

// ══════════════════════════════════════════════════════════════
// Embedded stages
// ══════════════════════════════════════════════════════════════

const EMBEDDED: [(&str, &str); 4] = [
    ("stage1.txt", include_str!("../../stages/stage1.txt")),
    ("stage2.txt", include_str!("../../stages/stage2.txt")),
    ("stage3.txt", include_str!("../../stages/stage3.txt")),
    ("stage4.txt", include_str!("../../stages/stage4.txt")),
];

fn embedded_stages() -> GameResult<Vec<StageDef>> {
    EMBEDDED
        .iter()
        .map(|(label, content)| parse_stage(content, label))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage_text(exit: Option<&str>, rows: &[&str]) -> String {
        let mut text = String::from("# Test Run\n");
        if let Some(e) = exit {
            text.push_str(&format!("@ exit={e}\n"));
        }
        for r in rows {
            text.push_str(r);
            text.push('\n');
        }
        text
    }

    fn flat_rows(width: usize) -> Vec<String> {
        let mut rows = vec![" ".repeat(width); STAGE_ROWS];
        rows[STAGE_ROWS - 1] = "#".repeat(width);
        rows
    }

    fn as_refs(rows: &[String]) -> Vec<&str> {
        rows.iter().map(String::as_str).collect()
    }

    #[test]
    fn parses_name_exit_coins_and_spawns() {
        let mut rows = flat_rows(30);
        rows[9] = format!("   P    o   o{}", " ".repeat(17));
        rows[10] = format!("B{}", " ".repeat(29));
        let text = stage_text(Some("400"), &as_refs(&rows));
        let stage = parse_stage(&text, "t").unwrap();

        assert_eq!(stage.name, "Test Run");
        assert_eq!(stage.exit_x, 400.0);
        assert_eq!(stage.coins, vec![(128.0, 144.0), (192.0, 144.0)]);
        assert_eq!(stage.player_spawn, (48.0, 144.0));
        assert_eq!(stage.pursuer_spawn, (0.0, 160.0));
        assert_eq!(stage.width(), 30);
        assert_eq!(stage.tiles[11][0], Tile::Ground);
    }

    #[test]
    fn exit_defaults_to_margin_before_edge() {
        let rows = flat_rows(250);
        let stage = parse_stage(&stage_text(None, &as_refs(&rows)), "t").unwrap();
        assert_eq!(stage.exit_x, 3900.0);
        assert_eq!(stage.player_spawn, DEFAULT_PLAYER_SPAWN);
    }

    #[test]
    fn ground_row_is_not_mistaken_for_a_name() {
        assert!(!is_name_line("####  oo ##"));
        assert!(is_name_line("# Stage 2 - Canal"));
    }

    #[test]
    fn unknown_tile_fails_fast() {
        let mut rows = flat_rows(30);
        rows[4] = format!("  H{}", " ".repeat(27));
        let err = parse_stage(&stage_text(None, &as_refs(&rows)), "bad.txt").unwrap_err();
        assert!(err.to_string().contains("unknown tile 'H' at row 5, column 3"));
    }

    #[test]
    fn wrong_height_fails_fast() {
        let rows = flat_rows(30);
        let err = parse_stage(&stage_text(None, &as_refs(&rows[1..])), "short").unwrap_err();
        assert!(matches!(err, GameError::Stage { .. }));
    }

    #[test]
    fn empty_map_fails_fast() {
        let err = parse_stage("# Nothing\n@ exit=10\n\n", "empty").unwrap_err();
        assert!(err.to_string().contains("empty map"));
    }

    #[test]
    fn exit_outside_map_fails_fast() {
        let rows = flat_rows(30);
        assert!(parse_stage(&stage_text(Some("9999"), &as_refs(&rows)), "t").is_err());
        assert!(parse_stage(&stage_text(Some("abc"), &as_refs(&rows)), "t").is_err());
    }

    #[test]
    fn embedded_stages_are_valid() {
        let stages = embedded_stages().unwrap();
        assert_eq!(stages.len(), 4);
        for stage in &stages {
            assert_eq!(stage.height(), STAGE_ROWS);
            assert_eq!(stage.exit_x, 3900.0);
            assert!(!stage.coins.is_empty());
        }
    }

    #[test]
    fn directory_stages_override_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let rows = flat_rows(40);
        for i in 1..=4 {
            let text = stage_text(None, &as_refs(&rows)).replace("Test Run", &format!("Custom {i}"));
            std::fs::write(dir.path().join(format!("stage{i}.txt")), text).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a stage").unwrap();

        let mut config = GameConfig::default();
        config.levels_dir = dir.path().to_path_buf();
        let stages = load_stages(&config).unwrap();
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Custom 1", "Custom 2", "Custom 3", "Custom 4"]);
    }

    #[test]
    fn too_few_stages_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let rows = flat_rows(40);
        std::fs::write(dir.path().join("stage1.txt"), stage_text(None, &as_refs(&rows))).unwrap();

        let mut config = GameConfig::default();
        config.levels_dir = dir.path().to_path_buf();
        let err = load_stages(&config).unwrap_err();
        assert!(err.to_string().contains("a world needs 4"));
    }
}

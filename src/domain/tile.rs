/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

/// Edge length of one map tile, in world pixels.
pub const TILE_PX: f32 = 16.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Ground, // Solid
    Brick,  // Solid (floating platforms)
    Water,  // Drawn only, the player falls through
}

impl Tile {
    /// Does this tile block a body?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Ground | Tile::Brick)
    }

    /// Map a stage-file character to a tile. Markers (`o`, `P`, `B`) are
    /// not tiles and map to `Empty`; unknown characters yield `None`.
    pub fn from_char(ch: char) -> Option<Tile> {
        match ch {
            '#' => Some(Tile::Ground),
            '=' => Some(Tile::Brick),
            '~' => Some(Tile::Water),
            ' ' | '.' | 'o' | 'P' | 'B' => Some(Tile::Empty),
            _ => None,
        }
    }
}

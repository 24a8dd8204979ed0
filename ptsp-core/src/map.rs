//! Tile maps.
//!
//! A map is a grid of unit tiles. Ship coordinates are expressed in tile
//! units and a point belongs to the tile obtained by rounding both
//! components. Everything outside the grid is a boundary and behaves like a
//! normal wall.
//!
//! The text format uses one character per cell:
//!
//! | char | cell |
//! |------|------|
//! | `.`  | free |
//! | `#`  | normal wall |
//! | `D`  | damaging wall |
//! | `E`  | elastic wall |
//! | `L`  | lava (free, hurts) |
//! | `S`  | ship start (free) |
//! | `W`  | waypoint (free) |
//! | `F`  | fuel tank (free) |
//!
//! An optional first line `scale=<n>` expands every character into an
//! `n x n` block of tiles, so small drawings can describe realistic maps.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DAMAGE_DAMAGE_COLLISION, DAMAGE_NORMAL_COLLISION, RESTITUTION_DAMAGE, RESTITUTION_ELASTIC,
    RESTITUTION_NORMAL,
};
use crate::error::CoreError;

const AXIS_SCAN_LIMIT: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionClass {
    Normal,
    Damage,
    Elastic,
}

impl CollisionClass {
    #[inline]
    pub fn damage(self) -> u32 {
        match self {
            Self::Normal => DAMAGE_NORMAL_COLLISION,
            Self::Damage => DAMAGE_DAMAGE_COLLISION,
            Self::Elastic => 0,
        }
    }

    #[inline]
    pub fn restitution(self) -> f64 {
        match self {
            Self::Normal => RESTITUTION_NORMAL,
            Self::Damage => RESTITUTION_DAMAGE,
            Self::Elastic => RESTITUTION_ELASTIC,
        }
    }

    /// Elastic walls never start an invulnerability window.
    #[inline]
    pub fn is_harmful(self) -> bool {
        !matches!(self, Self::Elastic)
    }
}

/// Orientation of the wall face a tile belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallAxis {
    /// Face runs top to bottom: bounces invert the horizontal velocity.
    Vertical,
    /// Face runs left to right: bounces invert the vertical velocity.
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    Free,
    Lava,
    Wall(CollisionClass),
}

impl Tile {
    #[inline]
    pub fn is_wall(self) -> bool {
        matches!(self, Self::Wall(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub class: CollisionClass,
    pub axis: WallAxis,
}

#[derive(Clone, Debug)]
pub struct TileMap {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    axes: Vec<WallAxis>,
    start: DVec2,
    waypoints: Vec<DVec2>,
    fuel_tanks: Vec<DVec2>,
}

impl TileMap {
    /// Parses the text format described in the module docs.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut lines = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .peekable();

        let mut scale = 1usize;
        if let Some(header) = lines.peek().and_then(|line| line.strip_prefix("scale=")) {
            scale = header
                .trim()
                .parse::<usize>()
                .map_err(|err| CoreError::MapHeader(format!("bad scale {header:?}: {err}")))?;
            if scale == 0 {
                return Err(CoreError::MapHeader("scale must be >= 1".to_string()));
            }
            lines.next();
        }

        let rows: Vec<&str> = lines.collect();
        Self::from_rows(&rows, scale)
    }

    pub fn from_rows(rows: &[&str], scale: usize) -> Result<Self, CoreError> {
        let scale = scale.max(1);
        let first = rows.first().ok_or(CoreError::EmptyMap)?;
        let cols = first.chars().count();
        if cols == 0 {
            return Err(CoreError::EmptyMap);
        }

        let width = cols * scale;
        let height = rows.len() * scale;
        let mut tiles = vec![Tile::Free; width * height];
        let mut starts = Vec::new();
        let mut waypoints = Vec::new();
        let mut fuel_tanks = Vec::new();
        let half = (scale as f64 - 1.0) / 2.0;

        for (row, line) in rows.iter().enumerate() {
            let actual = line.chars().count();
            if actual != cols {
                return Err(CoreError::RaggedMap {
                    row,
                    expected: cols,
                    actual,
                });
            }

            for (col, ch) in line.chars().enumerate() {
                let centre = DVec2::new((col * scale) as f64 + half, (row * scale) as f64 + half);
                let tile = match ch {
                    '.' => Tile::Free,
                    '#' => Tile::Wall(CollisionClass::Normal),
                    'D' => Tile::Wall(CollisionClass::Damage),
                    'E' => Tile::Wall(CollisionClass::Elastic),
                    'L' => Tile::Lava,
                    'S' => {
                        starts.push(centre);
                        Tile::Free
                    }
                    'W' => {
                        waypoints.push(centre);
                        Tile::Free
                    }
                    'F' => {
                        fuel_tanks.push(centre);
                        Tile::Free
                    }
                    other => {
                        return Err(CoreError::UnknownTile {
                            found: other,
                            row,
                            col,
                        })
                    }
                };

                for dy in 0..scale {
                    let y = row * scale + dy;
                    for dx in 0..scale {
                        tiles[y * width + col * scale + dx] = tile;
                    }
                }
            }
        }

        if starts.len() != 1 {
            return Err(CoreError::StartCount {
                found: starts.len(),
            });
        }

        let mut map = Self {
            width,
            height,
            tiles,
            axes: Vec::new(),
            start: starts[0],
            waypoints,
            fuel_tanks,
        };
        map.axes = map.compute_axes();
        Ok(map)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn start(&self) -> DVec2 {
        self.start
    }

    pub fn waypoints(&self) -> &[DVec2] {
        &self.waypoints
    }

    pub fn fuel_tanks(&self) -> &[DVec2] {
        &self.fuel_tanks
    }

    /// `None` outside the grid.
    #[inline]
    pub fn tile(&self, x: i64, y: i64) -> Option<Tile> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.tiles[y as usize * self.width + x as usize])
    }

    #[inline]
    pub fn tile_at(&self, point: DVec2) -> Option<Tile> {
        self.tile(point.x.round() as i64, point.y.round() as i64)
    }

    /// Blocking contact at `point`, if any. Leaving the grid sideways hits a
    /// vertical boundary, leaving it through the top or bottom a horizontal one.
    pub fn contact(&self, point: DVec2) -> Option<Contact> {
        let x = point.x.round() as i64;
        let y = point.y.round() as i64;
        if x < 0 || x >= self.width as i64 {
            return Some(Contact {
                class: CollisionClass::Normal,
                axis: WallAxis::Vertical,
            });
        }
        if y < 0 || y >= self.height as i64 {
            return Some(Contact {
                class: CollisionClass::Normal,
                axis: WallAxis::Horizontal,
            });
        }

        let index = y as usize * self.width + x as usize;
        match self.tiles[index] {
            Tile::Wall(class) => Some(Contact {
                class,
                axis: self.axes[index],
            }),
            Tile::Free | Tile::Lava => None,
        }
    }

    #[inline]
    pub fn is_lava(&self, point: DVec2) -> bool {
        matches!(self.tile_at(point), Some(Tile::Lava))
    }

    /// True when the point is inside the grid and not on a wall.
    #[inline]
    pub fn is_open(&self, point: DVec2) -> bool {
        matches!(self.tile_at(point), Some(Tile::Free | Tile::Lava))
    }

    pub fn clamp(&self, point: DVec2) -> DVec2 {
        DVec2::new(
            point.x.clamp(0.0, (self.width - 1) as f64),
            point.y.clamp(0.0, (self.height - 1) as f64),
        )
    }

    pub fn axis(&self, x: usize, y: usize) -> Option<WallAxis> {
        (x < self.width && y < self.height).then(|| self.axes[y * self.width + x])
    }

    /// The face orientation of a wall tile follows the nearest open tile:
    /// open space closer along the row means a vertical face.
    fn compute_axes(&self) -> Vec<WallAxis> {
        let mut axes = vec![WallAxis::Horizontal; self.tiles.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.tiles[y * self.width + x].is_wall() {
                    continue;
                }
                let horizontal = self
                    .open_distance(x, y, -1, 0)
                    .min(self.open_distance(x, y, 1, 0));
                let vertical = self
                    .open_distance(x, y, 0, -1)
                    .min(self.open_distance(x, y, 0, 1));
                if horizontal < vertical {
                    axes[y * self.width + x] = WallAxis::Vertical;
                }
            }
        }
        axes
    }

    fn open_distance(&self, x: usize, y: usize, dx: i64, dy: i64) -> usize {
        for step in 1..=AXIS_SCAN_LIMIT {
            let nx = x as i64 + dx * step as i64;
            let ny = y as i64 + dy * step as i64;
            match self.tile(nx, ny) {
                None => return usize::MAX,
                Some(tile) if !tile.is_wall() => return step,
                Some(_) => {}
            }
        }
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
scale=2
#####
#S.W#
#.L.#
#F.E#
#####
";

    #[test]
    fn parse_expands_cells_and_markers() {
        let map = TileMap::parse(SMALL).expect("map parses");
        assert_eq!(map.width(), 10);
        assert_eq!(map.height(), 10);
        assert_eq!(map.start(), DVec2::new(2.5, 2.5));
        assert_eq!(map.waypoints(), &[DVec2::new(6.5, 2.5)]);
        assert_eq!(map.fuel_tanks(), &[DVec2::new(2.5, 6.5)]);
        assert_eq!(map.tile(4, 4), Some(Tile::Lava));
        assert_eq!(map.tile(7, 7), Some(Tile::Wall(CollisionClass::Elastic)));
        assert_eq!(map.tile(10, 0), None);
    }

    #[test]
    fn wall_faces_follow_open_space() {
        let map = TileMap::parse(SMALL).expect("map parses");
        // Left border column next to open space: vertical face.
        assert_eq!(map.axis(1, 4), Some(WallAxis::Vertical));
        // Top border row next to open space: horizontal face.
        assert_eq!(map.axis(4, 1), Some(WallAxis::Horizontal));
    }

    #[test]
    fn leaving_the_grid_is_a_boundary_contact() {
        let map = TileMap::parse(SMALL).expect("map parses");
        let side = map.contact(DVec2::new(10.4, 5.0)).expect("contact");
        assert_eq!(side.axis, WallAxis::Vertical);
        assert_eq!(side.class, CollisionClass::Normal);
        let top = map.contact(DVec2::new(5.0, -0.6)).expect("contact");
        assert_eq!(top.axis, WallAxis::Horizontal);
        assert!(map.contact(DVec2::new(4.0, 4.0)).is_none());
    }

    #[test]
    fn parse_rejects_bad_maps() {
        let err = |text: &str| TileMap::parse(text).err();
        assert_eq!(err(""), Some(CoreError::EmptyMap));
        assert_eq!(
            err("S..\n.."),
            Some(CoreError::RaggedMap {
                row: 1,
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            err("S.?"),
            Some(CoreError::UnknownTile {
                found: '?',
                row: 0,
                col: 2
            })
        );
        assert_eq!(err("..."), Some(CoreError::StartCount { found: 0 }));
        assert!(matches!(err("scale=0\nS"), Some(CoreError::MapHeader(_))));
    }
}

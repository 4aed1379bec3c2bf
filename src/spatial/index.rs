//! Grid coordinates and the sparse per-layer cell map.

use crate::error::EditorError;
use macroquad::prelude::{vec2, Vec2};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Cell size in world units for foreground layers (matches 64x64 tiles).
pub const FOREGROUND_CELL: u32 = 64;
/// Cell size for background layers (matches 256x256 backdrop tiles).
pub const BACKGROUND_CELL: u32 = 256;
/// Entities share the foreground grid.
pub const ENTITY_CELL: u32 = 64;

/// Integer cell position on the unbounded grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    /// Column; grows to the right.
    pub x: i32,
    /// Row; grows downward.
    pub y: i32,
}

impl GridCoord {
    /// Cell at column `x`, row `y`.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        GridCoord { x, y }
    }

    /// Top-left corner of this cell in world units.
    #[inline]
    pub fn world_origin(self, cell_size: u32) -> Vec2 {
        let s = cell_size as f32;
        vec2(self.x as f32 * s, self.y as f32 * s)
    }

    /// The four edge-adjacent neighbours.
    pub fn neighbours(self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x.wrapping_add(1), self.y),
            GridCoord::new(self.x.wrapping_sub(1), self.y),
            GridCoord::new(self.x, self.y.wrapping_add(1)),
            GridCoord::new(self.x, self.y.wrapping_sub(1)),
        ]
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for GridCoord {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EditorError::InvalidCoord(s.to_owned());
        let (x, y) = s.split_once(',').ok_or_else(bad)?;
        let x = x.trim().parse::<i32>().map_err(|_| bad())?;
        let y = y.trim().parse::<i32>().map_err(|_| bad())?;
        Ok(GridCoord { x, y })
    }
}

/// World position to the cell containing it. Floors, so negative positions
/// land in negative cells.
#[inline]
pub fn world_to_cell(p: Vec2, cell_size: u32) -> GridCoord {
    let s = cell_size as f32;
    GridCoord {
        x: (p.x / s).floor() as i32,
        y: (p.y / s).floor() as i32,
    }
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    /// Top-left cell.
    pub min: GridCoord,
    /// Bottom-right cell.
    pub max: GridCoord,
}

impl CellBounds {
    /// True when `c` lies inside, edges included.
    pub fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    /// Pads every side by `by` cells, saturating at the grid edge.
    pub fn grow(self, by: i32) -> Self {
        CellBounds {
            min: GridCoord::new(self.min.x.saturating_sub(by), self.min.y.saturating_sub(by)),
            max: GridCoord::new(self.max.x.saturating_add(by), self.max.y.saturating_add(by)),
        }
    }
}

/// Sparse cell -> tile name map of a single layer. A missing key is an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileGrid {
    cells: HashMap<GridCoord, String>,
}

impl TileGrid {
    /// Empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tile name at `c`, if occupied.
    pub fn get(&self, c: GridCoord) -> Option<&str> {
        self.cells.get(&c).map(String::as_str)
    }

    /// Sets a cell, returning the previous tile if there was one.
    pub fn set(&mut self, c: GridCoord, tile: impl Into<String>) -> Option<String> {
        self.cells.insert(c, tile.into())
    }

    /// Clears a cell, returning what it held.
    pub fn remove(&mut self, c: GridCoord) -> Option<String> {
        self.cells.remove(&c)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupied cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &str)> + '_ {
        self.cells.iter().map(|(c, t)| (*c, t.as_str()))
    }

    /// Smallest rectangle holding every occupied cell.
    pub fn bounds(&self) -> Option<CellBounds> {
        let mut it = self.cells.keys();
        let first = *it.next()?;
        let mut b = CellBounds {
            min: first,
            max: first,
        };
        for c in it {
            b.min.x = b.min.x.min(c.x);
            b.min.y = b.min.y.min(c.y);
            b.max.x = b.max.x.max(c.x);
            b.max.y = b.max.y.max(c.y);
        }
        Some(b)
    }
}

impl FromIterator<(GridCoord, String)> for TileGrid {
    fn from_iter<I: IntoIterator<Item = (GridCoord, String)>>(iter: I) -> Self {
        TileGrid {
            cells: iter.into_iter().collect(),
        }
    }
}

// Persisted as an object keyed by "x,y"; sorted so saved files diff cleanly.
impl Serialize for TileGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted: BTreeMap<(i32, i32), &String> =
            self.cells.iter().map(|(c, t)| ((c.y, c.x), t)).collect();
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for ((y, x), tile) in sorted {
            map.serialize_entry(&GridCoord::new(x, y).to_string(), tile)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TileGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, tile)| {
                key.parse::<GridCoord>()
                    .map(|c| (c, tile))
                    .map_err(de::Error::custom)
            })
            .collect()
    }
}

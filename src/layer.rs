//! Layers, their tileset categories and the ordered layer set.

use crate::spatial::{TileGrid, BACKGROUND_CELL, ENTITY_CELL, FOREGROUND_CELL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable layer identifier. Persisted as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    /// Wraps any string as an id.
    pub fn new(id: impl Into<String>) -> Self {
        LayerId(id.into())
    }

    /// The id's text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId(s.to_owned())
    }
}

/// Tileset category a layer draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TilesetKind {
    /// 64 px terrain and item tiles; the default.
    #[default]
    Foreground,
    /// 256 px backdrops.
    Background,
    /// Markers and enemies on the 64 px grid.
    Entities,
}

impl TilesetKind {
    /// Every category, in palette order.
    pub const ALL: [TilesetKind; 3] = [
        TilesetKind::Foreground,
        TilesetKind::Background,
        TilesetKind::Entities,
    ];

    /// Grid cell size in world units for layers of this kind.
    pub fn cell_size(self) -> u32 {
        match self {
            TilesetKind::Foreground => FOREGROUND_CELL,
            TilesetKind::Background => BACKGROUND_CELL,
            TilesetKind::Entities => ENTITY_CELL,
        }
    }

    /// Palette heading for the category.
    pub fn label(self) -> &'static str {
        match self {
            TilesetKind::Foreground => "Terrain",
            TilesetKind::Background => "Backgrounds",
            TilesetKind::Entities => "Entities",
        }
    }
}

/// One plane of tile placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique, stable for the layer's lifetime.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Hidden layers are neither drawn nor exported.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Locked layers reject every tile edit.
    #[serde(default)]
    pub locked: bool,
    /// Draw opacity in [0, 1].
    #[serde(default = "one")]
    pub opacity: f32,
    /// Occupied cells, keyed `"x,y"` on disk.
    #[serde(default)]
    pub tiles: TileGrid,
    /// Category that sets the cell size and palette.
    #[serde(default)]
    pub tileset_type: TilesetKind,
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

impl Layer {
    /// Visible, unlocked, fully opaque and empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: TilesetKind) -> Self {
        Layer {
            id: LayerId::new(id),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            tiles: TileGrid::new(),
            tileset_type: kind,
        }
    }

    /// Cell size of this layer's category.
    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.tileset_type.cell_size()
    }
}

/// Ordered layers; index order is draw order (later on top).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    /// Layer set in the given draw order.
    pub fn new(layers: Vec<Layer>) -> Self {
        LayerSet { layers }
    }

    /// Background, Foreground and Entities layers of a fresh map.
    pub fn default_map() -> Self {
        LayerSet::new(vec![
            Layer::new("1", "Background", TilesetKind::Background),
            Layer::new("2", "Foreground", TilesetKind::Foreground),
            Layer::new("3", "Entities", TilesetKind::Entities),
        ])
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when there are no layers; never the case for a live map.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// Mutable layers bottom to top.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Layer> {
        self.layers.iter_mut()
    }

    /// Bottom layer.
    pub fn first(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// Layer with the given id.
    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Mutable layer with the given id.
    pub fn get_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    /// True when a layer with this id exists.
    pub fn contains(&self, id: &LayerId) -> bool {
        self.get(id).is_some()
    }

    /// Next id after the largest numeric id; non-numeric ids are ignored.
    pub fn next_id(&self) -> LayerId {
        let max = self
            .layers
            .iter()
            .filter_map(|l| l.id.0.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        LayerId((max + 1).to_string())
    }

    /// Adds a layer on top.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Removes a layer by id, returning it.
    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        let idx = self.layers.iter().position(|l| &l.id == id)?;
        Some(self.layers.remove(idx))
    }
}

impl<'a> IntoIterator for &'a LayerSet {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

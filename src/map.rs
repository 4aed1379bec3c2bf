//! The editable map model: layer set, active layer and undo history.

use crate::error::{EditorError, Result};
use crate::history::History;
use crate::layer::{Layer, LayerId, LayerSet, TilesetKind};
use crate::spatial::{CellBounds, GridCoord, TileGrid};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Layer set of a fresh map is active on its foreground layer.
const DEFAULT_ACTIVE: &str = "2";

/// Map model owned by the editor core.
///
/// Every paint or erase on an unlocked layer, every fill that changes cells
/// and every load produces a new [`LayerSet`] value recorded in the history;
/// earlier snapshots are never touched.
#[derive(Debug, Clone)]
pub struct TileMap {
    layers: Arc<LayerSet>,
    active: LayerId,
    history: History<LayerSet>,
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TileMap {
    /// Default three-layer map with the foreground layer active.
    pub fn new() -> Self {
        let layers = Arc::new(LayerSet::default_map());
        TileMap {
            history: History::new(Arc::clone(&layers)),
            layers,
            active: LayerId::from(DEFAULT_ACTIVE),
        }
    }

    /// Starts a map from an existing layer set, with the first layer active.
    pub fn from_layers(layers: LayerSet) -> Result<Self> {
        let active = layers.first().ok_or(EditorError::NoLayer)?.id.clone();
        let layers = Arc::new(layers);
        Ok(TileMap {
            history: History::new(Arc::clone(&layers)),
            layers,
            active,
        })
    }

    /// Current layers, bottom to top.
    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    /// Shared handle to the current layer set.
    pub fn snapshot(&self) -> Arc<LayerSet> {
        Arc::clone(&self.layers)
    }

    /// Id of the active layer.
    pub fn active_layer_id(&self) -> &LayerId {
        &self.active
    }

    /// The layer that receives edits, if it exists.
    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(&self.active)
    }

    /// Tileset category of the active layer; foreground when there is none.
    pub fn current_tileset_kind(&self) -> TilesetKind {
        self.active_layer()
            .map(|l| l.tileset_type)
            .unwrap_or_default()
    }

    /// Cell size used for placement and hit testing.
    pub fn active_cell_size(&self) -> u32 {
        self.current_tileset_kind().cell_size()
    }

    /// Tile on the active layer at `c`.
    pub fn tile_at(&self, c: GridCoord) -> Option<&str> {
        self.active_layer().and_then(|l| l.tiles.get(c))
    }

    // ---- tile mutations -------------------------------------------------

    /// Sets a cell on the active layer and records a snapshot, even when the
    /// cell already held `tile`. Returns false only when the active layer is
    /// locked or missing.
    pub fn place_tile(&mut self, c: GridCoord, tile: &str) -> bool {
        self.mutate_active(|grid| {
            grid.set(c, tile);
            true
        })
    }

    /// Clears a cell on the active layer and records a snapshot, even when the
    /// cell was already empty. Returns false only when the active layer is
    /// locked or missing.
    pub fn erase_tile(&mut self, c: GridCoord) -> bool {
        self.mutate_active(|grid| {
            grid.remove(c);
            true
        })
    }

    /// Flood-fills the 4-connected region sharing `start`'s content with `tile`.
    ///
    /// Empty regions stay inside the occupied bounds grown by one cell; a start
    /// cell outside them fills alone. Returns the number of cells changed.
    pub fn fill(&mut self, start: GridCoord, tile: &str, limit: usize) -> usize {
        let mut changed = 0;
        self.mutate_active(|grid| {
            let target = grid.get(start).map(str::to_owned);
            if target.as_deref() == Some(tile) || limit == 0 {
                return false;
            }
            let bounds = match target {
                Some(_) => None,
                None => Some(
                    grid.bounds()
                        .map(|b| b.grow(1))
                        .filter(|b| b.contains(start))
                        .unwrap_or(CellBounds {
                            min: start,
                            max: start,
                        }),
                ),
            };
            let region = flood_region(grid, start, target.as_deref(), bounds, limit);
            for c in &region {
                grid.set(*c, tile);
            }
            changed = region.len();
            changed > 0
        });
        changed
    }

    fn mutate_active(&mut self, f: impl FnOnce(&mut TileGrid) -> bool) -> bool {
        match self.active_layer() {
            Some(layer) if !layer.locked => {}
            _ => return false,
        }
        let mut next = LayerSet::clone(&self.layers);
        let Some(layer) = next.get_mut(&self.active) else {
            return false;
        };
        if !f(&mut layer.tiles) {
            return false;
        }
        self.commit(next);
        true
    }

    fn commit(&mut self, next: LayerSet) {
        let next = Arc::new(next);
        self.history.record(Arc::clone(&next));
        self.layers = next;
    }

    // ---- layer management (not recorded in history) ---------------------

    /// Makes `id` the target of edits; its category picks the cell size.
    pub fn set_active_layer(&mut self, id: &LayerId) -> Result<()> {
        if !self.layers.contains(id) {
            return Err(EditorError::UnknownLayer(id.to_string()));
        }
        self.active = id.clone();
        Ok(())
    }

    /// Shows or hides a layer. Not recorded in history.
    pub fn toggle_layer_visibility(&mut self, id: &LayerId) -> Result<()> {
        self.edit_layer(id, |l| l.visible = !l.visible)
    }

    /// Locks or unlocks a layer. Not recorded in history.
    pub fn toggle_layer_lock(&mut self, id: &LayerId) -> Result<()> {
        self.edit_layer(id, |l| l.locked = !l.locked)
    }

    /// Sets opacity, clamped to [0, 1].
    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<()> {
        self.edit_layer(id, |l| l.opacity = opacity.clamp(0.0, 1.0))
    }

    fn edit_layer(&mut self, id: &LayerId, f: impl FnOnce(&mut Layer)) -> Result<()> {
        let layers = Arc::make_mut(&mut self.layers);
        let layer = layers
            .get_mut(id)
            .ok_or_else(|| EditorError::UnknownLayer(id.to_string()))?;
        f(layer);
        Ok(())
    }

    /// Appends a foreground layer named after its id and makes it active.
    pub fn add_layer(&mut self) -> LayerId {
        let layers = Arc::make_mut(&mut self.layers);
        let id = layers.next_id();
        layers.push(Layer::new(
            id.0.clone(),
            format!("Layer {id}"),
            TilesetKind::Foreground,
        ));
        self.active = id.clone();
        id
    }

    /// Removes a layer. The last remaining layer can never be removed.
    pub fn remove_layer(&mut self, id: &LayerId) -> Result<()> {
        if !self.layers.contains(id) {
            return Err(EditorError::UnknownLayer(id.to_string()));
        }
        if self.layers.len() <= 1 {
            return Err(EditorError::LastLayer);
        }
        let layers = Arc::make_mut(&mut self.layers);
        layers.remove(id);
        if &self.active == id {
            self.active = first_id(layers);
        }
        Ok(())
    }

    // ---- history --------------------------------------------------------

    /// Steps back one snapshot. Returns false at the start of history.
    ///
    /// Snapshots hold the whole layer set, so visibility, lock and opacity
    /// changes and added or removed layers made since that snapshot are
    /// reverted along with the tiles.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Steps forward one snapshot. Layer flags revert the same way as in
    /// [`TileMap::undo`].
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Arc<LayerSet>) {
        self.layers = snapshot;
        if !self.layers.contains(&self.active) {
            self.active = first_id(&self.layers);
        }
    }

    /// True when [`TileMap::undo`] would step back.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// True when [`TileMap::redo`] would step forward.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Cursor position in the history; 0 before any edit.
    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    /// Number of stored snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ---- whole-map operations ---------------------------------------------

    /// Resets to the default three-layer map with a fresh history.
    pub fn new_map(&mut self) {
        *self = TileMap::new();
    }

    /// Replaces every layer, e.g. after loading a document. Recorded in history.
    pub fn replace_layers(&mut self, layers: LayerSet) -> Result<()> {
        let active = layers.first().ok_or(EditorError::NoLayer)?.id.clone();
        self.commit(layers);
        self.active = active;
        Ok(())
    }
}

fn first_id(layers: &LayerSet) -> LayerId {
    layers
        .first()
        .map(|l| l.id.clone())
        .unwrap_or_else(|| LayerId::from(DEFAULT_ACTIVE))
}

fn flood_region(
    grid: &TileGrid,
    start: GridCoord,
    target: Option<&str>,
    bounds: Option<CellBounds>,
    limit: usize,
) -> Vec<GridCoord> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut region = Vec::new();

    while let Some(c) = queue.pop_front() {
        region.push(c);
        if region.len() >= limit {
            break;
        }
        for n in c.neighbours() {
            if bounds.is_some_and(|b| !b.contains(n)) || grid.get(n) != target {
                continue;
            }
            if seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    region
}

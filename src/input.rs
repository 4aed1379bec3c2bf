//! Pointer and keyboard interpretation.
//!
//! [`Controller`] is a small state machine fed with backend-neutral
//! [`PointerEvent`]s. It resolves cells through the [`Viewport`] and mutates the
//! [`TileMap`]; it never draws.

use crate::map::TileMap;
use crate::spatial::GridCoord;
use crate::view::Viewport;
use macroquad::prelude::{KeyCode, Vec2};

/// Editing tool selected in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    /// Left button places the selected tile.
    #[default]
    Paint,
    /// Left button clears cells.
    Erase,
    /// Left drag pans the view.
    Move,
    /// Flood-fills a region with the selected tile.
    Fill,
    /// Picks the tile under the cursor as the selection.
    Eyedropper,
}

impl Tool {
    /// Toolbar order.
    pub const ALL: [Tool; 5] = [
        Tool::Paint,
        Tool::Erase,
        Tool::Move,
        Tool::Fill,
        Tool::Eyedropper,
    ];

    /// Toolbar caption.
    pub fn label(self) -> &'static str {
        match self {
            Tool::Paint => "Paint",
            Tool::Erase => "Erase",
            Tool::Move => "Move",
            Tool::Fill => "Fill",
            Tool::Eyedropper => "Pick",
        }
    }

    /// Key that selects the tool.
    pub fn shortcut(self) -> KeyCode {
        match self {
            Tool::Paint => KeyCode::P,
            Tool::Erase => KeyCode::E,
            Tool::Move => KeyCode::M,
            Tool::Fill => KeyCode::F,
            Tool::Eyedropper => KeyCode::I,
        }
    }
}

/// Editor command bound to a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Switch to a tool.
    SelectTool(Tool),
    /// Show or hide grid lines.
    ToggleGrid,
    /// Step back one snapshot.
    Undo,
    /// Step forward one snapshot.
    Redo,
    /// Write the map to the store and a download file.
    Save,
    /// Load the map last written to the store.
    LoadStored,
    /// Replace the map with a fresh default one.
    NewMap,
    /// Toolbar only.
    Export,
}

/// Maps a key press with its modifier state to an editor action.
pub fn action_for_key(key: KeyCode, ctrl: bool, shift: bool) -> Option<Action> {
    if ctrl {
        return match key {
            KeyCode::Z if shift => Some(Action::Redo),
            KeyCode::Z => Some(Action::Undo),
            KeyCode::Y => Some(Action::Redo),
            KeyCode::S => Some(Action::Save),
            KeyCode::O => Some(Action::LoadStored),
            KeyCode::N => Some(Action::NewMap),
            _ => None,
        };
    }
    if key == KeyCode::G {
        return Some(Action::ToggleGrid);
    }
    Tool::ALL
        .into_iter()
        .find(|t| t.shortcut() == key)
        .map(Action::SelectTool)
}

/// Mouse button, independent of the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Pointer input in window screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// A button was pressed at `pos`.
    #[allow(missing_docs)]
    Down { button: PointerButton, pos: Vec2 },
    /// The pointer moved to `pos`.
    #[allow(missing_docs)]
    Move { pos: Vec2 },
    /// A button was released.
    #[allow(missing_docs)]
    Up { button: PointerButton },
    /// The pointer left the canvas; ends any drag.
    Leave,
    /// Wheel notch; positive `delta_y` zooms out.
    #[allow(missing_docs)]
    Wheel { delta_y: f32 },
}

/// What an event did, so the caller knows what to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed.
    Nothing,
    /// The hovered cell changed.
    Hover,
    /// Pan or zoom changed.
    View,
    /// The map changed.
    Edited,
    /// Eyedropper picked this tile name.
    Picked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stroke {
    Place(String),
    Erase,
}

#[derive(Debug, Clone, PartialEq)]
enum DragState {
    Idle,
    Panning { last: Vec2 },
    Drawing { stroke: Stroke, last_cell: GridCoord },
}

/// State an event is applied to.
pub struct Target<'a> {
    /// Map receiving edits.
    pub map: &'a mut TileMap,
    /// View receiving pan and zoom.
    pub viewport: &'a mut Viewport,
    /// Tool driving the left button.
    pub tool: Tool,
    /// Tile placed by paint and fill.
    pub selected: Option<&'a str>,
    /// Most cells one fill may change.
    pub fill_limit: usize,
}

impl Target<'_> {
    fn cell_at(&self, pos: Vec2) -> GridCoord {
        self.viewport.screen_to_grid(pos, self.map.active_cell_size())
    }
}

/// Turns pointer events into edits and view changes.
///
/// A press picks the stroke (paint or erase) for the whole drag; a drag only
/// edits when it enters a new cell.
#[derive(Debug, Clone)]
pub struct Controller {
    state: DragState,
    hovered: Option<GridCoord>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// Idle controller with nothing hovered.
    pub fn new() -> Self {
        Controller {
            state: DragState::Idle,
            hovered: None,
        }
    }

    /// Cell under the pointer while no button is held.
    pub fn hovered(&self) -> Option<GridCoord> {
        self.hovered
    }

    /// True during a middle-button or move-tool drag.
    pub fn is_panning(&self) -> bool {
        matches!(self.state, DragState::Panning { .. })
    }

    /// True while a paint or erase stroke is held.
    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DragState::Drawing { .. })
    }

    /// Applies one event to `target`.
    pub fn handle(&mut self, event: PointerEvent, target: Target<'_>) -> Outcome {
        match event {
            PointerEvent::Down { button, pos } => self.pointer_down(button, pos, target),
            PointerEvent::Move { pos } => self.pointer_move(pos, target),
            PointerEvent::Up { .. } => {
                self.state = DragState::Idle;
                Outcome::Nothing
            }
            PointerEvent::Leave => {
                self.state = DragState::Idle;
                self.hovered = None;
                Outcome::Hover
            }
            PointerEvent::Wheel { delta_y } => {
                target.viewport.zoom_step(delta_y);
                Outcome::View
            }
        }
    }

    fn pointer_down(&mut self, button: PointerButton, pos: Vec2, target: Target<'_>) -> Outcome {
        use PointerButton::*;

        let cell = target.cell_at(pos);
        match (button, target.tool, target.selected) {
            (Middle, _, _) | (Left, Tool::Move, _) => {
                self.state = DragState::Panning { last: pos };
                Outcome::Nothing
            }
            (Left, Tool::Paint, Some(tile)) => {
                let stroke = Stroke::Place(tile.to_owned());
                let outcome = apply(&stroke, cell, target.map);
                self.state = DragState::Drawing {
                    stroke,
                    last_cell: cell,
                };
                outcome
            }
            (Right, _, _) | (Left, Tool::Erase, _) => {
                let outcome = apply(&Stroke::Erase, cell, target.map);
                self.state = DragState::Drawing {
                    stroke: Stroke::Erase,
                    last_cell: cell,
                };
                outcome
            }
            (Left, Tool::Fill, Some(tile)) => {
                let changed = target.map.fill(cell, tile, target.fill_limit);
                log::debug!("filled {changed} cells from {cell}");
                if changed > 0 {
                    Outcome::Edited
                } else {
                    Outcome::Nothing
                }
            }
            (Left, Tool::Eyedropper, _) => match target.map.tile_at(cell) {
                Some(name) => Outcome::Picked(name.to_owned()),
                None => Outcome::Nothing,
            },
            _ => Outcome::Nothing,
        }
    }

    fn pointer_move(&mut self, pos: Vec2, target: Target<'_>) -> Outcome {
        match &mut self.state {
            DragState::Panning { last } => {
                target.viewport.pan_by(pos - *last);
                *last = pos;
                Outcome::View
            }
            DragState::Drawing { stroke, last_cell } => {
                let cell = target.cell_at(pos);
                if cell == *last_cell {
                    return Outcome::Nothing;
                }
                *last_cell = cell;
                apply(stroke, cell, target.map)
            }
            DragState::Idle => {
                let cell = target.cell_at(pos);
                if self.hovered == Some(cell) {
                    return Outcome::Nothing;
                }
                self.hovered = Some(cell);
                Outcome::Hover
            }
        }
    }
}

fn apply(stroke: &Stroke, cell: GridCoord, map: &mut TileMap) -> Outcome {
    let changed = match stroke {
        Stroke::Place(tile) => map.place_tile(cell, tile),
        Stroke::Erase => map.erase_tile(cell),
    };
    if changed {
        Outcome::Edited
    } else {
        Outcome::Nothing
    }
}

#![warn(missing_docs)]

//! Layered tile-map editor core for Macroquad.
//!
//! The model ([`TileMap`]) owns layers and a linear snapshot history. The
//! [`Viewport`] maps between screen and world, [`Controller`] turns pointer
//! events into edits, and [`render::build_frame`] produces draw commands that
//! either macroquad or the software [`render::RasterCanvas`] can execute.

pub mod command;
pub mod config;
pub mod editor;
mod error;
pub mod export;
pub mod history;
pub mod input;
pub mod layer;
/// Readers for atlas descriptors and map documents.
pub mod loader {
    pub mod atlas;
    pub mod json_loader;
}
pub mod map;
pub mod render;
pub mod spatial;
pub mod storage;
pub mod tileset;
pub mod view;

pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use input::{Action, Controller, PointerButton, PointerEvent, Tool};
pub use layer::{Layer, LayerId, LayerSet, TilesetKind};
pub use loader::json_loader::MapDocument;
pub use map::TileMap;
pub use spatial::{GridCoord, TileGrid};
pub use tileset::{TileDefinition, TileRegistry};
pub use view::Viewport;

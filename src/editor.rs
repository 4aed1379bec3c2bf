//! The application core: model, viewport, controller and palette composed
//! behind explicit methods. The binary only forwards input and draws frames.

use crate::command::Frame;
use crate::config::EditorConfig;
use crate::error::Result;
use crate::export;
use crate::input::{Action, Controller, Outcome, PointerEvent, Target, Tool};
use crate::layer::{LayerId, TilesetKind};
use crate::loader::json_loader::{decode_map_file, decode_map_str, encode_map, MapDocument};
use crate::map::TileMap;
use crate::render::{build_frame, FrameInput};
use crate::storage::{download_path, save_download, Store, SAVE_KEY};
use crate::tileset::{LoadTicket, PaletteState, TileDefinition, TileRegistry};
use crate::view::Viewport;
use chrono::{DateTime, Utc};
use macroquad::prelude::Vec2;
use std::path::{Path, PathBuf};

/// Editor session: one map, its view, the palette and the status line.
pub struct Editor {
    map: TileMap,
    viewport: Viewport,
    controller: Controller,
    registry: TileRegistry,
    tool: Tool,
    selected: Option<String>,
    grid_visible: bool,
    search: String,
    status: String,
    last_error: Option<String>,
    store: Store,
    config: EditorConfig,
}

impl Editor {
    /// Fresh default map using the directories and defaults from `config`.
    pub fn new(config: EditorConfig) -> Self {
        Editor {
            map: TileMap::new(),
            viewport: Viewport::default(),
            controller: Controller::new(),
            registry: TileRegistry::new(),
            tool: Tool::Paint,
            selected: None,
            grid_visible: config.grid_visible,
            search: String::new(),
            status: String::from("ready"),
            last_error: None,
            store: Store::new(config.store_dir.clone()),
            config,
        }
    }

    /// Read-only model; edits go through the editor.
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Every tile loaded so far.
    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    /// Current pan and zoom.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Screen position of the canvas' top-left corner.
    pub fn set_canvas_origin(&mut self, origin: Vec2) {
        self.viewport.origin = origin;
    }

    /// Preferences the editor was started with.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Active tool.
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches tool; any drag in progress keeps its stroke.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Tile placed by paint and fill.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Makes `name` the tile used by paint and fill.
    pub fn select_tile(&mut self, name: &str) {
        self.selected = Some(name.to_owned());
    }

    /// True when grid lines are drawn.
    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    /// Shows or hides grid lines.
    pub fn toggle_grid(&mut self) {
        self.grid_visible = !self.grid_visible;
    }

    /// Palette search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Sets the palette search text.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Palette entries matching the search box.
    pub fn palette(&self) -> Vec<&TileDefinition> {
        self.registry.search(&self.search)
    }

    /// Last status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Last reported error, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn report<T>(&mut self, what: &str, res: Result<T>) -> Option<T> {
        match res {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            }
            Err(e) => {
                log::error!("{what} failed: {e}");
                self.last_error = Some(format!("{what} failed: {e}"));
                None
            }
        }
    }

    // ---- layers ---------------------------------------------------------

    /// See [`TileMap::set_active_layer`].
    pub fn set_active_layer(&mut self, id: &LayerId) -> Result<()> {
        self.map.set_active_layer(id)
    }

    /// See [`TileMap::toggle_layer_visibility`].
    pub fn toggle_layer_visibility(&mut self, id: &LayerId) -> Result<()> {
        self.map.toggle_layer_visibility(id)
    }

    /// See [`TileMap::toggle_layer_lock`].
    pub fn toggle_layer_lock(&mut self, id: &LayerId) -> Result<()> {
        self.map.toggle_layer_lock(id)
    }

    /// See [`TileMap::set_layer_opacity`].
    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<()> {
        self.map.set_layer_opacity(id, opacity)
    }

    /// See [`TileMap::add_layer`].
    pub fn add_layer(&mut self) -> LayerId {
        self.map.add_layer()
    }

    /// See [`TileMap::remove_layer`].
    pub fn remove_layer(&mut self, id: &LayerId) -> Result<()> {
        self.map.remove_layer(id)
    }

    // ---- atlas loading ----------------------------------------------------

    /// Starts a palette load when the active layer's category is not the one
    /// shown. A failed category stays failed until [`Editor::retry_atlas`].
    pub fn request_atlas(&mut self) -> Option<LoadTicket> {
        let kind = self.map.current_tileset_kind();
        if self.registry.palette_kind() == Some(kind) {
            return None;
        }
        self.status = format!("loading {}...", kind.label());
        Some(self.registry.begin_load(kind))
    }

    /// Starts a new load for the active layer's category, even a failed one.
    pub fn retry_atlas(&mut self) -> LoadTicket {
        let kind = self.map.current_tileset_kind();
        self.status = format!("loading {}...", kind.label());
        self.registry.begin_load(kind)
    }

    /// Hands a finished atlas load to the registry and updates the status line.
    pub fn finish_atlas(&mut self, ticket: LoadTicket, result: Result<Vec<TileDefinition>>) {
        let res = self.registry.finish_load(ticket, result);
        let what = format!("loading {}", ticket.kind.label());
        if let Some(n) = self.report(&what, res) {
            if self.registry.state() == PaletteState::Ready(ticket) {
                self.status = format!("{} {} tiles", n, ticket.kind.label());
            }
        }
    }

    /// Palette category state, for the panel header.
    pub fn palette_state(&self) -> PaletteState {
        self.registry.state()
    }

    /// Category the palette shows or is loading.
    pub fn palette_kind(&self) -> Option<TilesetKind> {
        self.registry.palette_kind()
    }

    // ---- input ------------------------------------------------------------

    /// Feeds one pointer event to the controller.
    pub fn pointer(&mut self, event: PointerEvent) -> Outcome {
        let target = Target {
            map: &mut self.map,
            viewport: &mut self.viewport,
            tool: self.tool,
            selected: self.selected.as_deref(),
            fill_limit: self.config.fill_limit,
        };
        let outcome = self.controller.handle(event, target);
        if let Outcome::Picked(name) = &outcome {
            self.status = format!("picked {name}");
            self.selected = Some(name.clone());
        }
        outcome
    }

    /// Runs a shortcut action. `now` stamps saves.
    pub fn apply(&mut self, action: Action, now: DateTime<Utc>) {
        match action {
            Action::SelectTool(tool) => self.set_tool(tool),
            Action::ToggleGrid => self.toggle_grid(),
            Action::Undo => {
                self.undo();
            }
            Action::Redo => {
                self.redo();
            }
            Action::Save => {
                let res = self.save(now);
                self.report("save", res);
            }
            Action::LoadStored => {
                let res = self.load_stored();
                self.report("load", res);
            }
            Action::NewMap => self.new_map(),
            Action::Export => {
                let res = download_path(&self.config.save_dir, now, "png")
                    .and_then(|path| self.export_png(&path));
                self.report("export", res);
            }
        }
    }

    /// See [`TileMap::undo`].
    pub fn undo(&mut self) -> bool {
        self.map.undo()
    }

    /// See [`TileMap::redo`].
    pub fn redo(&mut self) -> bool {
        self.map.redo()
    }

    // ---- documents ----------------------------------------------------------

    /// Resets to a fresh default map.
    pub fn new_map(&mut self) {
        self.map.new_map();
        self.status = String::from("new map");
    }

    /// Persists under [`SAVE_KEY`] and writes a `tilemap-<ms>.json` download.
    pub fn save(&mut self, now: DateTime<Utc>) -> Result<PathBuf> {
        let doc = MapDocument::new(self.map.layers().clone(), now);
        let json = encode_map(&doc)?;
        self.store.put(SAVE_KEY, &json)?;
        let path = save_download(&self.config.save_dir, &json, now)?;
        self.status = format!("saved {}", path.display());
        Ok(path)
    }

    fn load_document(&mut self, doc: MapDocument, from: &str) -> Result<()> {
        let layers = doc.layers.len();
        let saved = doc.timestamp_string().unwrap_or_else(|| "unknown time".to_string());
        self.map.replace_layers(doc.layers)?;
        log::info!("loaded {layers} layers from {from} (saved {saved})");
        self.status = format!("loaded {from}");
        Ok(())
    }

    /// Replaces the map with a JSON file. The current map is untouched on error.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let doc = decode_map_file(path)?;
        self.load_document(doc, &path.display().to_string())
    }

    /// Reloads the last save. Returns false when nothing was saved yet.
    pub fn load_stored(&mut self) -> Result<bool> {
        let Some(json) = self.store.get(SAVE_KEY)? else {
            self.status = String::from("nothing saved yet");
            return Ok(false);
        };
        let doc = decode_map_str(&json, &self.store.dir().join(SAVE_KEY))?;
        self.load_document(doc, SAVE_KEY)?;
        Ok(true)
    }

    /// Writes the flattened visible layers to `path` as PNG.
    pub fn export_png(&mut self, path: &Path) -> Result<()> {
        export::export_png_file(&self.map, &self.registry, path)?;
        self.status = format!("exported {}", path.display());
        Ok(())
    }

    /// Adds tiles outside the palette's load cycle, e.g. for headless export.
    pub fn register_tiles(&mut self, defs: Vec<TileDefinition>) -> usize {
        self.registry.merge(defs, 0)
    }

    // ---- drawing ------------------------------------------------------------

    /// Draw list for the canvas at its current size.
    pub fn frame(&self, canvas_size: Vec2) -> Frame {
        build_frame(&FrameInput {
            map: &self.map,
            registry: &self.registry,
            viewport: &self.viewport,
            canvas_size,
            grid_visible: self.grid_visible,
            tool: self.tool,
            selected: self.selected.as_deref(),
            hovered: self.controller.hovered(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::input::PointerButton;
    use crate::spatial::GridCoord;
    use crate::tileset::TileRect;
    use chrono::TimeZone;
    use image::{Rgba, RgbaImage};
    use macroquad::prelude::vec2;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn editor() -> (Editor, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig {
            save_dir: dir.path().join("saves"),
            store_dir: dir.path().join("store"),
            ..EditorConfig::default()
        };
        (Editor::new(config), dir)
    }

    fn tile(name: &str) -> TileDefinition {
        TileDefinition {
            name: name.to_owned(),
            rect: TileRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
            image: Arc::new(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn atlas_requests_follow_active_category() {
        let (mut ed, _dir) = editor();
        let t = ed.request_atlas().unwrap();
        assert_eq!(t.kind, TilesetKind::Foreground);
        assert!(ed.request_atlas().is_none());

        ed.set_active_layer(&LayerId::from("1")).unwrap();
        let bg = ed.request_atlas().unwrap();
        assert_eq!(bg.kind, TilesetKind::Background);

        ed.finish_atlas(t, Ok(vec![tile("coin_gold")]));
        ed.finish_atlas(bg, Ok(vec![tile("background_solid_sky")]));
        let names: Vec<_> = ed.palette().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["background_solid_sky"]);
        assert!(ed.registry().get("coin_gold").is_some());
    }

    #[test]
    fn failed_atlas_is_reported_and_retried_explicitly() {
        let (mut ed, _dir) = editor();
        let t = ed.request_atlas().unwrap();
        ed.finish_atlas(t, Err(EditorError::Xml("broken".into())));
        assert!(ed.last_error().is_some());
        assert_eq!(ed.palette_state(), PaletteState::Failed(t));
        assert!(ed.request_atlas().is_none());

        let again = ed.retry_atlas();
        ed.finish_atlas(again, Ok(vec![tile("heart")]));
        assert_eq!(ed.palette().len(), 1);
        assert!(ed.last_error().is_none());
    }

    #[test]
    fn eyedropper_selects_tile() {
        let (mut ed, _dir) = editor();
        ed.select_tile("heart");
        ed.pointer(PointerEvent::Down {
            button: PointerButton::Left,
            pos: vec2(5.0, 5.0),
        });
        ed.pointer(PointerEvent::Up {
            button: PointerButton::Left,
        });
        ed.select_tile("spikes");
        ed.apply(Action::SelectTool(Tool::Eyedropper), now());
        ed.pointer(PointerEvent::Down {
            button: PointerButton::Left,
            pos: vec2(5.0, 5.0),
        });
        assert_eq!(ed.selected(), Some("heart"));
        assert_eq!(ed.tool(), Tool::Eyedropper);
    }

    #[test]
    fn save_then_load_stored_round_trips() {
        let (mut ed, dir) = editor();
        ed.map.place_tile(GridCoord::new(3, 7), "coin_gold");
        ed.map.toggle_layer_lock(&LayerId::from("1")).unwrap();
        let saved = ed.map.layers().clone();

        let path = ed.save(now()).unwrap();
        assert!(path.starts_with(dir.path().join("saves")));

        ed.new_map();
        assert!(ed.map().layers().iter().all(|l| l.tiles.is_empty()));
        assert!(ed.load_stored().unwrap());
        assert_eq!(ed.map().layers(), &saved);
        assert_eq!(ed.map().active_layer_id(), &LayerId::from("1"));
        assert!(ed.map().can_undo());

        ed.load_file(&path).unwrap();
        assert_eq!(ed.map().layers(), &saved);
    }

    #[test]
    fn bad_file_leaves_map_untouched() {
        let (mut ed, dir) = editor();
        ed.map.place_tile(GridCoord::new(0, 0), "heart");
        let before = ed.map.layers().clone();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(ed.load_file(&path).is_err());
        assert_eq!(ed.map().layers(), &before);
        assert_eq!(ed.map().history_len(), 2);
    }

    #[test]
    fn load_stored_without_save() {
        let (mut ed, _dir) = editor();
        assert!(!ed.load_stored().unwrap());
        ed.apply(Action::LoadStored, now());
        assert!(ed.last_error().is_none());
    }

    #[test]
    fn shortcuts_drive_history_and_grid() {
        let (mut ed, _dir) = editor();
        let grid = ed.grid_visible();
        ed.apply(Action::ToggleGrid, now());
        assert_eq!(ed.grid_visible(), !grid);

        ed.map.place_tile(GridCoord::new(0, 0), "heart");
        ed.apply(Action::Undo, now());
        assert!(ed.map().tile_at(GridCoord::new(0, 0)).is_none());
        ed.apply(Action::Redo, now());
        assert_eq!(ed.map().tile_at(GridCoord::new(0, 0)), Some("heart"));
    }

    #[test]
    fn export_action_writes_png_or_reports_empty_map() {
        let (mut ed, dir) = editor();
        ed.apply(Action::Export, now());
        assert!(ed.last_error().unwrap().contains("export"));

        ed.map.place_tile(GridCoord::new(0, 0), "heart");
        ed.apply(Action::Export, now());
        assert!(ed.last_error().is_none());
        assert!(dir.path().join("saves/tilemap-1700000000000.png").is_file());
    }

    #[test]
    fn oversized_export_is_reported_and_the_map_kept() {
        let (mut ed, dir) = editor();
        ed.map.place_tile(GridCoord::new(i32::MIN, 0), "heart");
        ed.map.place_tile(GridCoord::new(10, 0), "heart");
        let before = ed.map().layers().clone();

        ed.apply(Action::Export, now());
        assert!(ed.last_error().unwrap().contains("too large"));
        assert_eq!(ed.map().layers(), &before);
        assert!(!dir.path().join("saves/tilemap-1700000000000.png").exists());
    }
}

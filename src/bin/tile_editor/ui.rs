//! Immediate-mode panels drawn around the canvas.

use chrono::Utc;
use macroquad::prelude::*;
use macroquad_tile_editor::render::MacroquadCanvas;
use macroquad_tile_editor::tileset::{LoadTicket, PaletteState};
use macroquad_tile_editor::{Action, Editor, Tool};

const PANEL_BG: Color = Color::new(0.07, 0.07, 0.09, 1.0);
const BUTTON_BG: Color = Color::new(0.16, 0.16, 0.2, 1.0);
const BUTTON_HOVER: Color = Color::new(0.24, 0.24, 0.3, 1.0);
const ACCENT: Color = Color::new(0.0, 0.55, 0.6, 1.0);
const ERROR_TEXT: Color = Color::new(1.0, 0.4, 0.4, 1.0);

const SIDE_W: f32 = 220.0;
const PALETTE_W: f32 = 260.0;
const STATUS_H: f32 = 24.0;
const ROW_H: f32 = 26.0;
const THUMB: f32 = 56.0;
const FONT: f32 = 18.0;

/// Screen areas of one frame.
pub struct Layout {
    pub side: Rect,
    pub canvas: Rect,
    pub palette: Rect,
    pub status: Rect,
}

impl Layout {
    pub fn compute(w: f32, h: f32) -> Self {
        let body_h = (h - STATUS_H).max(0.0);
        Layout {
            side: Rect::new(0.0, 0.0, SIDE_W, body_h),
            canvas: Rect::new(SIDE_W, 0.0, (w - SIDE_W - PALETTE_W).max(1.0), body_h),
            palette: Rect::new(w - PALETTE_W, 0.0, PALETTE_W, body_h),
            status: Rect::new(0.0, body_h, w, STATUS_H),
        }
    }
}

/// Widget state kept between frames.
#[derive(Default)]
pub struct UiState {
    pub search_focused: bool,
    pub palette_scroll: f32,
    pub pointer_inside: bool,
    pub last_pointer: Option<Vec2>,
}

fn mouse() -> Vec2 {
    mouse_position().into()
}

fn label(text: &str, x: f32, y: f32, color: Color) {
    draw_text(text, x, y + FONT * 0.75, FONT, color);
}

fn button(r: Rect, text: &str, active: bool) -> bool {
    let hover = r.contains(mouse());
    let bg = if active {
        ACCENT
    } else if hover {
        BUTTON_HOVER
    } else {
        BUTTON_BG
    };
    draw_rectangle(r.x, r.y, r.w, r.h, bg);
    draw_text(text, r.x + 6.0, r.y + r.h * 0.7, FONT, WHITE);
    hover && is_mouse_button_pressed(MouseButton::Left)
}

/// Tools, layers and document actions.
pub fn side_panel(editor: &mut Editor, area: Rect) {
    draw_rectangle(area.x, area.y, area.w, area.h, PANEL_BG);
    let x = area.x + 8.0;
    let w = area.w - 16.0;
    let mut y = area.y + 8.0;

    label("Tools", x, y, GRAY);
    y += ROW_H;
    for tool in Tool::ALL {
        let text = format!("{} ({:?})", tool.label(), tool.shortcut());
        if button(Rect::new(x, y, w, ROW_H - 2.0), &text, editor.tool() == tool) {
            editor.set_tool(tool);
        }
        y += ROW_H;
    }
    if button(Rect::new(x, y, w, ROW_H - 2.0), "Grid (G)", editor.grid_visible()) {
        editor.toggle_grid();
    }
    y += ROW_H + 8.0;

    label("Layers", x, y, GRAY);
    y += ROW_H;
    let rows: Vec<_> = editor
        .map()
        .layers()
        .iter()
        .map(|l| (l.id.clone(), l.name.clone(), l.visible, l.locked, l.opacity))
        .collect();
    for (id, name, visible, locked, opacity) in rows {
        let active = editor.map().active_layer_id() == &id;
        let res = if button(Rect::new(x, y, w - 104.0, ROW_H - 2.0), &name, active) {
            editor.set_active_layer(&id)
        } else if button(
            Rect::new(x + w - 100.0, y, 24.0, ROW_H - 2.0),
            if visible { "V" } else { "-" },
            false,
        ) {
            editor.toggle_layer_visibility(&id)
        } else if button(
            Rect::new(x + w - 74.0, y, 24.0, ROW_H - 2.0),
            if locked { "L" } else { "U" },
            locked,
        ) {
            editor.toggle_layer_lock(&id)
        } else if button(Rect::new(x + w - 48.0, y, 22.0, ROW_H - 2.0), "<", false) {
            editor.set_layer_opacity(&id, opacity - 0.1)
        } else if button(Rect::new(x + w - 24.0, y, 22.0, ROW_H - 2.0), ">", false) {
            editor.set_layer_opacity(&id, opacity + 0.1)
        } else {
            Ok(())
        };
        if let Err(e) = res {
            log::warn!("layer {id}: {e}");
        }
        y += ROW_H;
    }
    let half = (w - 4.0) / 2.0;
    if button(Rect::new(x, y, half, ROW_H - 2.0), "+ Layer", false) {
        editor.add_layer();
    }
    if button(Rect::new(x + half + 4.0, y, half, ROW_H - 2.0), "- Layer", false) {
        let id = editor.map().active_layer_id().clone();
        if let Err(e) = editor.remove_layer(&id) {
            log::warn!("cannot remove layer {id}: {e}");
        }
    }
    y += ROW_H + 8.0;

    let actions = [
        ("Undo", Action::Undo, editor.map().can_undo()),
        ("Redo", Action::Redo, editor.map().can_redo()),
        ("Save", Action::Save, false),
        ("Load", Action::LoadStored, false),
        ("New", Action::NewMap, false),
        ("Export PNG", Action::Export, false),
    ];
    for (i, (text, action, lit)) in actions.into_iter().enumerate() {
        let col = (i % 2) as f32;
        let r = Rect::new(x + col * (half + 4.0), y, half, ROW_H - 2.0);
        if button(r, text, lit) {
            editor.apply(action, Utc::now());
        }
        if i % 2 == 1 {
            y += ROW_H;
        }
    }
}

/// Palette of the active category. Returns a retry ticket when asked to reload.
pub fn palette_panel(
    editor: &mut Editor,
    textures: &mut MacroquadCanvas,
    ui: &mut UiState,
    area: Rect,
) -> Option<LoadTicket> {
    draw_rectangle(area.x, area.y, area.w, area.h, PANEL_BG);
    let x = area.x + 8.0;
    let w = area.w - 16.0;
    let mut y = area.y + 8.0;

    let kind = editor.map().current_tileset_kind();
    let header = match editor.palette_state() {
        PaletteState::Idle => kind.label().to_string(),
        PaletteState::Loading(t) => format!("{} (loading)", t.kind.label()),
        PaletteState::Ready(t) => t.kind.label().to_string(),
        PaletteState::Failed(t) => format!("{} (failed)", t.kind.label()),
    };
    label(&header, x, y, WHITE);
    y += ROW_H;

    let search = Rect::new(x, y, w, ROW_H - 2.0);
    let shown = if editor.search().is_empty() && !ui.search_focused {
        "search...".to_string()
    } else if ui.search_focused {
        format!("{}|", editor.search())
    } else {
        editor.search().to_string()
    };
    if button(search, &shown, ui.search_focused) {
        ui.search_focused = true;
    }
    y += ROW_H + 4.0;

    let mut retry = None;
    if matches!(editor.palette_state(), PaletteState::Failed(_)) {
        if button(Rect::new(x, y, w, ROW_H - 2.0), "Retry", false) {
            retry = Some(editor.retry_atlas());
        }
        y += ROW_H;
    }

    let grid = Rect::new(x, y, w, area.bottom() - y - ROW_H);
    if grid.contains(mouse()) {
        ui.palette_scroll = (ui.palette_scroll - mouse_wheel().1 * 20.0).max(0.0);
    }
    let cols = ((w / THUMB).floor() as usize).max(1);
    let mut picked = None;
    let mut hovered = None;
    {
        let registry = editor.registry();
        let selected = editor.selected();
        for (i, def) in editor.palette().into_iter().enumerate() {
            let cx = grid.x + (i % cols) as f32 * THUMB;
            let cy = grid.y + (i / cols) as f32 * THUMB - ui.palette_scroll;
            if cy + THUMB < grid.y || cy > grid.bottom() {
                continue;
            }
            let cell = Rect::new(cx + 2.0, cy + 2.0, THUMB - 4.0, THUMB - 4.0);
            let is_selected = selected == Some(def.name.as_str());
            draw_rectangle(cell.x, cell.y, cell.w, cell.h, if is_selected { ACCENT } else { BUTTON_BG });
            if let Some(tex) = textures.texture(registry, &def.name) {
                draw_texture_ex(
                    &tex,
                    cell.x + 2.0,
                    cell.y + 2.0,
                    WHITE,
                    DrawTextureParams {
                        dest_size: Some(vec2(cell.w - 4.0, cell.h - 4.0)),
                        ..Default::default()
                    },
                );
            }
            if cell.contains(mouse()) && grid.contains(mouse()) {
                hovered = Some(def.name.clone());
                if is_mouse_button_pressed(MouseButton::Left) {
                    picked = Some(def.name.clone());
                }
            }
        }
    }
    // panel padding below the grid hides overflowing thumbnails
    draw_rectangle(area.x, grid.bottom(), area.w, area.bottom() - grid.bottom(), PANEL_BG);
    if let Some(name) = hovered.as_deref().or(editor.selected()) {
        label(name, x, grid.bottom() + 4.0, GRAY);
    }
    if let Some(name) = picked {
        editor.select_tile(&name);
        ui.search_focused = false;
    }
    retry
}

pub fn status_bar(editor: &Editor, area: Rect) {
    draw_rectangle(area.x, area.y, area.w, area.h, BUTTON_BG);
    match editor.last_error() {
        Some(err) => label(err, area.x + 8.0, area.y + 2.0, ERROR_TEXT),
        None => label(editor.status(), area.x + 8.0, area.y + 2.0, WHITE),
    }
    let map = editor.map();
    let info = format!(
        "{} | zoom {:.0}% | history {}/{}",
        editor.tool().label(),
        editor.viewport().zoom() * 100.0,
        map.history_index(),
        map.history_len() - 1,
    );
    let dims = measure_text(&info, None, FONT as u16, 1.0);
    label(&info, area.right() - dims.width - 8.0, area.y + 2.0, GRAY);
}

/// Routes typed characters into the search box while it has focus.
pub fn search_input(editor: &mut Editor, ui: &mut UiState) {
    let mut text = editor.search().to_string();
    while let Some(c) = get_char_pressed() {
        if !c.is_control() {
            text.push(c);
        }
    }
    if is_key_pressed(KeyCode::Backspace) {
        text.pop();
    }
    if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Enter) {
        ui.search_focused = false;
    }
    editor.set_search(text);
}

mod ui;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use macroquad::experimental::coroutines::start_coroutine;
use macroquad::prelude::*;
use macroquad_tile_editor::input::action_for_key;
use macroquad_tile_editor::loader::atlas::{load_category, read_category};
use macroquad_tile_editor::render::{MacroquadCanvas, RenderTarget};
use macroquad_tile_editor::tileset::{LoadTicket, TileDefinition};
use macroquad_tile_editor::{Editor, EditorConfig, PointerButton, PointerEvent, TilesetKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use ui::{Layout, UiState};

/// Layered tile-map editor.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Map file (.json) to open on start
    map: Option<PathBuf>,

    /// Directory holding the atlas images
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Preferences file to use instead of the one in the config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render the map to a PNG and exit without opening a window
    #[arg(long, value_name = "PNG", requires = "map")]
    export: Option<PathBuf>,
}

type Inbox = Arc<Mutex<Vec<(LoadTicket, macroquad_tile_editor::Result<Vec<TileDefinition>>)>>>;

fn start_logger(config: &EditorConfig) -> Option<LoggerHandle> {
    let logger = match Logger::try_with_env_or_str(&config.log_spec) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("invalid log spec {:?}: {e}", config.log_spec);
            return None;
        }
    };
    let started = match EditorConfig::data_dir() {
        Some(dir) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(dir.join("logs"))
                    .basename("tile_editor")
                    .suffix("log")
                    .suppress_timestamp(),
            )
            .rotate(Criterion::Size(256 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
            .duplicate_to_stderr(Duplicate::Warn)
            .start(),
        None => logger.log_to_stderr().start(),
    };
    match started {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("failed to start logger: {e}");
            None
        }
    }
}

fn export_headless(config: EditorConfig, map: &Path, out: &Path) -> Result<()> {
    let assets = config.assets_dir.clone();
    let mut editor = Editor::new(config);
    editor
        .load_file(map)
        .with_context(|| format!("opening {}", map.display()))?;
    for kind in TilesetKind::ALL {
        match read_category(kind, &assets) {
            Ok(defs) => {
                editor.register_tiles(defs);
            }
            Err(e) => log::warn!("{} tiles unavailable, using fallback colours: {e}", kind.label()),
        }
    }
    editor
        .export_png(out)
        .with_context(|| format!("exporting {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn spawn_load(ticket: LoadTicket, assets: PathBuf, inbox: &Inbox) {
    let inbox = Arc::clone(inbox);
    start_coroutine(async move {
        let result = load_category(ticket.kind, assets).await;
        match inbox.lock() {
            Ok(mut queue) => queue.push((ticket, result)),
            Err(_) => log::error!("atlas inbox poisoned, dropping {:?} load", ticket.kind),
        }
    });
}

fn forward_pointer(editor: &mut Editor, layout: &Layout, ui: &mut UiState) {
    let pos: Vec2 = mouse_position().into();
    let inside = layout.canvas.contains(pos);
    for (mb, button) in [
        (MouseButton::Left, PointerButton::Left),
        (MouseButton::Middle, PointerButton::Middle),
        (MouseButton::Right, PointerButton::Right),
    ] {
        if inside && is_mouse_button_pressed(mb) {
            ui.search_focused = false;
            editor.pointer(PointerEvent::Down { button, pos });
        }
        if is_mouse_button_released(mb) {
            editor.pointer(PointerEvent::Up { button });
        }
    }
    if inside {
        if ui.last_pointer != Some(pos) {
            editor.pointer(PointerEvent::Move { pos });
        }
        let (_, wheel) = mouse_wheel();
        if wheel != 0.0 {
            editor.pointer(PointerEvent::Wheel { delta_y: -wheel });
        }
    } else if ui.pointer_inside {
        editor.pointer(PointerEvent::Leave);
    }
    ui.pointer_inside = inside;
    ui.last_pointer = Some(pos);
}

fn handle_keys(editor: &mut Editor, ui: &mut UiState) {
    if ui.search_focused {
        ui::search_input(editor, ui);
        return;
    }
    let ctrl = is_key_down(KeyCode::LeftControl)
        || is_key_down(KeyCode::RightControl)
        || is_key_down(KeyCode::LeftSuper);
    let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
    if let Some(action) = get_last_key_pressed().and_then(|k| action_for_key(k, ctrl, shift)) {
        editor.apply(action, Utc::now());
    }
}

async fn run(mut editor: Editor) {
    let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
    let mut ui = UiState::default();
    let mut canvas = MacroquadCanvas::new(Rect::default());

    loop {
        let layout = Layout::compute(screen_width(), screen_height());
        editor.set_canvas_origin(vec2(layout.canvas.x, layout.canvas.y));

        if let Some(ticket) = editor.request_atlas() {
            spawn_load(ticket, editor.config().assets_dir.clone(), &inbox);
        }
        let finished = match inbox.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        };
        for (ticket, result) in finished {
            editor.finish_atlas(ticket, result);
        }

        handle_keys(&mut editor, &mut ui);
        forward_pointer(&mut editor, &layout, &mut ui);

        clear_background(BLACK);
        canvas.set_area(layout.canvas);
        let frame = editor.frame(vec2(layout.canvas.w, layout.canvas.h));
        canvas.execute(&frame, editor.registry());

        ui::side_panel(&mut editor, layout.side);
        if let Some(ticket) = ui::palette_panel(&mut editor, &mut canvas, &mut ui, layout.palette) {
            spawn_load(ticket, editor.config().assets_dir.clone(), &inbox);
        }
        ui::status_bar(&editor, layout.status);

        next_frame().await;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, load_error) = EditorConfig::load(args.config.as_deref());
    let _logger = start_logger(&config);
    log::info!("tile_editor {} starting", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => log::warn!("could not load preferences: {e}. Using defaults."),
        None if args.config.is_none() => match config.save_if_missing() {
            Ok(Some(path)) => log::info!("wrote default preferences to {}", path.display()),
            Ok(None) => {}
            Err(e) => log::warn!("could not write preferences: {e}"),
        },
        None => {}
    }
    if let Some(assets) = args.assets {
        config.assets_dir = assets;
    }

    if let (Some(out), Some(map)) = (&args.export, &args.map) {
        return export_headless(config, map, out);
    }

    let conf = Conf {
        window_title: "Tile Editor".to_owned(),
        window_width: config.window_width,
        window_height: config.window_height,
        high_dpi: true,
        ..Default::default()
    };
    let mut editor = Editor::new(config);
    if let Some(map) = &args.map {
        editor
            .load_file(map)
            .with_context(|| format!("opening {}", map.display()))?;
    }
    macroquad::Window::from_config(conf, run(editor));
    Ok(())
}

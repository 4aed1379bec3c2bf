//! Editor preferences, stored as JSON in the platform config directory.

use crate::error::{EditorError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PREFERENCES_FILE: &str = "preferences.json";

/// Default for [`EditorConfig::fill_limit`].
pub const DEFAULT_FILL_LIMIT: usize = 4096;

/// User preferences. Fields missing from the file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory holding the atlas images.
    pub assets_dir: PathBuf,
    /// Where `tilemap-<ms>.json` downloads are written.
    pub save_dir: PathBuf,
    /// Backing directory of the key-value store.
    pub store_dir: PathBuf,
    /// flexi_logger spec used when `RUST_LOG` is unset.
    pub log_spec: String,
    /// Whether the grid starts visible.
    pub grid_visible: bool,
    /// Upper bound on cells touched by one fill.
    pub fill_limit: usize,
    /// Initial window width in pixels.
    pub window_width: i32,
    /// Initial window height in pixels.
    pub window_height: i32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let data = Self::data_dir().unwrap_or_else(|| PathBuf::from("."));
        EditorConfig {
            assets_dir: PathBuf::from("assets"),
            save_dir: data.join("saves"),
            store_dir: data.join("store"),
            log_spec: "info".to_string(),
            grid_visible: true,
            fill_limit: DEFAULT_FILL_LIMIT,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl EditorConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "macroquad_tile_editor", "tile_editor")
    }

    /// Platform config directory, if the platform has one.
    pub fn config_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Platform data directory; holds saves, the store and logs.
    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// `preferences.json` inside [`EditorConfig::config_dir`].
    pub fn preferences_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(PREFERENCES_FILE))
    }

    /// Loads preferences, falling back to defaults on any problem.
    ///
    /// Runs before logging is configured, so the reason for a fallback is
    /// handed back for the caller to report once a logger is up.
    pub fn load(path: Option<&Path>) -> (Self, Option<EditorError>) {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::preferences_path) else {
            return (Self::default(), Some(EditorError::NoConfigDir));
        };
        match Self::load_from(&path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Missing file means defaults; unreadable or malformed files are errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| EditorError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes these preferences to the platform config directory on first
    /// run. Returns the path written, or `None` when a file is already there.
    pub fn save_if_missing(&self) -> Result<Option<PathBuf>> {
        let path = Self::preferences_path().ok_or(EditorError::NoConfigDir)?;
        if path.exists() {
            return Ok(None);
        }
        self.save_to(&path)?;
        Ok(Some(path))
    }

    /// Writes these preferences as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| EditorError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| EditorError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("saved preferences to {}", path.display());
        Ok(())
    }
}

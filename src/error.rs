//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the editor core.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Error type for the editor core
#[derive(Debug, Error)]
pub enum EditorError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// JSON parse/serialize error
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Document involved; `<memory>` for in-memory text.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Atlas descriptor could not be parsed
    #[error("atlas descriptor error: {0}")]
    Xml(String),
    /// Atlas image could not be decoded or encoded
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// A `"x,y"` cell key that does not hold two integers
    #[error("invalid cell key '{0}'")]
    InvalidCoord(String),
    /// A sub-rectangle falls outside its source image
    #[error("tile '{name}' rect {x},{y} {width}x{height} is outside the {image_w}x{image_h} atlas")]
    RectOutOfBounds {
        /// Tile name from the descriptor.
        name: String,
        /// Rect left edge.
        x: u32,
        /// Rect top edge.
        y: u32,
        /// Rect width.
        width: u32,
        /// Rect height.
        height: u32,
        /// Source image width.
        image_w: u32,
        /// Source image height.
        image_h: u32,
    },
    /// No layers were found in the map document
    #[error("No layers found in map document")]
    NoLayer,
    /// Two layers in a document share an id
    #[error("duplicate layer id '{0}'")]
    DuplicateLayer(String),
    /// Removing this layer would leave the map without layers
    #[error("cannot remove the last layer")]
    LastLayer,
    /// The layer id does not exist in the current layer set
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),
    /// Export was requested on a map without visible tiles
    #[error("map has no visible tiles to export")]
    EmptyMap,
    /// The occupied area is too large to rasterize
    #[error("export of {width}x{height} pixels is too large")]
    ExportTooLarge {
        /// Requested width in pixels.
        width: u64,
        /// Requested height in pixels.
        height: u64,
    },
    /// No platform config directory could be determined
    #[error("could not determine config directory")]
    NoConfigDir,
    /// Unsupported file format (non-JSON)
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

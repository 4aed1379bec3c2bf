// src/loader/json_loader.rs
//! JSON map documents: encoding, decoding and validation.

use crate::error::{EditorError, Result};
use crate::layer::LayerSet;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Format version written into saved documents.
pub const FORMAT_VERSION: &str = "1.0";

/// On-disk map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Every layer, bottom to top. Must not be empty.
    pub layers: LayerSet,
    /// Format version; [`FORMAT_VERSION`] when written by this crate.
    #[serde(default)]
    pub version: String,
    /// Save time. Older documents may lack it.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MapDocument {
    /// Current-format document stamped with `timestamp`.
    pub fn new(layers: LayerSet, timestamp: DateTime<Utc>) -> Self {
        MapDocument {
            layers,
            version: FORMAT_VERSION.to_string(),
            timestamp: Some(timestamp),
        }
    }

    /// RFC 3339 form of the timestamp, as written to disk.
    pub fn timestamp_string(&self) -> Option<String> {
        self.timestamp
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Pretty JSON, the same text for the store and the download.
pub fn encode_map(doc: &MapDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(|source| EditorError::Json {
        path: "<memory>".into(),
        source,
    })
}

/// Parses and validates a document. `origin` only labels errors.
///
/// Layer opacity outside `[0, 1]` is clamped into range.
pub fn decode_map_str(txt: &str, origin: &Path) -> Result<MapDocument> {
    let mut doc: MapDocument = serde_json::from_str(txt).map_err(|source| EditorError::Json {
        path: origin.to_path_buf(),
        source,
    })?;

    if doc.layers.is_empty() {
        return Err(EditorError::NoLayer);
    }
    let mut seen = HashSet::new();
    for layer in &doc.layers {
        if !seen.insert(&layer.id) {
            return Err(EditorError::DuplicateLayer(layer.id.to_string()));
        }
    }
    for layer in doc.layers.iter_mut() {
        let clamped = layer.opacity.clamp(0.0, 1.0);
        if clamped != layer.opacity {
            log::warn!(
                "{}: layer '{}' opacity {} clamped to {clamped}",
                origin.display(),
                layer.id,
                layer.opacity
            );
            layer.opacity = clamped;
        }
    }
    Ok(doc)
}

/// Reads a map document, only supporting JSON.
pub fn decode_map_file(path: &Path) -> Result<MapDocument> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(EditorError::UnsupportedFormat(path.display().to_string()));
    }
    let txt = std::fs::read_to_string(path).map_err(|source| EditorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_map_str(&txt, path)
}

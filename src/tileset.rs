//! Tile definitions and the name-keyed registry they are merged into.

use crate::error::Result;
use crate::layer::TilesetKind;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Source rectangle of a tile inside its atlas, in atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A named, already-cropped tile image.
#[derive(Debug, Clone)]
pub struct TileDefinition {
    /// Registry key, unique across categories.
    pub name: String,
    /// Where the tile was cut from.
    pub rect: TileRect,
    /// Cropped pixels.
    pub image: Arc<RgbaImage>,
}

/// Handed out when an atlas load starts; used to tell stale results from fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Category being loaded.
    pub kind: TilesetKind,
    /// Increases with every load started.
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    def: TileDefinition,
    generation: u64,
}

/// State of the palette's working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteState {
    /// No category requested yet.
    Idle,
    /// Waiting for this ticket's atlas.
    Loading(LoadTicket),
    /// Working set holds this ticket's tiles.
    Ready(LoadTicket),
    /// This ticket's load failed; the working set is empty until a retry.
    Failed(LoadTicket),
}

/// Process-wide registry of every tile ever loaded, plus the palette's working set.
#[derive(Debug)]
pub struct TileRegistry {
    entries: HashMap<String, Entry>,
    working: Vec<String>,
    state: PaletteState,
    next_generation: u64,
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TileRegistry {
    /// Empty registry in the idle state.
    pub fn new() -> Self {
        TileRegistry {
            entries: HashMap::new(),
            working: Vec::new(),
            state: PaletteState::Idle,
            next_generation: 1,
        }
    }

    /// Tile by name, from any category.
    pub fn get(&self, name: &str) -> Option<&TileDefinition> {
        self.entries.get(name).map(|e| &e.def)
    }

    /// Number of tiles ever merged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before any merge.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current palette state.
    pub fn state(&self) -> PaletteState {
        self.state
    }

    /// Category the palette currently shows or is loading.
    pub fn palette_kind(&self) -> Option<TilesetKind> {
        match self.state {
            PaletteState::Idle => None,
            PaletteState::Loading(t) | PaletteState::Ready(t) | PaletteState::Failed(t) => {
                Some(t.kind)
            }
        }
    }

    /// Starts a load for `kind`. The working set empties until it resolves.
    pub fn begin_load(&mut self, kind: TilesetKind) -> LoadTicket {
        let ticket = LoadTicket {
            kind,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.working.clear();
        self.state = PaletteState::Loading(ticket);
        log::info!("loading {:?} tiles (generation {})", kind, ticket.generation);
        ticket
    }

    fn is_latest(&self, ticket: LoadTicket) -> bool {
        matches!(self.state, PaletteState::Loading(t) if t == ticket)
    }

    /// Applies a finished load.
    ///
    /// Definitions are merged by name unless the registry already holds a newer
    /// generation for that name. Only the most recent ticket replaces the working set.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<TileDefinition>>,
    ) -> Result<usize> {
        let latest = self.is_latest(ticket);
        let defs = match result {
            Ok(defs) => defs,
            Err(err) => {
                log::error!("failed to load {:?} tiles: {}", ticket.kind, err);
                if latest {
                    self.state = PaletteState::Failed(ticket);
                }
                return Err(err);
            }
        };

        let names: Vec<String> = defs.iter().map(|d| d.name.clone()).collect();
        let merged = self.merge(defs, ticket.generation);
        if latest {
            self.working = names;
            self.state = PaletteState::Ready(ticket);
            log::info!("loaded {} {:?} tiles", self.working.len(), ticket.kind);
        } else {
            log::warn!(
                "stale {:?} load (generation {}) merged {} of its tiles",
                ticket.kind,
                ticket.generation,
                merged
            );
        }
        Ok(merged)
    }

    /// Merges definitions; returns how many entries were written.
    pub fn merge(&mut self, defs: Vec<TileDefinition>, generation: u64) -> usize {
        let mut written = 0;
        for def in defs {
            match self.entries.get(&def.name) {
                Some(existing) if existing.generation > generation => continue,
                _ => {}
            }
            self.entries
                .insert(def.name.clone(), Entry { def, generation });
            written += 1;
        }
        written
    }

    /// Working set in load order.
    pub fn palette(&self) -> impl Iterator<Item = &TileDefinition> + '_ {
        self.working.iter().filter_map(|n| self.get(n))
    }

    /// Working set filtered by a case-insensitive name substring.
    pub fn search<'a>(&'a self, query: &str) -> Vec<&'a TileDefinition> {
        let needle = query.to_lowercase();
        self.palette()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use image::Rgba;

    fn def(name: &str, shade: u8) -> TileDefinition {
        TileDefinition {
            name: name.to_owned(),
            rect: TileRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
            image: Arc::new(RgbaImage::from_pixel(1, 1, Rgba([shade, 0, 0, 255]))),
        }
    }

    fn shade(reg: &TileRegistry, name: &str) -> u8 {
        reg.get(name).unwrap().image.get_pixel(0, 0).0[0]
    }

    #[test]
    fn later_loads_overwrite_and_earlier_names_stay_resolvable() {
        let mut reg = TileRegistry::new();
        let t1 = reg.begin_load(TilesetKind::Foreground);
        reg.finish_load(t1, Ok(vec![def("heart", 1), def("spikes", 1)]))
            .unwrap();

        let t2 = reg.begin_load(TilesetKind::Background);
        reg.finish_load(t2, Ok(vec![def("background_solid_sky", 2)]))
            .unwrap();

        assert!(reg.get("heart").is_some());
        let names: Vec<_> = reg.palette().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["background_solid_sky"]);
        assert_eq!(reg.palette_kind(), Some(TilesetKind::Background));
    }

    #[test]
    fn stale_load_does_not_overwrite_newer_entries() {
        let mut reg = TileRegistry::new();
        let slow = reg.begin_load(TilesetKind::Foreground);
        let fast = reg.begin_load(TilesetKind::Foreground);

        reg.finish_load(fast, Ok(vec![def("heart", 2)])).unwrap();
        let merged = reg
            .finish_load(slow, Ok(vec![def("heart", 1), def("gem_blue", 1)]))
            .unwrap();

        assert_eq!(merged, 1);
        assert_eq!(shade(&reg, "heart"), 2);
        assert!(reg.get("gem_blue").is_some());
        // the working set still belongs to the newer ticket
        let names: Vec<_> = reg.palette().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["heart"]);
    }

    #[test]
    fn failed_load_leaves_palette_empty() {
        let mut reg = TileRegistry::new();
        let t = reg.begin_load(TilesetKind::Entities);
        let err = reg.finish_load(t, Err(EditorError::Xml("boom".into())));
        assert!(err.is_err());
        assert_eq!(reg.state(), PaletteState::Failed(t));
        assert_eq!(reg.palette().count(), 0);
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut reg = TileRegistry::new();
        let t = reg.begin_load(TilesetKind::Foreground);
        reg.finish_load(
            t,
            Ok(vec![def("coin_gold", 1), def("Key_Blue", 1), def("gem_blue", 1)]),
        )
        .unwrap();
        let hits: Vec<_> = reg.search("BLUE").iter().map(|d| d.name.clone()).collect();
        assert_eq!(hits, vec!["Key_Blue", "gem_blue"]);
        assert_eq!(reg.search("").len(), 3);
    }
}

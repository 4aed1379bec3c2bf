//! Local persistence: a directory-backed key-value store and timestamped downloads.

use crate::error::{EditorError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Key the current map is saved under.
pub const SAVE_KEY: &str = "tilemap-save";

/// One file per key, named `<key>.json`.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Store backed by `dir`; created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store { dir: dir.into() }
    }

    /// Backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Writes `value` under `key`, replacing any earlier value.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        create_dir(&self.dir)?;
        let path = self.path(key);
        write_atomic(&path, value)?;
        log::debug!("stored {} bytes under {key}", value.len());
        Ok(())
    }

    /// `None` when the key was never written.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(EditorError::Io { path, source }),
        }
    }
}

/// File name offered for a download made at `now`.
pub fn download_name(now: DateTime<Utc>, ext: &str) -> String {
    format!("tilemap-{}.{ext}", now.timestamp_millis())
}

/// Path of a new `tilemap-<unix-ms>.<ext>` file in `dir`, creating `dir`.
pub fn download_path(dir: &Path, now: DateTime<Utc>, ext: &str) -> Result<PathBuf> {
    create_dir(dir)?;
    Ok(dir.join(download_name(now, ext)))
}

/// Writes a downloadable copy of a saved map into `dir`.
pub fn save_download(dir: &Path, json: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let path = download_path(dir, now, "json")?;
    write_atomic(&path, json)?;
    log::info!("wrote {}", path.display());
    Ok(path)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| EditorError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn put_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("store"));
        assert_eq!(store.get(SAVE_KEY).unwrap(), None);
        store.put(SAVE_KEY, "{}").unwrap();
        store.put(SAVE_KEY, "{\"layers\":[]}").unwrap();
        assert_eq!(store.get(SAVE_KEY).unwrap().as_deref(), Some("{\"layers\":[]}"));
    }

    #[test]
    fn download_is_named_by_unix_millis() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let path = save_download(dir.path(), "{}", now).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("tilemap-1700000000123.json")
        );
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}

//! String key-value blobs backing guest mode.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::{BarweekError, BarweekResult};

/// Synchronous blob storage, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> BarweekResult<()>;
    fn remove(&self, key: &str) -> BarweekResult<()>;
}

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> BarweekResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BarweekResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
pub struct DirKv {
    dir: PathBuf,
}

impl DirKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirKv { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> BarweekResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BarweekError::Validation(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for DirKv {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key).ok()?;
        std::fs::read_to_string(path).ok()
    }

    fn set(&self, key: &str, value: &str) -> BarweekResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let temp = self.dir.join(format!("{}.tmp", key));
        std::fs::write(&temp, value)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> BarweekResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

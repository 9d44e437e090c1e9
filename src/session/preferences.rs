//! Key-value preference storage behind the session cache.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Text(String),
}

/// String/bool preferences. Reads of a key holding the other type return `None`.
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
    /// Persist anything still buffered.
    fn flush(&self) -> Result<(), AppError>;
}

type PrefMap = BTreeMap<String, PrefValue>;

fn lock(map: &Mutex<PrefMap>) -> MutexGuard<'_, PrefMap> {
    match map.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn read_string(map: &PrefMap, key: &str) -> Option<String> {
    match map.get(key) {
        Some(PrefValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn read_bool(map: &PrefMap, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(PrefValue::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Ephemeral preferences; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    map: Mutex<PrefMap>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        read_string(&lock(&self.map), key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), AppError> {
        lock(&self.map).insert(key.to_string(), PrefValue::Text(value.to_string()));
        Ok(())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        read_bool(&lock(&self.map), key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), AppError> {
        lock(&self.map).insert(key.to_string(), PrefValue::Bool(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        lock(&self.map).remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// JSON-file preferences. Every mutation rewrites the file atomically
/// (temp file + rename), so a crash never leaves a torn file behind.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    map: Mutex<PrefMap>,
}

impl FilePreferences {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => PrefMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AppError::Preferences(format!("corrupt preference file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PrefMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), keys = map.len(), "preferences loaded");
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &PrefMap) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(map)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "preferences written");
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut PrefMap)) -> Result<(), AppError> {
        let mut map = lock(&self.map);
        f(&mut map);
        self.persist(&map)
    }
}

impl PreferenceStore for FilePreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        read_string(&lock(&self.map), key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.mutate(|m| {
            m.insert(key.to_string(), PrefValue::Text(value.to_string()));
        })
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        read_bool(&lock(&self.map), key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), AppError> {
        self.mutate(|m| {
            m.insert(key.to_string(), PrefValue::Bool(value));
        })
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.mutate(|m| {
            m.remove(key);
        })
    }

    fn flush(&self) -> Result<(), AppError> {
        let map = lock(&self.map);
        self.persist(&map)
    }
}

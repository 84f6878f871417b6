//! File-based storage implementation for native platforms.

use super::{BoxFuture, SettingsStore, Storage, StorageError, StorageResult};
use crate::board::BoardSnapshot;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// File-based storage for native platforms.
///
/// Stores board snapshots as JSON files in a base directory and settings in
/// a single `settings.json` next to them.
pub struct FileStorage {
    /// Base directory for storage.
    base_path: PathBuf,
    /// Settings cache, written through to disk on every set.
    settings: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        let settings = Self::read_settings(&base_path);
        Ok(Self {
            base_path,
            settings: RwLock::new(settings),
        })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/winterboard/boards/`
    /// On Windows: `%APPDATA%\winterboard\boards\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        let path = base.join("winterboard").join("boards");
        Self::new(path)
    }

    /// Get the file path for a board ID.
    fn board_path(&self, id: &str) -> PathBuf {
        // Sanitize ID to be safe for filenames
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.board.json", safe_id))
    }

    fn settings_path(base: &PathBuf) -> PathBuf {
        base.join("settings.json")
    }

    fn read_settings(base: &PathBuf) -> HashMap<String, String> {
        let path = Self::settings_path(base);
        match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Discarding malformed settings file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn write_settings(&self, settings: &HashMap<String, String>) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let path = Self::settings_path(&self.base_path);
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        let json = match serde_json::to_string(snapshot) {
            Ok(j) => j,
            Err(e) => {
                return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) });
            }
        };

        Box::pin(async move {
            fs::write(&path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let path = self.board_path(id);
        let id_owned = id.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id_owned));
            }

            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;

            serde_json::from_str(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut ids = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if let Some(id) = name.strip_suffix(".board.json") {
                        ids.push(id.to_string());
                    }
                }
            }
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.board_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

impl SettingsStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.settings.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        settings.insert(key.to_string(), value.to_string());
        self.write_settings(&settings)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        settings.remove(key);
        self.write_settings(&settings)
    }
}

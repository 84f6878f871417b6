//! In-memory storage implementation.

use super::{BoxFuture, SettingsStore, Storage, StorageError, StorageResult};
use crate::board::BoardSnapshot;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
///
/// Implements both the board snapshot port and the settings port.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, BoardSnapshot>>,
    settings: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let snapshot = snapshot.clone();
        Box::pin(async move {
            let mut boards = self
                .boards
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            boards.insert(id, snapshot);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self
                .boards
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            boards
                .get(&id)
                .cloned()
                .ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut boards = self
                .boards
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            boards.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self
                .boards
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self
                .boards
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(boards.contains_key(&id))
        })
    }
}

impl SettingsStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.settings.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        settings.remove(key);
        Ok(())
    }
}

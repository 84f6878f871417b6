//! Undo/redo history over document mutations.
//!
//! History tracks intent, not storage: `undo`/`redo` return the entry that
//! was applied and the caller re-applies the `before`/`after` snapshots to
//! the document model.

use crate::component::{Component, ComponentId};
use serde::{Deserialize, Serialize};

/// Maximum number of undo entries to keep.
pub const MAX_UNDO_ENTRIES: usize = 100;

/// Kind of primitive mutation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
}

/// One primitive mutation with snapshots sufficient to invert it.
///
/// `before` is `None` for creations; `after` is `None` for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub action: HistoryAction,
    pub component_id: ComponentId,
    pub before: Option<Component>,
    pub after: Option<Component>,
}

/// An undo stack entry: one mutation, or a batch reverted as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEntry {
    Single(HistoryRecord),
    Batch(Vec<HistoryRecord>),
}

impl HistoryEntry {
    /// Records in forward (recorded) order.
    pub fn records(&self) -> &[HistoryRecord] {
        match self {
            HistoryEntry::Single(record) => std::slice::from_ref(record),
            HistoryEntry::Batch(records) => records,
        }
    }
}

/// Undo/redo stacks with batching.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// Records accumulated between `start_batch` and `end_batch`.
    batch: Option<Vec<HistoryRecord>>,
}

impl HistoryManager {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one mutation.
    ///
    /// Inside an open batch the record is accumulated; otherwise it is pushed
    /// as its own entry. Recording always truncates the redo stack.
    pub fn record(
        &mut self,
        action: HistoryAction,
        component_id: &str,
        before: Option<Component>,
        after: Option<Component>,
    ) {
        let record = HistoryRecord {
            action,
            component_id: component_id.to_string(),
            before,
            after,
        };
        self.redo_stack.clear();
        match self.batch {
            Some(ref mut records) => records.push(record),
            None => self.push_entry(HistoryEntry::Single(record)),
        }
    }

    /// Begin accumulating records into one batch entry.
    pub fn start_batch(&mut self) {
        if self.batch.is_none() {
            self.batch = Some(Vec::new());
        }
    }

    /// Close the open batch, pushing it as a single entry.
    ///
    /// An empty batch leaves the stacks untouched.
    pub fn end_batch(&mut self) {
        if let Some(records) = self.batch.take() {
            if !records.is_empty() {
                self.push_entry(HistoryEntry::Batch(records));
            }
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        if self.undo_stack.len() > MAX_UNDO_ENTRIES {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the newest entry onto the redo stack and return it.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop the newest redo entry back onto the undo stack and return it.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    /// Whether undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all entries and any open batch.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentData, TextData};

    fn text_component(id: &str, text: &str) -> Component {
        Component {
            id: id.to_string(),
            layer_id: 1,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            rotation: 0.0,
            locked: false,
            visible: true,
            version: 1,
            data: ComponentData::Text(TextData {
                text: text.to_string(),
                font_size: 16.0,
                font_family: "sans-serif".to_string(),
                color: "#000000".to_string(),
            }),
        }
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = HistoryManager::new();
        let created = text_component("a", "hello");
        history.record(HistoryAction::Create, "a", None, Some(created.clone()));

        let entry = history.undo().unwrap();
        assert_eq!(entry.records()[0].after.as_ref(), Some(&created));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let entry = history.redo().unwrap();
        assert_eq!(entry.records()[0].after.as_ref(), Some(&created));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_truncates_redo() {
        let mut history = HistoryManager::new();
        history.record(HistoryAction::Create, "a", None, Some(text_component("a", "1")));
        history.record(HistoryAction::Create, "b", None, Some(text_component("b", "2")));
        history.undo();
        assert!(history.can_redo());

        history.record(HistoryAction::Create, "c", None, Some(text_component("c", "3")));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_batch_groups_records() {
        let mut history = HistoryManager::new();
        history.start_batch();
        history.record(HistoryAction::Delete, "a", Some(text_component("a", "1")), None);
        history.record(HistoryAction::Delete, "b", Some(text_component("b", "2")), None);
        history.end_batch();

        let entry = history.undo().unwrap();
        assert_eq!(entry.records().len(), 2);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut history = HistoryManager::new();
        history.start_batch();
        history.end_batch();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_cap() {
        let mut history = HistoryManager::new();
        for i in 0..(MAX_UNDO_ENTRIES + 10) {
            let id = format!("c{}", i);
            history.record(HistoryAction::Create, &id, None, Some(text_component(&id, "x")));
        }
        let mut undone = 0;
        while history.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, MAX_UNDO_ENTRIES);
    }

    #[test]
    fn test_undo_empty() {
        let mut history = HistoryManager::new();
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }
}

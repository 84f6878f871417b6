//! Local selection state.

use crate::component::ComponentId;
use std::collections::HashSet;

/// Set of selected component ids.
///
/// Selection is the local client's intent only: it is never serialized and
/// never synchronized to other clients.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: HashSet<ComponentId>,
}

impl SelectionManager {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a component. Non-additive selection replaces the set.
    pub fn select(&mut self, id: &str, additive: bool) {
        if !additive {
            self.selected.clear();
        }
        self.selected.insert(id.to_string());
    }

    /// Toggle a component in or out of the selection.
    pub fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Replace the selection with the given ids.
    pub fn select_multiple(&mut self, ids: &[ComponentId]) {
        self.selected = ids.iter().cloned().collect();
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop an id from the selection (e.g. after its component is deleted).
    pub fn deselect(&mut self, id: &str) {
        self.selected.remove(id);
    }

    /// Whether a component is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids, in no particular order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.selected.iter().cloned().collect()
    }

    /// Number of selected components.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

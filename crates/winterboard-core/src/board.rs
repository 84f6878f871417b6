//! The board engine.
//!
//! Owns the document model (pages, layers, components), the local-only
//! selection, undo/redo history, viewport and tool state, and produces
//! [`BoardOperation`]s describing every mutation for the sync layer.

use crate::camera::Viewport;
use crate::component::{Component, ComponentId, ComponentManager, ComponentPatch, ComponentSpec};
use crate::history::{HistoryAction, HistoryManager, HistoryRecord};
use crate::layer::LayerManager;
use crate::selection::SelectionManager;
use crate::tools::ToolManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Board mutation errors.
#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("Unknown page: {0}")]
    UnknownPage(String),
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("Unknown layer: {0}")]
    UnknownLayer(u64),
    #[error("Layer {0} is locked")]
    LayerLocked(u64),
    #[error("A board must keep at least one page")]
    LastPage,
    #[error("Malformed operation data: {0}")]
    Malformed(String),
}

/// Kind of a synchronized board mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ComponentCreate,
    ComponentUpdate,
    ComponentDelete,
    BatchDelete,
    PageAdd,
    PageDelete,
}

/// One board mutation as it travels over the wire.
///
/// `version` is the page version after the mutation; the server rejects
/// operations whose version lags the page and answers with a conflict frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOperation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub page_id: String,
    pub version: u64,
    pub data: Value,
}

/// One page of the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    /// CSS color of the page background.
    pub background: String,
    /// Bumped on every synchronized mutation.
    pub version: u64,
    pub components: ComponentManager,
}

impl Page {
    fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            background: "#ffffff".to_string(),
            version: 0,
            components: ComponentManager::new(),
        }
    }
}

/// Serializable document state, for persistence.
///
/// Selection, history, viewport and tool state are session-local and are
/// deliberately not part of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub pages: Vec<Page>,
    pub current_page: usize,
    pub layers: LayerManager,
}

/// The whiteboard document engine.
pub struct BoardEngine {
    pages: Vec<Page>,
    current: usize,
    pub layers: LayerManager,
    pub selection: SelectionManager,
    pub history: HistoryManager,
    pub viewport: Viewport,
    pub tools: ToolManager,
    /// Mutations awaiting pickup by the sync layer.
    pending_ops: Vec<BoardOperation>,
}

impl Default for BoardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardEngine {
    /// Create a board with one empty page and one default layer.
    pub fn new() -> Self {
        Self {
            pages: vec![Page::new("Page 1")],
            current: 0,
            layers: LayerManager::new(),
            selection: SelectionManager::new(),
            history: HistoryManager::new(),
            viewport: Viewport::new(),
            tools: ToolManager::new(),
            pending_ops: Vec::new(),
        }
    }

    /// All pages, in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// The page currently being edited.
    pub fn current_page(&self) -> &Page {
        &self.pages[self.current]
    }

    /// Id of the page currently being edited.
    pub fn current_page_id(&self) -> &str {
        &self.pages[self.current].id
    }

    fn current_page_mut(&mut self) -> &mut Page {
        &mut self.pages[self.current]
    }

    fn page_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == page_id)
    }

    // ------------------------------------------------------------------
    // Component mutations
    // ------------------------------------------------------------------

    /// Create a component on the current page.
    pub fn create_component(&mut self, spec: ComponentSpec) -> Result<ComponentId, BoardError> {
        let layer = self
            .layers
            .get(spec.layer_id)
            .ok_or(BoardError::UnknownLayer(spec.layer_id))?;
        if layer.locked {
            return Err(BoardError::LayerLocked(spec.layer_id));
        }

        let page = self.current_page_mut();
        let id = page.components.create(spec);
        let created = page
            .components
            .get(&id)
            .cloned()
            .ok_or_else(|| BoardError::UnknownComponent(id.clone()))?;
        page.version += 1;

        self.history
            .record(HistoryAction::Create, &id, None, Some(created.clone()));
        self.emit(OperationKind::ComponentCreate, component_data(&created));
        Ok(id)
    }

    /// Patch a component on the current page.
    pub fn update_component(
        &mut self,
        id: &str,
        patch: &ComponentPatch,
    ) -> Result<Component, BoardError> {
        let page = self.current_page_mut();
        let before = page
            .components
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::UnknownComponent(id.to_string()))?;
        if self.layers.get(before.layer_id).is_some_and(|l| l.locked) {
            return Err(BoardError::LayerLocked(before.layer_id));
        }

        let page = self.current_page_mut();
        let after = page
            .components
            .update(id, patch)
            .ok_or_else(|| BoardError::UnknownComponent(id.to_string()))?;
        page.version += 1;

        self.history
            .record(HistoryAction::Update, id, Some(before), Some(after.clone()));
        self.emit(OperationKind::ComponentUpdate, component_data(&after));
        Ok(after)
    }

    /// Delete a component from the current page.
    pub fn delete_component(&mut self, id: &str) -> Result<(), BoardError> {
        let page = self.current_page_mut();
        let removed = page
            .components
            .delete(id)
            .ok_or_else(|| BoardError::UnknownComponent(id.to_string()))?;
        page.version += 1;

        self.selection.deselect(id);
        self.history
            .record(HistoryAction::Delete, id, Some(removed), None);
        self.emit(
            OperationKind::ComponentDelete,
            serde_json::json!({ "id": id }),
        );
        Ok(())
    }

    /// Delete every selected component as one undoable batch.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return 0;
        }

        self.history.start_batch();
        let page = self.current_page_mut();
        let removed = page.components.batch_delete(&ids);
        if !removed.is_empty() {
            page.version += 1;
        }
        for component in &removed {
            self.history.record(
                HistoryAction::Delete,
                &component.id,
                Some(component.clone()),
                None,
            );
        }
        self.history.end_batch();
        self.selection.clear();

        if !removed.is_empty() {
            let ids: Vec<&str> = removed.iter().map(|c| c.id.as_str()).collect();
            self.emit(OperationKind::BatchDelete, serde_json::json!({ "ids": ids }));
        }
        removed.len()
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    /// Revert the newest history entry. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        // Batch records revert in reverse order
        for record in entry.records().iter().rev() {
            self.apply_inverse(record);
        }
        true
    }

    /// Re-apply the newest undone entry. Returns `false` when there is none.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        for record in entry.records() {
            self.apply_forward(record);
        }
        true
    }

    fn apply_inverse(&mut self, record: &HistoryRecord) {
        match record.before {
            Some(ref before) => {
                let before = before.clone();
                let kind = match record.action {
                    HistoryAction::Delete => OperationKind::ComponentCreate,
                    _ => OperationKind::ComponentUpdate,
                };
                let page = self.current_page_mut();
                page.components.insert(before.clone());
                page.version += 1;
                self.emit(kind, component_data(&before));
            }
            None => {
                // Undoing a creation
                let id = record.component_id.clone();
                let page = self.current_page_mut();
                if page.components.delete(&id).is_some() {
                    page.version += 1;
                    self.selection.deselect(&id);
                    self.emit(
                        OperationKind::ComponentDelete,
                        serde_json::json!({ "id": id }),
                    );
                }
            }
        }
    }

    fn apply_forward(&mut self, record: &HistoryRecord) {
        match record.after {
            Some(ref after) => {
                let after = after.clone();
                let kind = match record.action {
                    HistoryAction::Create => OperationKind::ComponentCreate,
                    _ => OperationKind::ComponentUpdate,
                };
                let page = self.current_page_mut();
                page.components.insert(after.clone());
                page.version += 1;
                self.emit(kind, component_data(&after));
            }
            None => {
                // Redoing a deletion
                let id = record.component_id.clone();
                let page = self.current_page_mut();
                if page.components.delete(&id).is_some() {
                    page.version += 1;
                    self.selection.deselect(&id);
                    self.emit(
                        OperationKind::ComponentDelete,
                        serde_json::json!({ "id": id }),
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Append a new page; the current page is unchanged.
    pub fn add_page(&mut self, name: &str) -> String {
        let page = Page::new(name);
        let id = page.id.clone();
        self.pending_ops.push(BoardOperation {
            kind: OperationKind::PageAdd,
            page_id: id.clone(),
            version: 0,
            data: serde_json::json!({ "id": id, "name": name }),
        });
        self.pages.push(page);
        id
    }

    /// Switch the current page.
    ///
    /// Selection and history are session state tied to the page being edited
    /// and are cleared on switch.
    pub fn switch_page(&mut self, page_id: &str) -> Result<(), BoardError> {
        let index = self
            .pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or_else(|| BoardError::UnknownPage(page_id.to_string()))?;
        if index != self.current {
            self.current = index;
            self.selection.clear();
            self.history.clear();
        }
        Ok(())
    }

    /// Delete a page. The last remaining page is kept.
    pub fn delete_page(&mut self, page_id: &str) -> Result<(), BoardError> {
        if self.pages.len() <= 1 {
            return Err(BoardError::LastPage);
        }
        let index = self
            .pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or_else(|| BoardError::UnknownPage(page_id.to_string()))?;

        self.pages.remove(index);
        if self.current >= self.pages.len() {
            self.current = self.pages.len() - 1;
        } else if index <= self.current && self.current > 0 {
            self.current -= 1;
        }
        self.selection.clear();
        self.history.clear();

        self.pending_ops.push(BoardOperation {
            kind: OperationKind::PageDelete,
            page_id: page_id.to_string(),
            version: 0,
            data: serde_json::json!({ "id": page_id }),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sync integration
    // ------------------------------------------------------------------

    /// Take mutations produced since the last call, in order.
    pub fn take_operations(&mut self) -> Vec<BoardOperation> {
        std::mem::take(&mut self.pending_ops)
    }

    /// Apply a mutation received from another client.
    ///
    /// Remote mutations bypass history and produce no outgoing operations.
    pub fn apply_remote(&mut self, op: &BoardOperation) -> Result<(), BoardError> {
        match op.kind {
            OperationKind::PageAdd => {
                if self.page_mut(&op.page_id).is_none() {
                    let name = op.data["name"].as_str().unwrap_or("Page");
                    let mut page = Page::new(name);
                    page.id = op.page_id.clone();
                    self.pages.push(page);
                }
                return Ok(());
            }
            OperationKind::PageDelete => {
                if self.pages.len() <= 1 {
                    return Err(BoardError::LastPage);
                }
                let index = self
                    .pages
                    .iter()
                    .position(|p| p.id == op.page_id)
                    .ok_or_else(|| BoardError::UnknownPage(op.page_id.clone()))?;
                let was_current = index == self.current;
                self.pages.remove(index);
                // Same index adjustment as the local delete path, so the
                // client keeps editing the page it was on
                if self.current >= self.pages.len() {
                    self.current = self.pages.len() - 1;
                } else if index <= self.current && self.current > 0 {
                    self.current -= 1;
                }
                if was_current {
                    self.selection.clear();
                    self.history.clear();
                }
                return Ok(());
            }
            _ => {}
        }

        let page = self
            .page_mut(&op.page_id)
            .ok_or_else(|| BoardError::UnknownPage(op.page_id.clone()))?;

        match op.kind {
            OperationKind::ComponentCreate | OperationKind::ComponentUpdate => {
                let component: Component = serde_json::from_value(op.data.clone())
                    .map_err(|e| BoardError::Malformed(e.to_string()))?;
                page.components.insert(component);
            }
            OperationKind::ComponentDelete => {
                let id = op.data["id"]
                    .as_str()
                    .ok_or_else(|| BoardError::Malformed("missing id".to_string()))?
                    .to_string();
                page.components.delete(&id);
                self.selection.deselect(&id);
            }
            OperationKind::BatchDelete => {
                let ids: Vec<String> = serde_json::from_value(op.data["ids"].clone())
                    .map_err(|e| BoardError::Malformed(e.to_string()))?;
                let page = self
                    .page_mut(&op.page_id)
                    .ok_or_else(|| BoardError::UnknownPage(op.page_id.clone()))?;
                page.components.batch_delete(&ids);
                for id in &ids {
                    self.selection.deselect(id);
                }
            }
            OperationKind::PageAdd | OperationKind::PageDelete => {}
        }

        if let Some(page) = self.page_mut(&op.page_id) {
            page.version = page.version.max(op.version);
        }
        Ok(())
    }

    /// Force the current page to the server's version after a conflict.
    pub fn resolve_conflict(&mut self, page_id: &str, current_version: u64) {
        if let Some(page) = self.page_mut(page_id) {
            log::warn!(
                "Version conflict on page {}: {} -> {}",
                page_id,
                page.version,
                current_version
            );
            page.version = current_version;
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture the document state.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            pages: self.pages.clone(),
            current_page: self.current,
            layers: self.layers.clone(),
        }
    }

    /// Replace the document state. Session state is reset.
    pub fn restore(&mut self, snapshot: BoardSnapshot) {
        self.current = if snapshot.pages.is_empty() {
            0
        } else {
            snapshot.current_page.min(snapshot.pages.len() - 1)
        };
        self.pages = if snapshot.pages.is_empty() {
            vec![Page::new("Page 1")]
        } else {
            snapshot.pages
        };
        self.layers = snapshot.layers;
        self.selection.clear();
        self.history.clear();
        self.pending_ops.clear();
    }

    fn emit(&mut self, kind: OperationKind, data: Value) {
        let page = &self.pages[self.current];
        self.pending_ops.push(BoardOperation {
            kind,
            page_id: page.id.clone(),
            version: page.version,
            data,
        });
    }
}

fn component_data(component: &Component) -> Value {
    serde_json::to_value(component).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentData, StrokeData, StrokePoint};

    fn stroke_spec(layer_id: u64) -> ComponentSpec {
        ComponentSpec {
            layer_id,
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
            data: ComponentData::Stroke(StrokeData {
                points: vec![StrokePoint {
                    x: 10.0,
                    y: 20.0,
                    pressure: 0.5,
                }],
                color: "#1a1a1a".to_string(),
                thickness: 2.0,
                opacity: 1.0,
            }),
        }
    }

    fn default_layer(engine: &BoardEngine) -> u64 {
        engine.layers.layers_ordered()[0].id
    }

    #[test]
    fn test_new_board_shape() {
        let engine = BoardEngine::new();
        assert_eq!(engine.pages().len(), 1);
        assert_eq!(engine.layers.len(), 1);
        assert!(engine.current_page().components.is_empty());
    }

    #[test]
    fn test_create_records_and_emits() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let id = engine.create_component(stroke_spec(layer)).unwrap();

        assert!(engine.current_page().components.get(&id).is_some());
        assert_eq!(engine.current_page().version, 1);
        assert!(engine.history.can_undo());

        let ops = engine.take_operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::ComponentCreate);
        assert_eq!(ops[0].version, 1);
        assert!(engine.take_operations().is_empty());
    }

    #[test]
    fn test_locked_layer_rejects_edits() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        engine.layers.toggle_lock(layer);
        assert_eq!(
            engine.create_component(stroke_spec(layer)),
            Err(BoardError::LayerLocked(layer))
        );
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let id = engine.create_component(stroke_spec(layer)).unwrap();
        let patch = ComponentPatch {
            x: Some(99.0),
            ..Default::default()
        };
        engine.update_component(&id, &patch).unwrap();
        assert_eq!(engine.current_page().components.get(&id).unwrap().x, 99.0);

        assert!(engine.undo());
        assert_eq!(engine.current_page().components.get(&id).unwrap().x, 10.0);

        assert!(engine.redo());
        assert_eq!(engine.current_page().components.get(&id).unwrap().x, 99.0);
    }

    #[test]
    fn test_undo_creation_removes_component() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let id = engine.create_component(stroke_spec(layer)).unwrap();

        assert!(engine.undo());
        assert!(engine.current_page().components.get(&id).is_none());

        assert!(engine.redo());
        assert!(engine.current_page().components.get(&id).is_some());
    }

    #[test]
    fn test_new_edit_truncates_redo() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        engine.create_component(stroke_spec(layer)).unwrap();
        engine.undo();
        assert!(engine.history.can_redo());

        engine.create_component(stroke_spec(layer)).unwrap();
        assert!(!engine.redo());
    }

    #[test]
    fn test_delete_selected_is_one_batch() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let a = engine.create_component(stroke_spec(layer)).unwrap();
        let b = engine.create_component(stroke_spec(layer)).unwrap();
        engine.selection.select_multiple(&[a.clone(), b.clone()]);

        assert_eq!(engine.delete_selected(), 2);
        assert!(engine.current_page().components.is_empty());
        assert!(engine.selection.is_empty());

        // One undo restores both
        assert!(engine.undo());
        assert_eq!(engine.current_page().components.len(), 2);
    }

    #[test]
    fn test_undo_emits_sync_operations() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let id = engine.create_component(stroke_spec(layer)).unwrap();
        engine.take_operations();

        engine.undo();
        let ops = engine.take_operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OperationKind::ComponentDelete);
        assert_eq!(ops[0].data["id"], serde_json::json!(id));
    }

    #[test]
    fn test_pages_add_switch_delete() {
        let mut engine = BoardEngine::new();
        let first = engine.current_page_id().to_string();
        let second = engine.add_page("Page 2");

        engine.switch_page(&second).unwrap();
        assert_eq!(engine.current_page_id(), second);

        engine.delete_page(&second).unwrap();
        assert_eq!(engine.current_page_id(), first);
        assert_eq!(
            engine.delete_page(&first),
            Err(BoardError::LastPage)
        );
    }

    #[test]
    fn test_switch_page_clears_selection() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let id = engine.create_component(stroke_spec(layer)).unwrap();
        engine.selection.select(&id, false);
        let second = engine.add_page("Page 2");

        engine.switch_page(&second).unwrap();
        assert!(engine.selection.is_empty());
        assert!(!engine.history.can_undo());
    }

    #[test]
    fn test_apply_remote_create_and_delete() {
        let mut local = BoardEngine::new();
        let mut remote = BoardEngine::new();
        let layer = default_layer(&remote);

        // Pages are independent per client; align ids for the test
        let snapshot = local.snapshot();
        remote.restore(snapshot);

        let id = remote.create_component(stroke_spec(layer)).unwrap();
        for op in remote.take_operations() {
            local.apply_remote(&op).unwrap();
        }
        assert!(local.current_page().components.get(&id).is_some());
        assert_eq!(local.current_page().version, 1);
        // Remote applies leave history untouched
        assert!(!local.history.can_undo());

        remote.delete_component(&id).unwrap();
        for op in remote.take_operations() {
            local.apply_remote(&op).unwrap();
        }
        assert!(local.current_page().components.get(&id).is_none());
    }

    fn page_delete_op(page_id: &str) -> BoardOperation {
        BoardOperation {
            kind: OperationKind::PageDelete,
            page_id: page_id.to_string(),
            version: 0,
            data: serde_json::json!({ "id": page_id }),
        }
    }

    #[test]
    fn test_remote_page_delete_keeps_current_page() {
        let mut engine = BoardEngine::new();
        let first = engine.current_page_id().to_string();
        let second = engine.add_page("Page 2");
        engine.add_page("Page 3");
        engine.switch_page(&second).unwrap();

        // A remote client deletes a page before the current one
        engine.apply_remote(&page_delete_op(&first)).unwrap();
        assert_eq!(engine.current_page_id(), second);
        assert_eq!(engine.pages().len(), 2);
    }

    #[test]
    fn test_remote_delete_of_current_page_clears_session_state() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let second = engine.add_page("Page 2");
        let third = engine.add_page("Page 3");
        engine.switch_page(&second).unwrap();
        let id = engine.create_component(stroke_spec(layer)).unwrap();
        engine.selection.select(&id, false);

        engine.apply_remote(&page_delete_op(&second)).unwrap();
        // Editing moved off the dead page; its selection and history must
        // not leak onto the survivor
        assert_ne!(engine.current_page_id(), second);
        assert!(engine.selection.is_empty());
        assert!(!engine.history.can_undo());
        assert!(engine.pages().iter().any(|p| p.id == third));
    }

    #[test]
    fn test_remote_delete_after_current_leaves_state_alone() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        let second = engine.add_page("Page 2");
        let id = engine.create_component(stroke_spec(layer)).unwrap();
        engine.selection.select(&id, false);

        engine.apply_remote(&page_delete_op(&second)).unwrap();
        assert!(engine.selection.is_selected(&id));
        assert!(engine.history.can_undo());
    }

    #[test]
    fn test_apply_remote_page_add() {
        let mut engine = BoardEngine::new();
        let op = BoardOperation {
            kind: OperationKind::PageAdd,
            page_id: "p-remote".to_string(),
            version: 0,
            data: serde_json::json!({ "id": "p-remote", "name": "Shared" }),
        };
        engine.apply_remote(&op).unwrap();
        assert_eq!(engine.pages().len(), 2);
        assert!(engine.pages().iter().any(|p| p.id == "p-remote"));

        // Re-delivery is a no-op
        engine.apply_remote(&op).unwrap();
        assert_eq!(engine.pages().len(), 2);
    }

    #[test]
    fn test_apply_remote_unknown_page() {
        let mut engine = BoardEngine::new();
        let op = BoardOperation {
            kind: OperationKind::ComponentDelete,
            page_id: "nope".to_string(),
            version: 1,
            data: serde_json::json!({ "id": "x" }),
        };
        assert!(matches!(
            engine.apply_remote(&op),
            Err(BoardError::UnknownPage(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut engine = BoardEngine::new();
        let layer = default_layer(&engine);
        engine.create_component(stroke_spec(layer)).unwrap();
        engine.add_page("Page 2");

        let json = serde_json::to_string(&engine.snapshot()).unwrap();
        let snapshot: BoardSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = BoardEngine::new();
        restored.restore(snapshot);
        assert_eq!(restored.pages().len(), 2);
        assert_eq!(restored.current_page().components.len(), 1);
        assert!(!restored.history.can_undo());
    }

    #[test]
    fn test_resolve_conflict_adopts_server_version() {
        let mut engine = BoardEngine::new();
        let page_id = engine.current_page_id().to_string();
        engine.resolve_conflict(&page_id, 42);
        assert_eq!(engine.current_page().version, 42);
    }

    #[test]
    fn test_operation_wire_shape() {
        let op = BoardOperation {
            kind: OperationKind::ComponentCreate,
            page_id: "p1".to_string(),
            version: 3,
            data: serde_json::json!({}),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "component_create");
        assert_eq!(json["pageId"], "p1");
        assert_eq!(json["version"], 3);
    }
}

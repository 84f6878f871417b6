//! Layer records and the layer manager.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier for a layer.
pub type LayerId = u64;

/// A single layer in the board's paint order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique layer identifier.
    pub id: LayerId,
    /// User-visible name.
    pub name: String,
    /// Paint/selection priority; 0 is the bottom layer.
    pub order: usize,
    /// Whether the layer is painted and hit-testable.
    pub visible: bool,
    /// Locked layers reject component edits.
    pub locked: bool,
}

/// Owns the layer collection.
///
/// Invariant: the collection is never empty. Deleting the last layer is
/// rejected and reported as a failed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerManager {
    layers: HashMap<LayerId, Layer>,
    next_id: LayerId,
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManager {
    /// Create a manager holding one default layer.
    pub fn new() -> Self {
        let mut manager = Self {
            layers: HashMap::new(),
            next_id: 1,
        };
        manager.create("Layer 1");
        manager
    }

    /// Create a new layer appended to the top of the paint order.
    pub fn create(&mut self, name: &str) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        let layer = Layer {
            id,
            name: name.to_string(),
            order: self.layers.len(),
            visible: true,
            locked: false,
        };
        self.layers.insert(id, layer);
        id
    }

    /// Delete a layer.
    ///
    /// Returns `false` without modifying anything if the layer is unknown or
    /// is the last remaining layer. Remaining layers are renumbered so orders
    /// stay dense.
    pub fn delete(&mut self, id: LayerId) -> bool {
        if self.layers.len() <= 1 || !self.layers.contains_key(&id) {
            return false;
        }
        self.layers.remove(&id);

        let mut remaining: Vec<&mut Layer> = self.layers.values_mut().collect();
        remaining.sort_by_key(|layer| layer.order);
        for (order, layer) in remaining.into_iter().enumerate() {
            layer.order = order;
        }
        true
    }

    /// Get a layer by id.
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    /// Check whether a layer exists.
    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// Rename a layer. Returns `false` for an unknown id.
    pub fn rename(&mut self, id: LayerId, name: &str) -> bool {
        match self.layers.get_mut(&id) {
            Some(layer) => {
                layer.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Flip a layer's visibility, returning the new value.
    pub fn toggle_visibility(&mut self, id: LayerId) -> Option<bool> {
        self.layers.get_mut(&id).map(|layer| {
            layer.visible = !layer.visible;
            layer.visible
        })
    }

    /// Flip a layer's lock flag, returning the new value.
    pub fn toggle_lock(&mut self, id: LayerId) -> Option<bool> {
        self.layers.get_mut(&id).map(|layer| {
            layer.locked = !layer.locked;
            layer.locked
        })
    }

    /// All layers, bottom to top.
    pub fn layers_ordered(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.values().collect();
        layers.sort_by_key(|layer| layer.order);
        layers
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; the collection is never empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

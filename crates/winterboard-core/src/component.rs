//! Drawable components and the component manager.

use crate::layer::LayerId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier for a component.
pub type ComponentId = String;

/// A single sampled point of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// Stylus pressure in [0, 1]; 0.5 for pressure-less pointers.
    pub pressure: f64,
}

/// Payload of a freehand stroke component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    pub points: Vec<StrokePoint>,
    pub color: String,
    pub thickness: f64,
    pub opacity: f64,
}

/// Geometric shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

/// Payload of a geometric shape component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeData {
    pub shape: ShapeKind,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

/// Payload of a text component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
}

/// Type-specific component payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentData {
    Stroke(StrokeData),
    Shape(ShapeData),
    Text(TextData),
}

/// A drawable component on a page.
///
/// Components are mutated only through manager APIs so every change passes
/// through history recording and version bumping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub layer_id: LayerId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub locked: bool,
    pub visible: bool,
    /// Bumped on every update; used for conflict detection on the wire.
    pub version: u64,
    #[serde(flatten)]
    pub data: ComponentData,
}

impl Component {
    /// Axis-aligned bounds, ignoring rotation.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Parameters for creating a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub layer_id: LayerId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub data: ComponentData,
}

/// A shallow-merge patch applied by `ComponentManager::update`.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub data: Option<ComponentData>,
}

/// Owns all components on one page, keyed by id, with an explicit
/// back-to-front paint order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentManager {
    components: HashMap<ComponentId, Component>,
    /// Paint order, back to front.
    order: Vec<ComponentId>,
}

impl ComponentManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a component and append it to the top of the paint order.
    pub fn create(&mut self, spec: ComponentSpec) -> ComponentId {
        let component = Component {
            id: Uuid::new_v4().to_string(),
            layer_id: spec.layer_id,
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
            rotation: 0.0,
            locked: false,
            visible: true,
            version: 1,
            data: spec.data,
        };
        let id = component.id.clone();
        self.order.push(id.clone());
        self.components.insert(id.clone(), component);
        id
    }

    /// Insert a fully formed component (remote apply, undo restore).
    ///
    /// Replaces any existing component with the same id without disturbing
    /// its paint position.
    pub fn insert(&mut self, component: Component) {
        if !self.components.contains_key(&component.id) {
            self.order.push(component.id.clone());
        }
        self.components.insert(component.id.clone(), component);
    }

    /// Shallow-merge a patch into a component and bump its version.
    ///
    /// Returns the updated snapshot, or `None` for an unknown id.
    pub fn update(&mut self, id: &str, patch: &ComponentPatch) -> Option<Component> {
        let component = self.components.get_mut(id)?;
        if let Some(x) = patch.x {
            component.x = x;
        }
        if let Some(y) = patch.y {
            component.y = y;
        }
        if let Some(width) = patch.width {
            component.width = width;
        }
        if let Some(height) = patch.height {
            component.height = height;
        }
        if let Some(rotation) = patch.rotation {
            component.rotation = rotation;
        }
        if let Some(locked) = patch.locked {
            component.locked = locked;
        }
        if let Some(visible) = patch.visible {
            component.visible = visible;
        }
        if let Some(ref data) = patch.data {
            component.data = data.clone();
        }
        component.version += 1;
        Some(component.clone())
    }

    /// Remove a component, returning it so callers can record history.
    pub fn delete(&mut self, id: &str) -> Option<Component> {
        let removed = self.components.remove(id)?;
        self.order.retain(|other| other != id);
        Some(removed)
    }

    /// Get a component by id.
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Ids of visible components whose bounds contain the point,
    /// top-most first.
    pub fn find_at_point(&self, point: Point) -> Vec<ComponentId> {
        self.order
            .iter()
            .rev()
            .filter(|id| {
                self.components
                    .get(*id)
                    .is_some_and(|c| c.visible && c.bounds().contains(point))
            })
            .cloned()
            .collect()
    }

    /// Create several components, returning their ids in spec order.
    ///
    /// Lets callers record a single batch history entry instead of N.
    pub fn batch_create(&mut self, specs: Vec<ComponentSpec>) -> Vec<ComponentId> {
        specs.into_iter().map(|spec| self.create(spec)).collect()
    }

    /// Delete several components, returning the removed ones.
    pub fn batch_delete(&mut self, ids: &[ComponentId]) -> Vec<Component> {
        ids.iter().filter_map(|id| self.delete(id)).collect()
    }

    /// All component ids on a layer, in paint order.
    pub fn ids_in_layer(&self, layer_id: LayerId) -> Vec<ComponentId> {
        self.order
            .iter()
            .filter(|id| {
                self.components
                    .get(*id)
                    .is_some_and(|c| c.layer_id == layer_id)
            })
            .cloned()
            .collect()
    }

    /// Components in paint order, back to front.
    pub fn components_ordered(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|id| self.components.get(id))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the page has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

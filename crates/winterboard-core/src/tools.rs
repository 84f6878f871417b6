//! Tool selection and per-tool configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The available drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Pen,
    Highlighter,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
    Text,
    Select,
}

/// Configuration for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub color: String,
    pub thickness: f64,
    pub opacity: f64,
}

impl ToolConfig {
    /// Default configuration for a tool kind.
    pub fn default_for(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Pen => Self {
                color: "#1a1a1a".to_string(),
                thickness: 2.0,
                opacity: 1.0,
            },
            ToolKind::Highlighter => Self {
                color: "#ffd52e".to_string(),
                thickness: 12.0,
                opacity: 0.4,
            },
            ToolKind::Eraser => Self {
                color: "#ffffff".to_string(),
                thickness: 16.0,
                opacity: 1.0,
            },
            ToolKind::Text => Self {
                color: "#1a1a1a".to_string(),
                thickness: 16.0,
                opacity: 1.0,
            },
            _ => Self {
                color: "#1a1a1a".to_string(),
                thickness: 2.0,
                opacity: 1.0,
            },
        }
    }
}

/// Tracks the active tool and each tool's configuration.
///
/// The shortcut setters write into the configuration of the currently
/// active tool only; other tools keep their own settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManager {
    active: ToolKind,
    configs: HashMap<ToolKind, ToolConfig>,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    /// Create a manager with the pen active.
    pub fn new() -> Self {
        Self {
            active: ToolKind::default(),
            configs: HashMap::new(),
        }
    }

    /// The currently active tool.
    pub fn active(&self) -> ToolKind {
        self.active
    }

    /// Switch the active tool.
    pub fn set_active(&mut self, kind: ToolKind) {
        self.active = kind;
    }

    /// Configuration for a tool, materializing its defaults on first access.
    pub fn config(&mut self, kind: ToolKind) -> &ToolConfig {
        self.configs
            .entry(kind)
            .or_insert_with(|| ToolConfig::default_for(kind))
    }

    /// Configuration of the active tool.
    pub fn active_config(&mut self) -> &ToolConfig {
        self.config(self.active)
    }

    /// Set the active tool's color.
    pub fn set_active_color(&mut self, color: &str) {
        let kind = self.active;
        self.config_mut(kind).color = color.to_string();
    }

    /// Set the active tool's stroke thickness.
    pub fn set_active_thickness(&mut self, thickness: f64) {
        let kind = self.active;
        self.config_mut(kind).thickness = thickness.max(0.1);
    }

    /// Set the active tool's opacity, clamped to [0, 1].
    pub fn set_active_opacity(&mut self, opacity: f64) {
        let kind = self.active;
        self.config_mut(kind).opacity = opacity.clamp(0.0, 1.0);
    }

    fn config_mut(&mut self, kind: ToolKind) -> &mut ToolConfig {
        self.configs
            .entry(kind)
            .or_insert_with(|| ToolConfig::default_for(kind))
    }
}

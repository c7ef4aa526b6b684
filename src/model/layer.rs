//! Optional content layers.
//!
//! Page content between `begin_layer` and `end_layer` belongs to a layer.
//! Layers may name other layers they exclude (radio-button behavior); those
//! references are ids, not ownership.

use serde::{Deserialize, Serialize};

use super::ids::LayerId;

/// Intent of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayerIntent {
    /// For viewing
    #[default]
    View,
    /// For design
    Design,
    /// Both view and design
    All,
}

/// An optional content group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalContentLayer {
    id: LayerId,
    /// Name shown in the viewer's layer panel
    pub name: String,
    /// Whether the layer is initially visible
    pub visible: bool,
    /// Whether the layer is visible when printing
    pub visible_on_print: bool,
    /// Whether the layer can be exported
    pub exportable: bool,
    /// Intent
    pub intent: LayerIntent,
    /// Layers hidden when this one is shown
    pub excludes: Vec<LayerId>,
}

impl OptionalContentLayer {
    /// Create a new visible layer with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            visible_on_print: true,
            exportable: true,
            intent: LayerIntent::View,
            excludes: Vec::new(),
        }
    }

    /// Identity used by page content.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Set initial visibility.
    pub fn visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self
    }

    /// Set print visibility.
    pub fn visible_on_print(&mut self, visible: bool) -> &mut Self {
        self.visible_on_print = visible;
        self
    }

    /// Set the layer intent.
    pub fn intent(&mut self, intent: LayerIntent) -> &mut Self {
        self.intent = intent;
        self
    }

    /// Hide `other` whenever this layer is shown.
    pub fn exclude(&mut self, other: LayerId) -> &mut Self {
        if other != self.id && !self.excludes.contains(&other) {
            self.excludes.push(other);
        }
        self
    }
}

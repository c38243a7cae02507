//! A2UI Component Registry
//!
//! Holds the component catalog of one surface, keyed by component id.

use indexmap::IndexMap;

use super::message::{ComponentDefinition, ComponentType};

/// Component types of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    // Layout
    Column,
    Row,
    Card,

    // Display
    Text,
    Image,

    // Interactive
    Button,
    TextField,
    Select,
}

impl ComponentKind {
    /// Get the wire type name
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Column => "Column",
            ComponentKind::Row => "Row",
            ComponentKind::Card => "Card",
            ComponentKind::Text => "Text",
            ComponentKind::Image => "Image",
            ComponentKind::Button => "Button",
            ComponentKind::TextField => "TextField",
            ComponentKind::Select => "Select",
        }
    }

    /// Parse from the wire type name
    pub fn from_name(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.name() == s)
    }

    /// Get all component types
    pub fn all() -> &'static [ComponentKind] {
        &[
            ComponentKind::Column,
            ComponentKind::Row,
            ComponentKind::Card,
            ComponentKind::Text,
            ComponentKind::Image,
            ComponentKind::Button,
            ComponentKind::TextField,
            ComponentKind::Select,
        ]
    }
}

/// The catalog of one surface.
///
/// Upserts keep the first-insertion position of an id, so iteration follows the
/// order in which components were first announced.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a component (last write wins)
    pub fn upsert(&mut self, component: ComponentDefinition) {
        self.components.insert(component.id.clone(), component);
    }

    /// Get a component by id
    pub fn get(&self, id: &str) -> Option<&ComponentDefinition> {
        self.components.get(id)
    }

    /// Get the component type by id
    pub fn get_type(&self, id: &str) -> Option<&ComponentType> {
        self.get(id).map(|c| &c.component)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.components.values()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }
}

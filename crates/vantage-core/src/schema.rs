//! Component schema: the set of component types a world store carries.

use crate::filter::ComponentFilter;
use crate::id::ComponentTypeId;

/// Definition of a single component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentDef {
    /// Human-readable name for diagnostics and reports.
    pub name: String,
}

impl ComponentDef {
    /// Create a definition by name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// The ordered set of component types registered for a kernel.
///
/// Built once at kernel construction and shared (via `Arc`) by the live
/// world store, every replica, and the snapshot pool, so that all scratch
/// instances carry identical component tables. `ComponentTypeId(n)` is
/// the n-th definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentSchema {
    defs: Vec<ComponentDef>,
}

impl ComponentSchema {
    /// Create a schema from an ordered list of component definitions.
    pub fn new(defs: Vec<ComponentDef>) -> Self {
        Self { defs }
    }

    /// Number of registered component types.
    pub fn component_count(&self) -> usize {
        self.defs.len()
    }

    /// Look up a definition by ID.
    pub fn def(&self, component: ComponentTypeId) -> Option<&ComponentDef> {
        self.defs.get(component.0 as usize)
    }

    /// Look up a component type ID by name.
    pub fn id_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.defs
            .iter()
            .position(|d| d.name == name)
            .map(|i| ComponentTypeId(i as u32))
    }

    /// Whether the given ID names a registered component type.
    pub fn contains(&self, component: ComponentTypeId) -> bool {
        (component.0 as usize) < self.defs.len()
    }

    /// A filter selecting every registered component type.
    pub fn full_filter(&self) -> ComponentFilter {
        (0..self.defs.len() as u32).map(ComponentTypeId).collect()
    }
}

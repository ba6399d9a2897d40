//! Schema and world fixtures shared across the workspace's tests.

use std::sync::Arc;

use vantage_core::{ComponentDef, ComponentSchema, ComponentTypeId, EntityId};
use vantage_world::WorldStore;

/// Build a schema from component names, in registration order.
pub fn schema_of(names: &[&str]) -> Arc<ComponentSchema> {
    Arc::new(ComponentSchema::new(
        names.iter().map(|n| ComponentDef::named(n)).collect(),
    ))
}

/// Create `count` entities, each carrying `component` with its entity
/// index as a one-byte payload. Returns the IDs in creation order.
pub fn seed_entities(
    world: &mut WorldStore,
    count: usize,
    component: ComponentTypeId,
) -> Vec<EntityId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let entity = world.create_entity();
        world
            .set_component(entity, component, &[i as u8])
            .expect("fixture component must be registered");
        ids.push(entity);
    }
    ids
}

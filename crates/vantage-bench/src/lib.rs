//! Benchmark profiles and fixtures for the Vantage simulation host.
//!
//! Provides a reference five-component schema and world populations at
//! benchmark-relevant entity counts, shared by the criterion benches.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use vantage_core::{ComponentDef, ComponentSchema, ComponentTypeId};
use vantage_world::WorldStore;

/// Position component (12-byte payload in the reference profile).
pub const POSITION: ComponentTypeId = ComponentTypeId(0);
/// Velocity component.
pub const VELOCITY: ComponentTypeId = ComponentTypeId(1);
/// Orientation component.
pub const ORIENTATION: ComponentTypeId = ComponentTypeId(2);
/// Target/waypoint component, carried by one entity in four.
pub const TARGET: ComponentTypeId = ComponentTypeId(3);
/// Label component with a wider payload.
pub const LABEL: ComponentTypeId = ComponentTypeId(4);

/// The five-component reference schema used by all benches.
pub fn bench_schema() -> Arc<ComponentSchema> {
    Arc::new(ComponentSchema::new(vec![
        ComponentDef::named("position"),
        ComponentDef::named("velocity"),
        ComponentDef::named("orientation"),
        ComponentDef::named("target"),
        ComponentDef::named("label"),
    ]))
}

/// Build a store with `entities` entities in a realistic shape: every
/// entity carries position/velocity/orientation, every fourth carries a
/// target, and every tenth a wide label payload.
pub fn populated_store(entities: usize) -> WorldStore {
    let mut store = WorldStore::new(bench_schema(), 4096);
    for i in 0..entities {
        let e = store.create_entity();
        let coord = (i as u32).to_le_bytes();
        let pos = [coord, coord, coord].concat();
        store.set_component(e, POSITION, &pos).unwrap();
        store.set_component(e, VELOCITY, &coord).unwrap();
        store.set_component(e, ORIENTATION, &coord).unwrap();
        if i % 4 == 0 {
            store.set_component(e, TARGET, &coord).unwrap();
        }
        if i % 10 == 0 {
            store.set_component(e, LABEL, &[i as u8; 32]).unwrap();
        }
    }
    store
}

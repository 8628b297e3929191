//! Body registry
//!
//! Maps live entities to their physics body and the scene node the sync pass
//! writes into. Every record points at a body that exists in the world; the
//! [`LifecycleCoordinator`](super::LifecycleCoordinator) keeps it that way.

use std::collections::HashMap;

use crate::rendering::scene::NodeId;
use super::events::EntityId;
use super::simulation::BodyHandle;
use super::{PhysicsError, PhysicsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRecord {
    pub body: BodyHandle,
    /// Lookup-only reference into the scene graph.
    pub renderable: NodeId,
}

#[derive(Debug, Default)]
pub struct BodyRegistry {
    records: HashMap<EntityId, BodyRecord>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: EntityId, body: BodyHandle, renderable: NodeId) -> PhysicsResult<()> {
        if self.records.contains_key(&entity) {
            return Err(PhysicsError::DuplicateEntity { entity });
        }
        self.records.insert(entity, BodyRecord { body, renderable });
        Ok(())
    }

    pub fn unregister(&mut self, entity: EntityId) -> PhysicsResult<BodyRecord> {
        self.records
            .remove(&entity)
            .ok_or(PhysicsError::UnknownEntity { entity })
    }

    pub fn get(&self, entity: EntityId) -> Option<&BodyRecord> {
        self.records.get(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.records.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Visits every record once, in no particular order.
    ///
    /// The registry is borrowed shared for the whole walk, so nothing can be
    /// registered or removed from inside `f`.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(EntityId, &BodyRecord),
    {
        for (entity, record) in &self.records {
            f(*entity, record);
        }
    }

    /// Like [`BodyRegistry::for_each`], stopping at the first error.
    pub fn try_for_each<F>(&self, mut f: F) -> PhysicsResult<()>
    where
        F: FnMut(EntityId, &BodyRecord) -> PhysicsResult<()>,
    {
        for (entity, record) in &self.records {
            f(*entity, record)?;
        }
        Ok(())
    }

    /// Snapshot of entities matching `predicate`, for removal after iteration.
    pub fn entities_where<P>(&self, mut predicate: P) -> Vec<EntityId>
    where
        P: FnMut(EntityId, &BodyRecord) -> bool,
    {
        self.records
            .iter()
            .filter(|(entity, record)| predicate(**entity, record))
            .map(|(entity, _)| *entity)
            .collect()
    }

    pub fn entities(&self) -> Vec<EntityId> {
        self.records.keys().copied().collect()
    }
}
